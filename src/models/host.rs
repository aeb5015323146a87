//! Host fact data model
//!
//! `HostFacts` is the resolver's view of a target host. It is normally built
//! from a Facter structured-fact map (as stored in PuppetDB) but can also be
//! posted directly to the resolve endpoint.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Operating system family as reported by the `os.family` fact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OsFamily {
    RedHat,
    Debian,
    Suse,
    Solaris,
    Aix,
    Darwin,
    Windows,
    /// Any family without a mapping entry (kept verbatim for diagnostics)
    Other(String),
}

impl OsFamily {
    /// Families whose agent packages come from a managed package repository
    pub fn is_repo_managed(&self) -> bool {
        matches!(self, OsFamily::RedHat | OsFamily::Debian | OsFamily::Suse)
    }

    /// Families whose packages are rpm-based (and use `/etc/pki/rpm-gpg`)
    pub fn is_rpm_based(&self) -> bool {
        matches!(self, OsFamily::RedHat | OsFamily::Suse)
    }

    pub fn as_str(&self) -> &str {
        match self {
            OsFamily::RedHat => "RedHat",
            OsFamily::Debian => "Debian",
            OsFamily::Suse => "Suse",
            OsFamily::Solaris => "Solaris",
            OsFamily::Aix => "AIX",
            OsFamily::Darwin => "Darwin",
            OsFamily::Windows => "windows",
            OsFamily::Other(name) => name,
        }
    }
}

impl Default for OsFamily {
    fn default() -> Self {
        OsFamily::Other(String::new())
    }
}

impl From<&str> for OsFamily {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "redhat" => OsFamily::RedHat,
            "debian" => OsFamily::Debian,
            "suse" => OsFamily::Suse,
            "solaris" => OsFamily::Solaris,
            "aix" => OsFamily::Aix,
            "darwin" => OsFamily::Darwin,
            "windows" => OsFamily::Windows,
            _ => OsFamily::Other(value.trim().to_string()),
        }
    }
}

impl From<String> for OsFamily {
    fn from(value: String) -> Self {
        OsFamily::from(value.as_str())
    }
}

impl From<OsFamily> for String {
    fn from(family: OsFamily) -> Self {
        family.as_str().to_string()
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facts about a target host, immutable for the duration of one resolution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFacts {
    /// `os.family`
    #[serde(default)]
    pub os_family: OsFamily,

    /// `os.name` (e.g. "CentOS", "Amazon", "Fedora")
    #[serde(default)]
    pub os_name: String,

    /// `os.release.major`, normalized to a string (Amazon uses year-based epochs)
    #[serde(default, deserialize_with = "deserialize_release")]
    pub os_major_version: String,

    /// `os.distro.codename`, needed for apt suites
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_codename: Option<String>,

    /// `os.architecture`
    #[serde(default)]
    pub architecture: String,

    /// Whether the host runs the enterprise edition
    #[serde(default)]
    pub is_pe: bool,

    /// `puppet_master_server`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_server: Option<String>,

    /// `clientcert`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cert: Option<String>,

    /// `platform_tag` (PE packaging directory override)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_tag: Option<String>,
}

impl HostFacts {
    /// Build host facts from a Facter fact map.
    ///
    /// Structured facts are preferred; legacy flat facts (`osfamily`,
    /// `operatingsystem`, `operatingsystemmajrelease`, `architecture`) are used
    /// as fallbacks. Missing facts become empty values, never errors.
    pub fn from_fact_map(facts: &serde_json::Value) -> Self {
        let family = fact_string(facts, "os.family")
            .or_else(|| fact_string(facts, "osfamily"))
            .unwrap_or_default();

        Self {
            os_family: OsFamily::from(family),
            os_name: fact_string(facts, "os.name")
                .or_else(|| fact_string(facts, "operatingsystem"))
                .unwrap_or_default(),
            os_major_version: fact_string(facts, "os.release.major")
                .or_else(|| fact_string(facts, "operatingsystemmajrelease"))
                .unwrap_or_default(),
            os_codename: fact_string(facts, "os.distro.codename")
                .or_else(|| fact_string(facts, "lsbdistcodename")),
            architecture: fact_string(facts, "os.architecture")
                .or_else(|| fact_string(facts, "architecture"))
                .unwrap_or_default(),
            is_pe: fact_string(facts, "is_pe")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            master_server: fact_string(facts, "puppet_master_server"),
            client_cert: fact_string(facts, "clientcert"),
            platform_tag: fact_string(facts, "platform_tag"),
        }
    }

    /// Lowercased `os.name`, used for table lookups
    pub fn os_name_key(&self) -> String {
        self.os_name.trim().to_ascii_lowercase()
    }
}

/// Look up a dot-separated fact path, rendering scalars as strings.
/// Empty strings are treated as absent.
fn fact_string(facts: &serde_json::Value, path: &str) -> Option<String> {
    let value = path
        .split('.')
        .try_fold(facts, |current, key| current.get(key))?;

    let rendered = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => return None,
    };

    if rendered.is_empty() {
        None
    } else {
        Some(rendered)
    }
}

/// Accept `os.release.major` as either a number or a string
fn deserialize_release<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Release {
        Number(u64),
        Text(String),
    }

    Ok(match Option::<Release>::deserialize(deserializer)? {
        Some(Release::Number(n)) => n.to_string(),
        Some(Release::Text(s)) => s.trim().to_string(),
        None => String::new(),
    })
}

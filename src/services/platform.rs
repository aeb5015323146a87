//! Platform directory mapping
//!
//! Maps `(os.family, os.name, os.release.major)` to the packaging directory
//! token used in repository URLs. The mapping is table-driven so that the
//! Amazon Linux releases, which do not follow their RHEL equivalents in any
//! ordered way, stay auditable in one place.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::models::{DiagnosticKind, HostFacts, OsFamily, PackageProvider, RepoKind};

/// Amazon Linux release to package directory
pub static AMAZON_RELEASES: &[(&str, &str)] = &[
    ("2017", "el/6"),
    ("2018", "el/6"),
    ("2", "el/7"),
    ("2023", "amazon/2023"),
];

/// Directory used for Amazon releases missing from `AMAZON_RELEASES`
pub const AMAZON_FALLBACK_DIR: &str = "el/6";

/// Staging directory for absolute-source packages on POSIX hosts
pub const POSIX_STAGING_DIR: &str = "/opt/puppetlabs/packages";

/// Staging directory for absolute-source packages on Windows hosts
pub const WINDOWS_STAGING_DIR: &str = "C:/ProgramData/PuppetLabs/packages";

/// Release/codename tokens must be safe to splice into a URL path
static TOKEN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").unwrap());

/// Why no package directory could be selected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("fact '{0}' is required to select a package directory")]
    MissingFact(&'static str),

    #[error("fact '{fact}' has a value that cannot be used in a URL: '{value}'")]
    InvalidFact { fact: &'static str, value: String },

    #[error("{family} hosts do not install the agent from a package repository")]
    NotRepositoryManaged { family: String },

    #[error("no package directory mapping for {family} '{name}' release '{release}'")]
    Unsupported {
        family: String,
        name: String,
        release: String,
    },
}

impl PlatformError {
    pub fn diagnostic_kind(&self) -> DiagnosticKind {
        match self {
            PlatformError::MissingFact(_) => DiagnosticKind::MissingFact,
            PlatformError::NotRepositoryManaged { .. } => DiagnosticKind::RepositoryNotApplicable,
            PlatformError::InvalidFact { .. } | PlatformError::Unsupported { .. } => {
                DiagnosticKind::UnsupportedPlatform
            }
        }
    }
}

/// Packaging directory selected for a host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDir {
    /// Directory token, e.g. `el/7`, `fedora/f36`, `sles/15`, `bookworm`
    pub token: String,
    /// Set when an unlisted release fell back to the table default
    pub fallback_from: Option<String>,
}

impl PlatformDir {
    fn listed(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            fallback_from: None,
        }
    }

    /// Segment used in open-source repository URLs.
    ///
    /// Fedora directories are published without the `f` release prefix, so
    /// `fedora/f36` becomes `fedora/36`. Other tokens are unchanged.
    pub fn url_segment(&self) -> String {
        match self.token.split_once('/') {
            Some((dist, release)) => format!("{}/{}", dist, strip_release_prefix(release)),
            None => self.token.clone(),
        }
    }

    /// PE packaging directory derived from the token: `el/6` + `x64` gives `el-6-x64`
    pub fn pe_segment(&self, architecture: &str) -> String {
        format!("{}-{}", self.url_segment().replace('/', "-"), architecture)
    }
}

/// Drop a single leading `f` from a release that is otherwise numeric
fn strip_release_prefix(release: &str) -> &str {
    match release.strip_prefix('f') {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => release,
    }
}

fn checked_token<'a>(value: &'a str, fact: &'static str) -> Result<&'a str, PlatformError> {
    if value.is_empty() {
        Err(PlatformError::MissingFact(fact))
    } else if TOKEN_REGEX.is_match(value) {
        Ok(value)
    } else {
        Err(PlatformError::InvalidFact {
            fact,
            value: value.to_string(),
        })
    }
}

/// Select the packaging directory for a host
pub fn repo_directory(facts: &HostFacts) -> Result<PlatformDir, PlatformError> {
    match &facts.os_family {
        OsFamily::RedHat => redhat_directory(facts),
        OsFamily::Suse => {
            let major = checked_token(&facts.os_major_version, "os.release.major")?;
            Ok(PlatformDir::listed(format!("sles/{}", major)))
        }
        OsFamily::Debian => {
            let codename = facts.os_codename.as_deref().unwrap_or_default();
            let codename = checked_token(codename, "os.distro.codename")?;
            Ok(PlatformDir::listed(codename.to_ascii_lowercase()))
        }
        family @ (OsFamily::Solaris | OsFamily::Aix | OsFamily::Darwin | OsFamily::Windows) => {
            Err(PlatformError::NotRepositoryManaged {
                family: family.to_string(),
            })
        }
        OsFamily::Other(family) => Err(PlatformError::Unsupported {
            family: family.clone(),
            name: facts.os_name.clone(),
            release: facts.os_major_version.clone(),
        }),
    }
}

fn redhat_directory(facts: &HostFacts) -> Result<PlatformDir, PlatformError> {
    let major = checked_token(&facts.os_major_version, "os.release.major")?;

    match facts.os_name_key().as_str() {
        "fedora" => Ok(PlatformDir::listed(format!("fedora/f{}", major))),
        "amazon" => Ok(amazon_directory(major)),
        _ => Ok(PlatformDir::listed(format!("el/{}", major))),
    }
}

fn amazon_directory(release: &str) -> PlatformDir {
    match AMAZON_RELEASES.iter().find(|(r, _)| *r == release) {
        Some((_, dir)) => PlatformDir::listed(*dir),
        None => PlatformDir {
            token: AMAZON_FALLBACK_DIR.to_string(),
            fallback_from: Some(release.to_string()),
        },
    }
}

/// PE packaging directory: the `platform_tag` fact when present, else derived
pub fn pe_directory(facts: &HostFacts, dir: &PlatformDir) -> String {
    match facts.platform_tag.as_deref().map(str::trim) {
        Some(tag) if !tag.is_empty() => tag.to_string(),
        _ => match facts.os_family {
            OsFamily::Debian => format!(
                "{}-{}-{}",
                facts.os_name_key(),
                facts.os_major_version,
                facts.architecture
            ),
            _ => dir.pe_segment(&facts.architecture),
        },
    }
}

/// Repository front-end for a family, if it has one
pub fn repo_kind(family: &OsFamily) -> Option<RepoKind> {
    match family {
        OsFamily::RedHat => Some(RepoKind::Yum),
        OsFamily::Suse => Some(RepoKind::Zypper),
        OsFamily::Debian => Some(RepoKind::Apt),
        _ => None,
    }
}

/// Provider used when installing from the repository
pub fn repository_provider(family: &OsFamily) -> Option<PackageProvider> {
    match family {
        OsFamily::RedHat => Some(PackageProvider::Yum),
        OsFamily::Suse => Some(PackageProvider::Zypper),
        OsFamily::Debian => Some(PackageProvider::Apt),
        _ => None,
    }
}

/// Provider used when installing a staged package file
pub fn file_provider(facts: &HostFacts) -> Option<PackageProvider> {
    match facts.os_family {
        OsFamily::RedHat | OsFamily::Suse | OsFamily::Aix => Some(PackageProvider::Rpm),
        OsFamily::Debian => Some(PackageProvider::Dpkg),
        OsFamily::Solaris if facts.os_major_version == "10" => Some(PackageProvider::Sun),
        OsFamily::Solaris => Some(PackageProvider::Pkg),
        OsFamily::Darwin => Some(PackageProvider::Pkgdmg),
        OsFamily::Windows => Some(PackageProvider::Windows),
        OsFamily::Other(_) => None,
    }
}

pub fn staging_dir(family: &OsFamily) -> &'static str {
    match family {
        OsFamily::Windows => WINDOWS_STAGING_DIR,
        _ => POSIX_STAGING_DIR,
    }
}

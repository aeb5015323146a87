//! Resolution output model
//!
//! A `Resolution` describes what a configuration-management runtime should
//! converge: the agent repository, the package install, and the agent
//! services. Nothing here performs any action.

use serde::{Deserialize, Serialize};

use crate::models::Tristate;

/// Repository identifier managed for the agent packages
pub const REPO_NAME: &str = "pc_repo";

/// Superseded repository identifier removed on enterprise hosts
pub const LEGACY_PE_REPO_NAME: &str = "puppetlabs-pepackages";

/// Sentinel telling yum/zypper to bypass any configured proxy
pub const PROXY_DISABLED_SENTINEL: &str = "_none_";

/// Name of the agent package
pub const AGENT_PACKAGE_NAME: &str = "puppet-agent";

/// Full decision for one host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub repository: RepositoryConfig,
    pub package: PackageInstallPlan,
    pub services: Vec<ServiceState>,
    /// Markers for decisions that were degraded instead of failing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    pub fn has_diagnostic(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind == kind)
    }
}

/// Package manager front-end the repository is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoKind {
    Yum,
    Zypper,
    Apt,
}

/// Proxy policy for the managed repository
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "url", rename_all = "snake_case")]
pub enum ProxySetting {
    /// Leave the system default in place (the setting is omitted)
    #[default]
    Inherit,
    /// Explicitly bypass any proxy
    Disabled,
    /// Use this proxy URL
    Url(String),
}

impl ProxySetting {
    /// Value for a yum/zypper `proxy=` line, `None` when the line is omitted
    pub fn repo_value(&self) -> Option<&str> {
        match self {
            ProxySetting::Inherit => None,
            ProxySetting::Disabled => Some(PROXY_DISABLED_SENTINEL),
            ProxySetting::Url(url) => Some(url),
        }
    }
}

/// Where a GPG key sits in the signing-key rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyGeneration {
    /// Key the repository is signed with today
    Current,
    /// Key introduced by the rotation; trusted alongside the current key
    Rotation,
}

/// A GPG key the host must trust for agent packages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpgKey {
    /// Key name, e.g. `GPG-KEY-puppet-20250406`
    pub name: String,
    pub generation: KeyGeneration,
    /// Location of the key on the host
    pub path: String,
    /// Where the runtime fetches the key file from
    pub source: String,
}

impl GpgKey {
    pub fn file_uri(&self) -> String {
        format!("file://{}", self.path)
    }
}

/// Managed key file attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedFile {
    pub path: String,
    pub source: String,
    pub owner: String,
    pub group: String,
    pub mode: String,
}

/// Check/import command pair that hands key verification to gpg and rpm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyImport {
    /// Resource title, e.g. `import-GPG-KEY-puppet`
    pub title: String,
    pub path: String,
    /// `PATH` the commands run with
    pub search_path: String,
    pub command: String,
    /// Import is skipped while this command succeeds
    pub unless: String,
    /// Key file that must exist first
    pub require: String,
}

/// Client TLS material for enterprise repositories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SslMaterial {
    pub ca_cert: String,
    pub client_cert: String,
    pub client_key: String,
}

/// Apt suite selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AptSuite {
    pub release: String,
    pub repos: String,
}

/// Repository decision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Whether the agent repository is managed at all
    pub managed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<RepoKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apt: Option<AptSuite>,

    pub enabled: bool,

    pub gpg_check: bool,

    /// Ordered key set, current generation first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gpg_keys: Vec<GpgKey>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_files: Vec<ManagedFile>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_imports: Vec<KeyImport>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pki_directories: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl: Option<SslMaterial>,

    #[serde(default)]
    pub proxy: ProxySetting,

    #[serde(default)]
    pub skip_if_unavailable: Tristate,

    /// Repository identifiers to ensure absent
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub legacy_removals: Vec<String>,
}

impl RepositoryConfig {
    /// An empty decision: nothing is managed, nothing is removed
    pub fn unmanaged() -> Self {
        Self::default()
    }

    /// The yum `gpgkey` value: `file://` URIs joined by newline and indent
    pub fn gpgkey_field(&self) -> Option<String> {
        if self.gpg_keys.is_empty() {
            return None;
        }
        Some(
            self.gpg_keys
                .iter()
                .map(GpgKey::file_uri)
                .collect::<Vec<_>>()
                .join("\n  "),
        )
    }

    /// Whether nothing at all is requested of the runtime
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Desired package state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "version")]
pub enum PackageEnsure {
    Present,
    Version(String),
}

impl PackageEnsure {
    pub fn from_version(version: Option<&str>) -> Self {
        match version.map(str::trim) {
            None | Some("") | Some("present") => PackageEnsure::Present,
            Some(v) => PackageEnsure::Version(v.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PackageEnsure::Present => "present",
            PackageEnsure::Version(v) => v,
        }
    }
}

/// Where the package comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum InstallSource {
    /// From the managed (or pre-existing) repository
    Repository,
    /// From a file staged on the host before install
    Local { path: String, staged_from: String },
    /// Whatever the provider resolves by itself
    Native,
}

/// Package provider hint for the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageProvider {
    Yum,
    Zypper,
    Apt,
    Rpm,
    Dpkg,
    Sun,
    Pkg,
    Pkgdmg,
    Windows,
}

/// Package install decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInstallPlan {
    pub name: String,
    pub ensure: PackageEnsure,
    pub source: InstallSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<PackageProvider>,
    #[serde(default)]
    pub install_options: Vec<String>,
    /// Directory that must exist before staging (absolute mode only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<String>,
}

impl PackageInstallPlan {
    pub fn is_absolute(&self) -> bool {
        matches!(self.source, InstallSource::Local { .. })
    }
}

/// Desired service state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceEnsure {
    Running,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceState {
    pub name: String,
    pub ensure: ServiceEnsure,
    pub enable: bool,
}

/// Kind of degraded decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// No mapping exists for the host's family or distribution
    UnsupportedPlatform,
    /// The family installs without a package repository
    RepositoryNotApplicable,
    /// A fact needed by the selected branch is missing
    MissingFact,
    /// A release was not in the lookup table and a fallback was used
    ReleaseFallback,
    /// The absolute source does not name a file
    InvalidAbsoluteSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

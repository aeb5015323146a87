//! PE version lookup
//!
//! Enterprise repository URLs embed the PE release. The resolver asks a
//! `PeVersionLookup` for it only when the user has not supplied
//! `alternate_pe_version` and the URL is actually needed.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::utils::validation::validate_package_version;

/// Where PE installs record their build version
pub const DEFAULT_PE_BUILD_FILE: &str = "/opt/puppetlabs/server/pe_build";

#[derive(Debug, Error)]
pub enum VersionLookupError {
    #[error("no PE version source is configured")]
    NotConfigured,

    #[error("PE build file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read PE build file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PE build file {} is empty", .0.display())]
    Empty(PathBuf),

    #[error("invalid PE version '{0}'")]
    Invalid(String),
}

/// Source of the current PE release identifier
pub trait PeVersionLookup: Send + Sync {
    fn pe_version(&self) -> Result<String, VersionLookupError>;

    /// Short description for health output
    fn describe(&self) -> String;
}

/// A fixed PE version (from configuration)
#[derive(Debug, Clone)]
pub struct StaticPeVersion {
    version: String,
}

impl StaticPeVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

impl PeVersionLookup for StaticPeVersion {
    fn pe_version(&self) -> Result<String, VersionLookupError> {
        let version = self.version.trim();
        if validate_package_version(version) {
            Ok(version.to_string())
        } else {
            Err(VersionLookupError::Invalid(version.to_string()))
        }
    }

    fn describe(&self) -> String {
        format!("static ({})", self.version)
    }
}

/// Reads the version from a PE `pe_build` file on every lookup
#[derive(Debug, Clone)]
pub struct PeBuildFile {
    path: PathBuf,
}

impl PeBuildFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PeVersionLookup for PeBuildFile {
    fn pe_version(&self) -> Result<String, VersionLookupError> {
        debug!("Reading PE version from {:?}", self.path);

        let contents = fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => VersionLookupError::NotFound(self.path.clone()),
            _ => VersionLookupError::Io {
                path: self.path.clone(),
                source: e,
            },
        })?;

        let version = contents.lines().next().unwrap_or_default().trim();
        if version.is_empty() {
            return Err(VersionLookupError::Empty(self.path.clone()));
        }
        if !validate_package_version(version) {
            return Err(VersionLookupError::Invalid(version.to_string()));
        }

        Ok(version.to_string())
    }

    fn describe(&self) -> String {
        format!("pe_build file ({})", self.path.display())
    }
}

/// Lookup used when no PE source is configured; always fails
#[derive(Debug, Clone, Default)]
pub struct NoPeVersion;

impl PeVersionLookup for NoPeVersion {
    fn pe_version(&self) -> Result<String, VersionLookupError> {
        Err(VersionLookupError::NotConfigured)
    }

    fn describe(&self) -> String {
        "not configured".to_string()
    }
}

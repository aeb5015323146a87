//! Configuration management
//!
//! YAML-based configuration with:
//! - Environment variable overrides
//! - Multiple configuration file locations
//! - Default values for all settings
//! - Resolver defaults applied to every request

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::models::UserParameters;
use crate::services::pe_version::{
    NoPeVersion, PeBuildFile, PeVersionLookup, StaticPeVersion, DEFAULT_PE_BUILD_FILE,
};
use crate::utils::validation::{validate_collection, validate_package_version};

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub puppetdb: Option<PuppetDbConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// TLS/HTTPS configuration (if not set, server runs HTTP)
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

/// TLS/HTTPS configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to TLS certificate file (PEM format)
    pub cert_file: PathBuf,
    /// Path to TLS private key file (PEM format)
    pub key_file: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tls: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5052
}

/// Client TLS material for PuppetDB, usually the agent's own Puppet certificates
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PuppetDbSslConfig {
    #[serde(default)]
    pub cert_path: Option<PathBuf>,
    #[serde(default)]
    pub key_path: Option<PathBuf>,
    /// Puppet CA bundle; when set, only this CA is trusted
    #[serde(default)]
    pub ca_path: Option<PathBuf>,
    #[serde(default = "default_ssl_verify")]
    pub verify: bool,
}

impl Default for PuppetDbSslConfig {
    fn default() -> Self {
        Self {
            cert_path: None,
            key_path: None,
            ca_path: None,
            verify: default_ssl_verify(),
        }
    }
}

impl PuppetDbSslConfig {
    /// Client identity, only when both halves are configured
    pub fn identity_paths(&self) -> Option<(&PathBuf, &PathBuf)> {
        self.cert_path.as_ref().zip(self.key_path.as_ref())
    }
}

/// PuppetDB connection used to look up node facts
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PuppetDbConfig {
    pub url: String,
    #[serde(default = "default_timeout", alias = "timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub ssl: PuppetDbSslConfig,
}

impl PuppetDbConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: default_timeout(),
            ssl: PuppetDbSslConfig::default(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_ssl_verify() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file" or "both")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    #[serde(default = "default_log_rotation")]
    pub daily_rotation: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_log_rotation(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

/// Log output target
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to console (stdout/stderr) - default for development
    #[default]
    Console,
    /// Log to file with optional rotation
    File,
    /// Log to both console and file
    Both,
}

impl LogTarget {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "file" => LogTarget::File,
            "both" => LogTarget::Both,
            _ => LogTarget::Console,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log/openvox/agent-planner")
}

fn default_log_prefix() -> String {
    "openvox-agent-planner".to_string()
}

fn default_log_rotation() -> bool {
    true
}

/// Defaults applied to every resolution request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Collection used when a request does not name one
    #[serde(default = "default_collection")]
    pub default_collection: String,
    /// `manage_repo` used when a request does not set it
    #[serde(default = "default_manage_repo")]
    pub manage_repo: bool,
    /// Fixed PE version; takes precedence over `pe_build_file`
    #[serde(default)]
    pub pe_version: Option<String>,
    /// File the PE version is read from (`null` disables the lookup)
    #[serde(default = "default_pe_build_file")]
    pub pe_build_file: Option<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_collection: default_collection(),
            manage_repo: default_manage_repo(),
            pe_version: None,
            pe_build_file: default_pe_build_file(),
        }
    }
}

fn default_collection() -> String {
    crate::models::DEFAULT_COLLECTION.to_string()
}

fn default_manage_repo() -> bool {
    true
}

fn default_pe_build_file() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_PE_BUILD_FILE))
}

impl ResolverConfig {
    /// Build the PE version lookup this configuration describes
    pub fn pe_version_lookup(&self) -> Arc<dyn PeVersionLookup> {
        match (&self.pe_version, &self.pe_build_file) {
            (Some(version), _) => Arc::new(StaticPeVersion::new(version.clone())),
            (None, Some(path)) => Arc::new(PeBuildFile::new(path.clone())),
            (None, None) => Arc::new(NoPeVersion),
        }
    }

    /// Fill request fields the caller left unset
    pub fn apply_defaults(&self, params: &mut UserParameters) {
        if params.collection.as_deref().map_or(true, str::is_empty) {
            params.collection = Some(self.default_collection.clone());
        }
        if params.manage_repo.is_none() && !self.manage_repo {
            params.manage_repo = Some(false);
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values
    /// 2. Configuration file (YAML)
    /// 3. Environment variables
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let config_path = std::env::var("OPENVOX_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(Self::find_config_file);

        let mut config = match config_path {
            Some(ref path) if path.exists() => {
                eprintln!("[CONFIG] Loading configuration from: {:?}", path);
                Self::from_file(path)?
            }
            Some(ref path) => {
                eprintln!("[CONFIG] Config file not found: {:?}, using defaults", path);
                AppConfig::default()
            }
            None => {
                eprintln!("[CONFIG] No config file found, using defaults");
                AppConfig::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_norway::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Find the configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            PathBuf::from("config.yaml"),
            PathBuf::from("config/config.yaml"),
            PathBuf::from("/etc/openvox-agent-planner/config.yaml"),
            dirs::config_dir()
                .map(|p| p.join("openvox-agent-planner/config.yaml"))
                .unwrap_or_default(),
        ];

        paths.into_iter().find(|p| p.exists())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a variable lookup
    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = var("OPENVOX_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("OPENVOX_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let (Some(cert), Some(key)) = (var("OPENVOX_TLS_CERT"), var("OPENVOX_TLS_KEY")) {
            if !cert.is_empty() && !key.is_empty() {
                self.server.tls = Some(TlsConfig {
                    cert_file: PathBuf::from(cert),
                    key_file: PathBuf::from(key),
                });
            }
        }

        // Logging
        if let Some(level) = var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Some(format) = var("OPENVOX_LOG_FORMAT") {
            self.logging.format = LogFormat::parse(&format);
        }
        if let Some(target) = var("OPENVOX_LOG_TARGET") {
            self.logging.target = LogTarget::parse(&target);
        }
        if let Some(dir) = var("OPENVOX_LOG_DIR") {
            self.logging.log_dir = PathBuf::from(dir);
        }

        // PuppetDB
        if let Some(url) = var("PUPPETDB_URL") {
            let puppetdb = self
                .puppetdb
                .get_or_insert_with(|| PuppetDbConfig::new(url.clone()));
            puppetdb.url = url;
        }
        if let Some(ref mut puppetdb) = self.puppetdb {
            if let Some(cert) = var("PUPPETDB_SSL_CERT") {
                puppetdb.ssl.cert_path = Some(PathBuf::from(cert));
            }
            if let Some(key) = var("PUPPETDB_SSL_KEY") {
                puppetdb.ssl.key_path = Some(PathBuf::from(key));
            }
            if let Some(ca) = var("PUPPETDB_SSL_CA") {
                puppetdb.ssl.ca_path = Some(PathBuf::from(ca));
            }
        }

        // Resolver
        if let Some(collection) = var("OPENVOX_COLLECTION") {
            self.resolver.default_collection = collection;
        }
        if let Some(version) = var("OPENVOX_PE_VERSION") {
            self.resolver.pe_version = Some(version).filter(|v| !v.is_empty());
        }
        if let Some(path) = var("OPENVOX_PE_BUILD_FILE") {
            self.resolver.pe_build_file = Some(PathBuf::from(path));
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if let Some(ref tls) = self.server.tls {
            if !tls.cert_file.exists() {
                anyhow::bail!("TLS certificate file not found: {:?}", tls.cert_file);
            }
            if !tls.key_file.exists() {
                anyhow::bail!("TLS key file not found: {:?}", tls.key_file);
            }
        }

        if let Some(ref puppetdb) = self.puppetdb {
            if !puppetdb.url.starts_with("http://") && !puppetdb.url.starts_with("https://") {
                anyhow::bail!("PuppetDB URL must start with http:// or https://: {}", puppetdb.url);
            }
        }

        if !validate_collection(&self.resolver.default_collection) {
            anyhow::bail!(
                "Invalid default collection: {}",
                self.resolver.default_collection
            );
        }

        if let Some(ref version) = self.resolver.pe_version {
            if !validate_package_version(version) {
                anyhow::bail!("Invalid PE version: {}", version);
            }
        }

        Ok(())
    }
}

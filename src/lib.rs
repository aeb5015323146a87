//! OpenVox Agent Planner Library
//!
//! Decides how the OpenVox/Puppet agent package is installed on a host:
//! which repository to configure, which keys to trust and which package to
//! install. The decisions are served over HTTP for configuration-management
//! runtimes to apply.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
use services::{FactSource, PlatformResolver};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Platform resolver (stateless, shared)
    pub resolver: Arc<PlatformResolver>,
    /// Fact source for node lookups (optional)
    pub facts: Option<Arc<dyn FactSource>>,
}

impl AppState {
    /// Build state with the PE version lookup described by the configuration
    pub fn new(config: AppConfig, facts: Option<Arc<dyn FactSource>>) -> Self {
        let resolver = PlatformResolver::new(config.resolver.pe_version_lookup());
        Self {
            config,
            resolver: Arc::new(resolver),
            facts,
        }
    }
}

//! Mock services for testing
//!
//! Provides an in-memory fact source so node endpoints can be tested
//! without a running PuppetDB.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use openvox_agent_planner::{models::NodeFacts, services::FactSource};

/// Mock fact source for testing
pub struct MockFactSource {
    nodes: Arc<RwLock<HashMap<String, NodeFacts>>>,
    /// Simulate errors when set
    pub error_mode: Arc<RwLock<Option<MockError>>>,
}

/// Types of errors the mock can simulate
#[derive(Debug, Clone)]
pub enum MockError {
    /// Connection refused
    ConnectionRefused,
    /// Internal server error
    InternalError(String),
}

impl std::fmt::Display for MockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MockError::ConnectionRefused => write!(f, "connection refused"),
            MockError::InternalError(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl Default for MockFactSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFactSource {
    pub fn new() -> Self {
        Self {
            nodes: Arc::new(RwLock::new(HashMap::new())),
            error_mode: Arc::new(RwLock::new(None)),
        }
    }

    /// Set error mode to simulate failures
    pub fn set_error_mode(&self, error: MockError) {
        *self.error_mode.write().unwrap() = Some(error);
    }

    /// Clear error mode
    pub fn clear_error_mode(&self) {
        *self.error_mode.write().unwrap() = None;
    }

    fn check_error(&self) -> anyhow::Result<()> {
        if let Some(ref error) = *self.error_mode.read().unwrap() {
            anyhow::bail!("{}", error);
        }
        Ok(())
    }

    /// Add a node with its fact map
    pub fn add_node(&self, certname: &str, facts: serde_json::Value) {
        let node = NodeFacts {
            certname: certname.to_string(),
            timestamp: None,
            environment: Some("production".to_string()),
            facts,
        };
        self.nodes
            .write()
            .unwrap()
            .insert(certname.to_string(), node);
    }
}

#[async_trait]
impl FactSource for MockFactSource {
    async fn node_facts(&self, certname: &str) -> anyhow::Result<Option<NodeFacts>> {
        self.check_error()?;
        Ok(self.nodes.read().unwrap().get(certname).cloned())
    }

    async fn version(&self) -> anyhow::Result<String> {
        self.check_error()?;
        Ok("8.4.0".to_string())
    }
}

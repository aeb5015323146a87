//! Fact gathering
//!
//! The resolver never gathers facts itself; the service asks a `FactSource`
//! for the fact map of a node and converts it to `HostFacts`.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::NodeFacts;

#[async_trait]
pub trait FactSource: Send + Sync {
    /// Facts for a node, `None` when the node is unknown
    async fn node_facts(&self, certname: &str) -> Result<Option<NodeFacts>>;

    /// Version string of the backing service, used by health checks
    async fn version(&self) -> Result<String>;
}

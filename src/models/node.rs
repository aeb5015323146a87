//! Node data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A node as returned by the PuppetDB nodes endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Node {
    /// Certificate name (unique identifier)
    pub certname: String,

    /// Set when the node has been deactivated
    pub deactivated: Option<DateTime<Utc>>,

    /// Set when the node has expired
    pub expired: Option<DateTime<Utc>>,

    /// Timestamp of the most recent facts
    pub facts_timestamp: Option<DateTime<Utc>>,

    /// Environment from facts
    pub facts_environment: Option<String>,
}

impl Node {
    pub fn is_active(&self) -> bool {
        self.deactivated.is_none() && self.expired.is_none()
    }
}

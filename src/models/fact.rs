//! Fact data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single fact as returned by the PuppetDB facts endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    /// Certificate name of the node
    pub certname: String,

    /// Top-level fact name (e.g. "os")
    pub name: String,

    /// Fact value (structured facts are nested objects)
    pub value: serde_json::Value,

    /// Environment
    pub environment: Option<String>,
}

/// All facts gathered for one node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeFacts {
    pub certname: String,

    /// When the facts were last submitted, if known
    pub timestamp: Option<DateTime<Utc>>,

    pub environment: Option<String>,

    /// Facts keyed by top-level name
    pub facts: serde_json::Value,
}

impl NodeFacts {
    /// Fold a list of PuppetDB facts into a single fact map
    pub fn from_facts(certname: &str, timestamp: Option<DateTime<Utc>>, facts: Vec<Fact>) -> Self {
        let environment = facts.iter().find_map(|f| f.environment.clone());
        let map: serde_json::Map<String, serde_json::Value> =
            facts.into_iter().map(|f| (f.name, f.value)).collect();

        Self {
            certname: certname.to_string(),
            timestamp,
            environment,
            facts: serde_json::Value::Object(map),
        }
    }
}

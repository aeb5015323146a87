//! PuppetDB client service
//!
//! Fact source backed by the PuppetDB API v4. Supports SSL/TLS with client
//! certificates the same way the agent talks to PuppetDB.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Certificate, Client, Identity, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::PuppetDbConfig;
use crate::models::{Fact, Node, NodeFacts};
use crate::services::facts::FactSource;

/// Read a PEM file named in the PuppetDB SSL settings
fn read_pem(path: &Path, what: &str) -> Result<Vec<u8>> {
    let contents = fs::read(path).map_err(|e| {
        error!("PuppetDB SSL: cannot read {} {}: {}", what, path.display(), e);
        anyhow::anyhow!("Failed to read {} {}: {}", what, path.display(), e)
    })?;
    debug!(
        "PuppetDB SSL: loaded {} ({} bytes) from {}",
        what,
        contents.len(),
        path.display()
    );
    Ok(contents)
}

/// AST query selecting a single certname
fn certname_query(certname: &str) -> String {
    serde_json::json!(["=", "certname", certname]).to_string()
}

/// PuppetDB server version information
#[derive(Debug, Clone, Deserialize)]
pub struct ServerVersion {
    pub version: String,
}

/// PuppetDB API client
#[derive(Clone)]
pub struct PuppetDbClient {
    client: Client,
    base_url: String,
}

impl PuppetDbClient {
    /// Create a new PuppetDB client with optional SSL/TLS configuration
    pub fn new(config: &PuppetDbConfig) -> Result<Self> {
        info!("Initializing PuppetDB client for {}", config.url);

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .use_rustls_tls();

        let ssl = &config.ssl;

        // CA must be loaded before the identity for rustls
        if let Some(ca_path) = &ssl.ca_path {
            let certs = Certificate::from_pem_bundle(&read_pem(ca_path, "CA bundle")?)
                .context("Failed to parse CA certificate(s) as PEM")?;
            debug!("PuppetDB SSL: trusting {} CA certificate(s)", certs.len());

            builder = builder.tls_certs_only(certs);
        }

        match ssl.identity_paths() {
            Some((cert_path, key_path)) => {
                let mut pem = read_pem(cert_path, "client certificate")?;
                pem.push(b'\n');
                pem.extend_from_slice(&read_pem(key_path, "client key")?);
                builder = builder.identity(
                    Identity::from_pem(&pem).context("Failed to build client identity")?,
                );
            }
            None if ssl.cert_path.is_some() || ssl.key_path.is_some() => {
                warn!("PuppetDB SSL: cert_path and key_path must both be set; client authentication disabled");
            }
            None => {}
        }

        if !ssl.verify {
            warn!("PuppetDB SSL certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get a specific node by certname
    pub async fn get_node(&self, certname: &str) -> Result<Option<Node>> {
        let url = format!(
            "{}/pdb/query/v4/nodes/{}",
            self.base_url,
            urlencoding::encode(certname)
        );
        debug!("PuppetDB: Sending GET request to {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.handle_response(response).await.map(Some)
    }

    /// Get facts for a specific node
    pub async fn get_node_facts(&self, certname: &str) -> Result<Vec<Fact>> {
        // The /nodes/{certname}/facts endpoint is not supported by all PuppetDB versions
        let query = certname_query(certname);
        let url = format!(
            "{}/pdb/query/v4/facts?query={}",
            self.base_url,
            urlencoding::encode(&query)
        );
        debug!("PuppetDB: Querying facts with {}", query);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;

        self.handle_response(response).await
    }

    /// Get PuppetDB server version
    pub async fn get_version(&self) -> Result<ServerVersion> {
        let url = format!("{}/pdb/meta/v1/version", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;

        self.handle_response(response).await
    }

    /// Handle HTTP response and parse JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            let body = response
                .text()
                .await
                .context("Failed to read response body")?;
            serde_json::from_str::<T>(&body).with_context(|| {
                let truncated = if body.len() > 500 {
                    format!("{}... (truncated)", body.chars().take(500).collect::<String>())
                } else {
                    body
                };
                format!("Failed to parse response JSON: {}", truncated)
            })
        } else {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Request failed with status {}: {}", status, body);
        }
    }
}

/// Log the details of a failed request and convert it
fn request_error(url: &str, e: reqwest::Error) -> anyhow::Error {
    error!("PuppetDB ERROR: HTTP request failed to {}: {}", url, e);

    if e.is_connect() {
        error!("PuppetDB ERROR: Connection failed. Check the PuppetDB URL, firewall and SSL certificates");
    }
    if e.is_timeout() {
        error!("PuppetDB ERROR: Request timed out. Consider increasing puppetdb.timeout_secs");
    }

    let mut current: Option<&dyn StdError> = e.source();
    while let Some(cause) = current {
        error!("PuppetDB ERROR: Caused by: {}", cause);
        current = cause.source();
    }

    anyhow::anyhow!("Failed to send request to {}: {}", url, e)
}

#[async_trait]
impl FactSource for PuppetDbClient {
    async fn node_facts(&self, certname: &str) -> Result<Option<NodeFacts>> {
        let Some(node) = self.get_node(certname).await? else {
            debug!("Node {} not found in PuppetDB", certname);
            return Ok(None);
        };
        if !node.is_active() {
            debug!("Node {} is deactivated or expired", certname);
            return Ok(None);
        }

        let facts = self.get_node_facts(certname).await?;
        if facts.is_empty() {
            return Ok(None);
        }

        Ok(Some(NodeFacts::from_facts(
            certname,
            node.facts_timestamp,
            facts,
        )))
    }

    async fn version(&self) -> Result<String> {
        Ok(self.get_version().await?.version)
    }
}

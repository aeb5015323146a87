//! Test application setup utilities
//!
//! Provides utilities for setting up test instances of the application
//! with a fixed PE version and mock fact sources.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    Router,
};
use tower::ServiceExt;

use openvox_agent_planner::{
    api,
    config::{AppConfig, LoggingConfig, ResolverConfig, ServerConfig},
    services::FactSource,
    AppState,
};

/// PE version every test application reports
pub const TEST_PE_VERSION: &str = "2019.8.4";

/// Test application wrapper for integration testing
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Create a test application without a fact source
    pub fn new() -> Self {
        Self::with_config(test_config(), None)
    }

    /// Create a test application backed by the given fact source
    pub fn with_facts(facts: Arc<dyn FactSource>) -> Self {
        Self::with_config(test_config(), Some(facts))
    }

    /// Create a test application with custom configuration
    pub fn with_config(config: AppConfig, facts: Option<Arc<dyn FactSource>>) -> Self {
        let state = AppState::new(config, facts);

        let router = Router::new()
            .nest("/api/v1", api::routes())
            .with_state(state.clone());

        Self { router, state }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    /// Send a request through the router and collect the whole response
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        json: Option<serde_json::Value>,
    ) -> TestResponse {
        let builder = Request::builder().method(method).uri(uri);
        let request = match json {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .expect("Failed to read response body");

        TestResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: axum::http::StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: bytes::Bytes,
}

impl TestResponse {
    /// Get the response body as a string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Parse the response body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse response as JSON")
    }

    /// Value of a response header
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Assert the response status
    pub fn assert_status(&self, expected: axum::http::StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    /// Assert the response status is OK (200)
    pub fn assert_ok(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::OK)
    }

    /// Assert the response status is Not Found (404)
    pub fn assert_not_found(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::NOT_FOUND)
    }

    /// Assert the response status is Unprocessable Entity (422)
    pub fn assert_unprocessable(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY)
    }
}

/// Create a test configuration with a fixed PE version
pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            tls: None,
        },
        puppetdb: None,
        logging: LoggingConfig::default(),
        resolver: ResolverConfig {
            pe_version: Some(TEST_PE_VERSION.to_string()),
            pe_build_file: None,
            ..ResolverConfig::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_app_creation() {
        let app = TestApp::new();
        assert!(app.state.facts.is_none());
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = TestApp::new();
        let response = app.get("/api/v1/health").await;
        response.assert_ok();
    }
}

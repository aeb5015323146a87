//! PuppetDB client integration tests
//!
//! Runs the client against a mock PuppetDB HTTP server.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use openvox_agent_planner::{
    config::PuppetDbConfig,
    services::{FactSource, PuppetDbClient},
};

async fn client_for(server: &MockServer) -> PuppetDbClient {
    PuppetDbClient::new(&PuppetDbConfig::new(server.uri())).unwrap()
}

fn node_body(certname: &str) -> serde_json::Value {
    json!({
        "certname": certname,
        "deactivated": null,
        "expired": null,
        "facts_timestamp": "2026-10-01T12:00:00.000Z",
        "facts_environment": "production"
    })
}

#[tokio::test]
async fn test_node_facts_are_folded_into_a_map() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pdb/query/v4/nodes/agent.example.vm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(node_body("agent.example.vm")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/pdb/query/v4/facts"))
        .and(query_param("query", r#"["=","certname","agent.example.vm"]"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "certname": "agent.example.vm",
                "name": "os",
                "value": { "family": "RedHat", "name": "CentOS", "release": { "major": "8" } },
                "environment": "production"
            },
            {
                "certname": "agent.example.vm",
                "name": "clientcert",
                "value": "agent.example.vm",
                "environment": "production"
            }
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let node = client
        .node_facts("agent.example.vm")
        .await
        .unwrap()
        .expect("node should exist");

    assert_eq!(node.certname, "agent.example.vm");
    assert_eq!(node.environment.as_deref(), Some("production"));
    assert!(node.timestamp.is_some());
    assert_eq!(node.facts["os"]["release"]["major"], "8");
    assert_eq!(node.facts["clientcert"], "agent.example.vm");
}

#[tokio::test]
async fn test_unknown_node_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pdb/query/v4/nodes/missing.example.vm"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "No information is known about node missing.example.vm"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert!(client
        .node_facts("missing.example.vm")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_deactivated_node_is_none() {
    let server = MockServer::start().await;

    let mut body = node_body("old.example.vm");
    body["deactivated"] = json!("2026-09-01T00:00:00.000Z");
    Mock::given(method("GET"))
        .and(path("/pdb/query/v4/nodes/old.example.vm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert!(client.node_facts("old.example.vm").await.unwrap().is_none());
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pdb/query/v4/nodes/agent.example.vm"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.node_facts("agent.example.vm").await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_version() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pdb/meta/v1/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "8.4.0" })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert_eq!(client.version().await.unwrap(), "8.4.0");
}

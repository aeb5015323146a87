//! API integration tests
//!
//! Tests the health and resolve endpoints through the full router.

use std::sync::Arc;

use serde_json::json;

use crate::common::{resolve_body, FactFixtures, MockError, MockFactSource, TestApp, TEST_PE_VERSION};

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let app = TestApp::new();
    let response = app.get("/api/v1/health").await;

    response.assert_ok();

    let json: serde_json::Value = response.json();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_detailed_health_without_puppetdb() {
    let app = TestApp::new();
    let response = app.get("/api/v1/health/detailed").await;

    response.assert_ok();

    let json: serde_json::Value = response.json();
    assert_eq!(json["components"]["puppetdb"]["status"], "not_configured");
    assert_eq!(json["components"]["pe_version"]["status"], "healthy");
    assert!(json["components"]["pe_version"]["message"]
        .as_str()
        .unwrap()
        .starts_with(TEST_PE_VERSION));
}

#[tokio::test]
async fn test_detailed_health_with_failing_puppetdb() {
    let facts = Arc::new(MockFactSource::new());
    facts.set_error_mode(MockError::ConnectionRefused);
    let app = TestApp::with_facts(facts);

    let response = app.get("/api/v1/health/detailed").await;
    response.assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);

    let json: serde_json::Value = response.json();
    assert_eq!(json["status"], "unhealthy");
    assert_eq!(json["components"]["puppetdb"]["status"], "unhealthy");

    app.get("/api/v1/health/ready")
        .await
        .assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);
    app.get("/api/v1/health/live").await.assert_ok();
}

#[tokio::test]
async fn test_readiness_probe() {
    let app = TestApp::with_facts(Arc::new(MockFactSource::new()));
    app.get("/api/v1/health/ready").await.assert_ok();
}

#[tokio::test]
async fn test_resolve_centos_uses_default_collection() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/api/v1/resolve",
            resolve_body(FactFixtures::centos7(), json!({})),
        )
        .await;

    response.assert_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(
        json["repository"]["base_url"],
        "http://yum.puppet.com/puppet/el/7/x86_64"
    );
    assert_eq!(json["repository"]["kind"], "yum");
    assert_eq!(json["repository"]["skip_if_unavailable"], "absent");
    assert_eq!(json["package"]["name"], "puppet-agent");
    assert_eq!(json["package"]["source"]["type"], "repository");
    assert_eq!(json["services"][0]["name"], "puppet");
    assert_eq!(json["services"][0]["ensure"], "running");
    assert!(json.get("diagnostics").is_none());
}

#[tokio::test]
async fn test_resolve_fedora_collection() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/api/v1/resolve",
            resolve_body(FactFixtures::fedora36(), json!({ "collection": "puppet5" })),
        )
        .await;

    response.assert_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(
        json["repository"]["base_url"],
        "http://yum.puppet.com/puppet5/fedora/36/x86_64"
    );
}

#[tokio::test]
async fn test_resolve_amazon_enterprise() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/api/v1/resolve",
            resolve_body(FactFixtures::amazon_pe(), json!({})),
        )
        .await;

    response.assert_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(
        json["repository"]["base_url"],
        format!(
            "https://master.example.vm:8140/packages/{}/el-6-x64",
            TEST_PE_VERSION
        )
    );
    assert_eq!(json["repository"]["legacy_removals"][0], "puppetlabs-pepackages");
    assert_eq!(
        json["repository"]["ssl"]["client_cert"],
        "/etc/puppetlabs/puppet/ssl/certs/agent.example.vm.pem"
    );
}

#[tokio::test]
async fn test_resolve_absolute_source() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/api/v1/resolve",
            resolve_body(
                FactFixtures::centos7(),
                json!({
                    "absolute_source": "http://mirror.example.com/puppet-agent-6.12.0.rpm",
                    "package_version": "6.12.0"
                }),
            ),
        )
        .await;

    response.assert_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["repository"]["managed"], false);
    assert!(json["repository"].get("base_url").is_none());
    assert_eq!(json["package"]["source"]["type"], "local");
    assert_eq!(
        json["package"]["source"]["path"],
        "/opt/puppetlabs/packages/puppet-agent-6.12.0.rpm"
    );
    assert_eq!(json["package"]["provider"], "rpm");
    assert_eq!(json["package"]["ensure"]["version"], "6.12.0");
}

#[tokio::test]
async fn test_resolve_windows_services_stopped() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/api/v1/resolve",
            resolve_body(
                FactFixtures::windows(),
                json!({ "service_names": ["puppet", "pxp-agent"] }),
            ),
        )
        .await;

    response.assert_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["repository"]["managed"], false);
    assert_eq!(json["diagnostics"][0]["kind"], "repository_not_applicable");
    for service in json["services"].as_array().unwrap() {
        assert_eq!(service["ensure"], "stopped");
        assert_eq!(service["enable"], false);
    }
}

#[tokio::test]
async fn test_resolve_legacy_facts() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/api/v1/resolve",
            resolve_body(FactFixtures::legacy_centos6(), json!({})),
        )
        .await;

    response.assert_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(
        json["repository"]["base_url"],
        "http://yum.puppet.com/puppet/el/6/i386"
    );
}

#[tokio::test]
async fn test_resolve_rejects_non_object_facts() {
    let app = TestApp::new();
    let response = app
        .post_json("/api/v1/resolve", json!({ "facts": ["os"] }))
        .await;

    response.assert_unprocessable();
    let json: serde_json::Value = response.json();
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn test_resolve_rejects_invalid_collection() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/api/v1/resolve",
            resolve_body(FactFixtures::centos7(), json!({ "collection": "../etc" })),
        )
        .await;

    response.assert_unprocessable();
}

#[tokio::test]
async fn test_resolve_without_pe_version_fails() {
    let mut config = crate::common::test_config();
    config.resolver.pe_version = None;
    config.resolver.pe_build_file = None;
    let app = TestApp::with_config(config, None);

    let response = app
        .post_json(
            "/api/v1/resolve",
            resolve_body(FactFixtures::amazon_pe(), json!({})),
        )
        .await;

    response.assert_status(axum::http::StatusCode::BAD_GATEWAY);
    let json: serde_json::Value = response.json();
    assert!(json["message"].as_str().unwrap().contains("PE version"));
}

#[tokio::test]
async fn test_configured_manage_repo_default() {
    let mut config = crate::common::test_config();
    config.resolver.manage_repo = false;
    let app = TestApp::with_config(config, None);

    let response = app
        .post_json(
            "/api/v1/resolve",
            resolve_body(FactFixtures::centos7(), json!({})),
        )
        .await;
    response.assert_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["repository"]["managed"], false);

    // An explicit request value still wins
    let response = app
        .post_json(
            "/api/v1/resolve",
            resolve_body(FactFixtures::centos7(), json!({ "manage_repo": true })),
        )
        .await;
    let json: serde_json::Value = response.json();
    assert_eq!(json["repository"]["managed"], true);
}

#[tokio::test]
async fn test_pe_build_file_is_read_for_requests() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "2023.8.1").unwrap();

    let mut config = crate::common::test_config();
    config.resolver.pe_version = None;
    config.resolver.pe_build_file = Some(file.path().to_path_buf());
    let app = TestApp::with_config(config, None);

    let response = app
        .post_json(
            "/api/v1/resolve",
            resolve_body(FactFixtures::amazon_pe(), json!({})),
        )
        .await;
    response.assert_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(
        json["repository"]["base_url"],
        "https://master.example.vm:8140/packages/2023.8.1/el-6-x64"
    );

    let response = app.get("/api/v1/health/detailed").await;
    response.assert_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["components"]["pe_version"]["status"], "healthy");
    assert!(json["components"]["pe_version"]["message"]
        .as_str()
        .unwrap()
        .starts_with("2023.8.1 from pe_build file"));
}

//! Health check endpoints
//!
//! `/health` and `/health/live` only report that the process is up.
//! Readiness depends on PuppetDB when it is configured; the PE version
//! lookup is reported but never makes the service unready, since only
//! enterprise hosts need it.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    /// Working but unable to serve everything (e.g. no PE version)
    Unavailable,
    NotConfigured,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ComponentStatus {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentStatus {
    fn new(status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
        }
    }
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub puppetdb: ComponentStatus,
    pub pe_version: ComponentStatus,
}

#[derive(Serialize)]
pub struct DetailedHealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    pub components: ComponentHealth,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        version: VERSION,
    })
}

async fn puppetdb_status(state: &AppState) -> ComponentStatus {
    let Some(ref facts) = state.facts else {
        return ComponentStatus {
            status: HealthStatus::NotConfigured,
            message: None,
        };
    };

    match facts.version().await {
        Ok(version) => ComponentStatus::new(HealthStatus::Healthy, format!("PuppetDB {}", version)),
        Err(e) => ComponentStatus::new(HealthStatus::Unhealthy, e.to_string()),
    }
}

async fn pe_version_status(state: &AppState) -> ComponentStatus {
    let resolver = state.resolver.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let lookup = resolver.pe_versions();
        lookup
            .pe_version()
            .map(|version| format!("{} from {}", version, lookup.describe()))
            .map_err(|e| e.to_string())
    })
    .await;

    match outcome {
        Ok(Ok(message)) => ComponentStatus::new(HealthStatus::Healthy, message),
        Ok(Err(message)) => ComponentStatus::new(HealthStatus::Unavailable, message),
        Err(e) => ComponentStatus::new(HealthStatus::Unavailable, e.to_string()),
    }
}

fn overall(puppetdb: &ComponentStatus) -> (StatusCode, HealthStatus) {
    if puppetdb.status == HealthStatus::Unhealthy {
        (StatusCode::SERVICE_UNAVAILABLE, HealthStatus::Unhealthy)
    } else {
        (StatusCode::OK, HealthStatus::Healthy)
    }
}

/// GET /api/v1/health/detailed
pub async fn health_check_detailed(
    State(state): State<AppState>,
) -> (StatusCode, Json<DetailedHealthResponse>) {
    let puppetdb = puppetdb_status(&state).await;
    let (code, status) = overall(&puppetdb);

    let response = DetailedHealthResponse {
        status,
        version: VERSION,
        components: ComponentHealth {
            puppetdb,
            pe_version: pe_version_status(&state).await,
        },
    };

    (code, Json(response))
}

/// Liveness probe (for Kubernetes)
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe (for Kubernetes)
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    overall(&puppetdb_status(&state).await).0
}

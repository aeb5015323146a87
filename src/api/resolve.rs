//! Resolution endpoint
//!
//! Resolves a plan for facts supplied by the caller, without touching
//! PuppetDB.

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::{
    models::{HostFacts, Resolution, UserParameters},
    utils::error::{AppError, AppResult},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/", post(resolve))
}

/// Request body for `POST /api/v1/resolve`
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    /// Facter fact map (structured facts, legacy names accepted)
    pub facts: serde_json::Value,
    #[serde(default)]
    pub parameters: UserParameters,
}

/// Validate parameters, apply configured defaults and resolve
///
/// The PE version lookup may read from disk, so resolution runs on the
/// blocking pool.
pub(crate) async fn resolve_plan(
    state: &AppState,
    host: &HostFacts,
    mut params: UserParameters,
) -> AppResult<Resolution> {
    params.validate()?;
    state.config.resolver.apply_defaults(&mut params);

    let resolver = state.resolver.clone();
    let facts = host.clone();
    let resolution =
        tokio::task::spawn_blocking(move || resolver.resolve(&facts, &params)).await??;
    info!(
        family = %host.os_family,
        managed = resolution.repository.managed,
        diagnostics = resolution.diagnostics.len(),
        "Resolved agent plan"
    );
    Ok(resolution)
}

/// Resolve a plan from supplied facts
///
/// POST /api/v1/resolve
async fn resolve(
    State(state): State<AppState>,
    Json(request): Json<ResolveRequest>,
) -> AppResult<Json<Resolution>> {
    if !request.facts.is_object() {
        return Err(AppError::ValidationError(
            "facts must be a JSON object".to_string(),
        ));
    }

    let host = HostFacts::from_fact_map(&request.facts);
    let resolution = resolve_plan(&state, &host, request.parameters).await?;
    Ok(Json(resolution))
}

//! Node-related API endpoints
//!
//! Resolves plans for nodes known to PuppetDB.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    api::resolve::resolve_plan,
    models::{HostFacts, NodeFacts, Resolution, Tristate, UserParameters},
    services::repo_file,
    utils::{
        error::{AppError, AppResult},
        validation::validate_certname,
    },
    AppState,
};

/// Response header naming where the repository file belongs on the node
pub const REPO_PATH_HEADER: &str = "x-repo-path";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/{certname}/plan", get(get_node_plan))
        .route("/{certname}/repo", get(get_node_repo))
}

/// Query parameters accepted by the node routes
///
/// List values (`service_names`, `install_options`) are comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct PlanQuery {
    pub package_version: Option<String>,
    pub collection: Option<String>,
    pub manage_repo: Option<bool>,
    pub manage_gpg: Option<bool>,
    pub manage_pki_dir: Option<bool>,
    pub source: Option<String>,
    pub yum_source: Option<String>,
    pub apt_source: Option<String>,
    pub absolute_source: Option<String>,
    pub alternate_pe_version: Option<String>,
    pub proxy: Option<String>,
    pub disable_proxy: Option<bool>,
    pub skip_if_unavailable: Option<String>,
    pub service_names: Option<String>,
    pub install_options: Option<String>,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

impl TryFrom<PlanQuery> for UserParameters {
    type Error = AppError;

    fn try_from(query: PlanQuery) -> Result<Self, Self::Error> {
        let skip_if_unavailable = match query.skip_if_unavailable {
            Some(value) => value
                .parse::<Tristate>()
                .map_err(AppError::ValidationError)?,
            None => Tristate::Unset,
        };

        Ok(UserParameters {
            package_version: query.package_version,
            collection: query.collection,
            manage_repo: query.manage_repo,
            manage_gpg: query.manage_gpg,
            manage_pki_dir: query.manage_pki_dir,
            source: query.source,
            yum_source: query.yum_source,
            apt_source: query.apt_source,
            absolute_source: query.absolute_source,
            alternate_pe_version: query.alternate_pe_version,
            proxy: query.proxy,
            disable_proxy: query.disable_proxy,
            skip_if_unavailable,
            service_names: query.service_names.as_deref().map(split_list),
            install_options: query
                .install_options
                .as_deref()
                .map(split_list)
                .unwrap_or_default(),
        })
    }
}

/// Plan for a PuppetDB node
#[derive(Debug, Serialize)]
pub struct NodePlan {
    pub certname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facts_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    pub host: HostFacts,
    pub resolution: Resolution,
}

async fn fetch_node_facts(state: &AppState, certname: &str) -> AppResult<NodeFacts> {
    if !validate_certname(certname) {
        return Err(AppError::ValidationError(format!(
            "Invalid certname: {}",
            certname
        )));
    }

    let facts = state
        .facts
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("PuppetDB is not configured".to_string()))?;

    facts
        .node_facts(certname)
        .await
        .map_err(|e| AppError::PuppetDb(format!("Failed to fetch facts: {}", e)))?
        .ok_or_else(|| AppError::NotFound(format!("Node '{}' not found", certname)))
}

async fn node_plan(state: &AppState, certname: &str, query: PlanQuery) -> AppResult<NodePlan> {
    let params = UserParameters::try_from(query)?;
    let node = fetch_node_facts(state, certname).await?;
    let host = HostFacts::from_fact_map(&node.facts);
    debug!("Resolving plan for {} ({})", certname, host.os_family);

    let resolution = resolve_plan(state, &host, params).await?;
    Ok(NodePlan {
        certname: node.certname,
        facts_timestamp: node.timestamp,
        environment: node.environment,
        host,
        resolution,
    })
}

/// Resolve the plan for a node using its PuppetDB facts
///
/// GET /api/v1/nodes/:certname/plan
async fn get_node_plan(
    State(state): State<AppState>,
    Path(certname): Path<String>,
    Query(query): Query<PlanQuery>,
) -> AppResult<Json<NodePlan>> {
    Ok(Json(node_plan(&state, &certname, query).await?))
}

/// Render the node's repository file
///
/// GET /api/v1/nodes/:certname/repo
async fn get_node_repo(
    State(state): State<AppState>,
    Path(certname): Path<String>,
    Query(query): Query<PlanQuery>,
) -> AppResult<impl IntoResponse> {
    let plan = node_plan(&state, &certname, query).await?;

    let file = repo_file::render(&plan.resolution.repository).ok_or_else(|| {
        AppError::NotFound(format!("No repository is managed for node '{}'", certname))
    })?;

    Ok((
        [
            ("content-type", "text/plain; charset=utf-8".to_string()),
            (REPO_PATH_HEADER, file.path),
        ],
        file.contents,
    ))
}

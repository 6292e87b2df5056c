//! Log API Handlers
//!
//! Read-only endpoints over job logs and project ledgers.

use axum::{
    Json,
    extract::{Path, State},
};
use sicuro_core::dto::log::{LedgerEntryView, LogListing, LogSnapshot};

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::log_service;

/// GET /ci/{*path}
/// Get the current content of a job log
pub async fn get_log(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> ApiResult<Json<LogSnapshot>> {
    tracing::debug!("Getting log: {}", path);

    let snapshot = log_service::get_snapshot(&state.scheduler, &path).await?;
    Ok(Json(snapshot))
}

/// GET /api/projects/{owner}/{repo}/logs
/// List the logs of a project
pub async fn list_project_logs(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
) -> ApiResult<Json<Vec<LogListing>>> {
    tracing::debug!("Listing logs of {}/{}", owner, repo);

    let logs = log_service::list_project_logs(&state.scheduler, &owner, &repo).await?;
    Ok(Json(logs))
}

/// GET /api/projects/{owner}/{repo}/ledger
/// Get the ledger of a project
pub async fn get_project_ledger(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
) -> ApiResult<Json<Vec<LedgerEntryView>>> {
    tracing::debug!("Getting ledger of {}/{}", owner, repo);

    let entries = log_service::project_ledger(&state.scheduler, &owner, &repo)?;
    Ok(Json(entries))
}

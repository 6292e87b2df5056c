//! Manual Trigger API Handlers
//!
//! `GET /run` is the target of the rebuild and revert links written into
//! logs; `POST /api/trigger` is the JSON variant used by API clients.

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use sicuro_core::domain::job::{Job, parse_revert_flag};
use sicuro_core::dto::job::{TriggerRequest, TriggerResponse};

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::trigger_service;

/// Query of `GET /run`
///
/// `repo` may carry `owner/project/sha`; explicit parameters take precedence.
#[derive(Debug, Default, Deserialize)]
pub struct RunParams {
    pub repo: Option<String>,
    pub owner: Option<String>,
    pub project: Option<String>,
    pub sha: Option<String>,
    pub language: Option<String>,
    pub url: Option<String>,
    pub revert: Option<String>,
}

impl RunParams {
    pub fn into_job(self) -> Job {
        let mut parts = self.repo.as_deref().unwrap_or_default().splitn(3, '/');
        let (repo_owner, repo_project, repo_sha) = (parts.next(), parts.next(), parts.next());

        let pick = |explicit: Option<String>, fallback: Option<&str>| {
            explicit
                .filter(|value| !value.is_empty())
                .or_else(|| fallback.map(str::to_string))
                .unwrap_or_default()
        };

        let is_revert = parse_revert_flag(self.revert.as_deref()).unwrap_or_else(|e| {
            tracing::warn!("{}, running a regular build", e);
            false
        });

        Job::new(
            pick(self.owner, repo_owner),
            pick(self.project, repo_project),
            pick(self.sha, repo_sha),
            self.language.unwrap_or_default(),
            self.url.unwrap_or_default(),
        )
        .with_revert(is_revert)
    }
}

/// GET /run
/// Trigger a build and redirect to its log
pub async fn run(State(state): State<AppState>, Query(params): Query<RunParams>) -> impl IntoResponse {
    let job = params.into_job();
    let location = format!("/ci/{}", job.log_name());
    let log = job.log_name();

    if let Err(e) = trigger_service::trigger_job(&state.scheduler, &state.config, job).await {
        tracing::warn!("Manual trigger for {} failed: {:?}", log, e);
    }

    let location = HeaderValue::from_str(&location).unwrap_or(HeaderValue::from_static("/"));
    (StatusCode::FOUND, [(header::LOCATION, location)])
}

/// POST /api/trigger
/// Trigger a build
pub async fn trigger(
    State(state): State<AppState>,
    Json(req): Json<TriggerRequest>,
) -> ApiResult<Json<TriggerResponse>> {
    tracing::info!(
        "Trigger request for {}/{}/{}",
        req.owner,
        req.repository,
        req.reference
    );

    let response = trigger_service::trigger_job(&state.scheduler, &state.config, req.into_job()).await?;
    Ok(Json(response))
}

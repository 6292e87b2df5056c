//! Webhook API Handler
//!
//! Receives GitHub deliveries. The sender always gets an acknowledgement,
//! whatever happens to the delivery.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use crate::api::AppState;
use crate::service::{trigger_service, webhook_service};

/// Header carrying the event type of a delivery
pub const EVENT_HEADER: &str = "x-github-event";

/// POST /webhook/github
pub async fn github_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let event = headers
        .get(EVENT_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    match webhook_service::translate(event, &body) {
        Ok(Some(job)) => trigger_service::dispatch_webhook_job(&state.scheduler, job).await,
        Ok(None) => tracing::debug!("Ignoring '{}' delivery", event),
        Err(e) => tracing::warn!("Discarding '{}' delivery: {}", event, e),
    }

    (StatusCode::OK, "OK")
}

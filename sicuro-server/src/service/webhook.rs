//! Webhook Translator
//!
//! Turns GitHub webhook deliveries into jobs. Signature validation happens
//! before a delivery reaches this module.

use sicuro_core::domain::job::Job;
use sicuro_core::dto::webhook::{PingEvent, PushEvent, RepositoryPayload};
use thiserror::Error;

/// Reference built for `ping` deliveries, which carry no commit
pub const PING_REFERENCE: &str = "master";

/// Service error type
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("malformed webhook payload: {0}")]
    PayloadDecode(#[from] serde_json::Error),
}

/// Translate a delivery into a job
///
/// Returns `Ok(None)` for event types that do not build anything and for
/// pushes that delete a branch.
pub fn translate(event: &str, payload: &[u8]) -> Result<Option<Job>, WebhookError> {
    match event {
        "ping" => {
            let ping: PingEvent = serde_json::from_slice(payload)?;
            if let Some(zen) = &ping.zen {
                tracing::debug!("Ping from {}: {}", ping.repository.full_name, zen);
            }
            Ok(Some(job_for(&ping.repository, PING_REFERENCE)))
        }
        "push" => {
            let push: PushEvent = serde_json::from_slice(payload)?;
            if push.is_branch_deletion() {
                tracing::debug!(
                    "Ignoring branch deletion on {}",
                    push.repository.full_name
                );
                return Ok(None);
            }
            Ok(Some(job_for(&push.repository, &push.after)))
        }
        _ => Ok(None),
    }
}

fn job_for(repository: &RepositoryPayload, reference: &str) -> Job {
    Job::new(
        repository.owner(),
        repository.name.clone(),
        reference,
        repository.language.clone().unwrap_or_default(),
        repository.ssh_url.clone(),
    )
}

//! Trigger Service
//!
//! Hands jobs from webhooks and manual triggers to the scheduler.

use sicuro_core::domain::job::Job;
use sicuro_core::dto::job::TriggerResponse;
use sicuro_runner::{Dispatch, GithubStatusReporter, JobScheduler, ScheduleError, ScheduledJob};
use std::sync::Arc;

use crate::config::ServerConfig;

/// Service error type
#[derive(Debug)]
pub enum TriggerError {
    UnsupportedLanguage(String),
    InvalidTarget(String),
    Setup(String),
}

impl From<ScheduleError> for TriggerError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::UnsupportedLanguage(language) => TriggerError::UnsupportedLanguage(language),
            ScheduleError::InvalidTarget(msg) => TriggerError::InvalidTarget(msg),
            other => TriggerError::Setup(other.to_string()),
        }
    }
}

/// Run a manually triggered job
///
/// The job reports its statuses to GitHub when a token is configured.
pub async fn trigger_job(
    scheduler: &JobScheduler,
    config: &ServerConfig,
    job: Job,
) -> Result<TriggerResponse, TriggerError> {
    let log = job.log_name();
    let job_id = job.id;

    let mut scheduled = ScheduledJob::new(job);
    if let Some(token) = &scheduler.config().credentials.github_token {
        let reporter = GithubStatusReporter::new(token.clone(), &scheduled.job, config.log_url(&log));
        scheduled = scheduled.with_reporter(Arc::new(reporter));
    }

    let accepted = scheduler.run(scheduled).await?.is_accepted();
    tracing::info!("Manual trigger for {} (accepted: {})", log, accepted);

    Ok(TriggerResponse {
        accepted,
        job_id: accepted.then_some(job_id),
        log,
    })
}

/// Run a job built from a webhook delivery, without status reporting
///
/// Failures are only logged.
pub async fn dispatch_webhook_job(scheduler: &JobScheduler, job: Job) {
    let log = job.log_name();
    match scheduler.run(ScheduledJob::new(job)).await {
        Ok(Dispatch::Accepted(_)) => tracing::info!("Webhook job for {} started", log),
        Ok(Dispatch::AlreadyRunning) => {
            tracing::info!("Webhook job for {} skipped, a job is in progress", log)
        }
        Err(e) => tracing::warn!("Webhook job for {} not started: {}", log, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sicuro_runner::config::RunnerConfig;
    use sicuro_runner::podman::PodmanRuntime;

    fn scheduler(root: &std::path::Path) -> JobScheduler {
        JobScheduler::new(
            RunnerConfig::new(root.to_path_buf()),
            Arc::new(PodmanRuntime::new("podman")),
        )
    }

    #[tokio::test]
    async fn test_trigger_rejects_unsupported_language() {
        let root = tempfile::tempdir().unwrap();
        let job = Job::new("octo", "hello", "abc1234", "cobol", "git@github.com:octo/hello.git");

        let result = trigger_job(&scheduler(root.path()), &ServerConfig::default(), job.clone()).await;

        assert!(matches!(result, Err(TriggerError::UnsupportedLanguage(l)) if l == "cobol"));
        assert!(!job.log_file_path(root.path()).exists());
    }

    #[tokio::test]
    async fn test_trigger_rejects_invalid_target() {
        let root = tempfile::tempdir().unwrap();
        let job = Job::new("octo", "hello", "../../escape", "go", "git@github.com:octo/hello.git");

        let result = trigger_job(&scheduler(root.path()), &ServerConfig::default(), job).await;
        assert!(matches!(result, Err(TriggerError::InvalidTarget(_))));
    }
}

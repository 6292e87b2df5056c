//! Background execution of an accepted job
//!
//! Owns the job's claim on its log path for the whole run. Status updates go
//! out as `pending` then exactly one terminal status; a setup failure reports
//! `error` alone.

use sicuro_core::domain::job::{BuildStatus, Job};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::{Credentials, RunnerConfig};
use crate::guard::JobClaim;
use crate::ledger::{LedgerFile, LedgerLocks};
use crate::podman::{ContainerInvocation, ContainerRuntime};
use crate::scheduler::ScheduledJob;
use crate::scheduler::summary;

pub(crate) struct Execution {
    pub(crate) config: Arc<RunnerConfig>,
    pub(crate) runtime: Arc<dyn ContainerRuntime>,
    pub(crate) ledger_locks: LedgerLocks,
    pub(crate) scheduled: ScheduledJob,
    pub(crate) log_path: PathBuf,
    pub(crate) claim: JobClaim,
}

impl Execution {
    pub(crate) async fn run(self) -> BuildStatus {
        let Execution {
            config,
            runtime,
            ledger_locks,
            scheduled,
            log_path,
            claim,
        } = self;
        let job = &scheduled.job;

        let mut log_file = match OpenOptions::new().create(true).append(true).open(&log_path) {
            Ok(file) => file,
            Err(e) => {
                error!(job_id = %job.id, "Failed to open log file {}: {}", log_path.display(), e);
                scheduled.report(BuildStatus::Error).await;
                return BuildStatus::Error;
            }
        };

        let ledger = match LedgerFile::open(&job.ledger_path(&config.log_root)) {
            Ok(ledger) => ledger,
            Err(e) => {
                error!(job_id = %job.id, "Failed to open ledger: {}", e);
                scheduled.report(BuildStatus::Error).await;
                return BuildStatus::Error;
            }
        };

        scheduled.report(BuildStatus::Pending).await;

        let (status, detail) = match build_invocation(&config, job, &ledger) {
            Some(invocation) => execute_container(runtime.as_ref(), &invocation, &log_file).await,
            None => (
                BuildStatus::Error,
                format!("no image configured for language '{}'", job.language),
            ),
        };

        info!(job_id = %job.id, "Job {} finished with status {} ({})", job.log_name(), status, detail);
        scheduled.report(status).await;

        if let Err(e) = log_file.write_all(summary::render(job, status, &detail).as_bytes()) {
            warn!(job_id = %job.id, "Failed to append summary to {}: {}", log_path.display(), e);
        }

        if let Err(e) = ledger.record(&ledger_locks, &job.reference, status) {
            error!(job_id = %job.id, "Failed to update ledger: {}", e);
        }

        drop(log_file);
        drop(ledger);
        drop(claim);
        status
    }
}

/// Resolves image and environment; `None` if the language has no image
fn build_invocation(
    config: &RunnerConfig,
    job: &Job,
    ledger: &LedgerFile,
) -> Option<ContainerInvocation> {
    let image = config.images.select(&job.language, job.is_revert)?;

    let good_commit = if job.is_revert {
        let good = ledger.ledger().last_known_good().map(str::to_string);
        match &good {
            Some(reference) => info!(job_id = %job.id, "Revert build compares against {}", reference),
            None => warn!(job_id = %job.id, "Revert build without a known-good commit"),
        }
        good
    } else {
        None
    };

    Some(ContainerInvocation {
        job_id: job.id,
        image,
        env: build_environment(job, &config.credentials, good_commit.as_deref()),
        project_dir: job.log_dir(&config.log_root),
        timeout: config.job_timeout,
    })
}

async fn execute_container(
    runtime: &dyn ContainerRuntime,
    invocation: &ContainerInvocation,
    log_file: &File,
) -> (BuildStatus, String) {
    let output = match log_file.try_clone() {
        Ok(file) => file,
        Err(e) => return (BuildStatus::Error, format!("cannot share log file: {}", e)),
    };

    match runtime.run(invocation, output).await {
        Ok(outcome) => (outcome.status(), outcome.describe()),
        Err(e) => {
            error!(job_id = %invocation.job_id, "Container invocation failed: {}", e);
            (BuildStatus::Error, e.to_string())
        }
    }
}

/// Variables exported into the build container
pub fn build_environment(
    job: &Job,
    credentials: &Credentials,
    good_commit: Option<&str>,
) -> Vec<(String, String)> {
    let mut env = vec![
        ("PROJECT_BRANCH", job.reference.clone()),
        ("COMMIT", job.short_commit().to_string()),
        ("PROJECT_REPOSITORY_URL", job.repository_url.clone()),
        ("PROJECT_REPOSITORY_NAME", job.repository.clone()),
        ("PROJECT_LANGUAGE", job.language.clone()),
        ("GITHUB_TOKEN", credentials.github_token.clone().unwrap_or_default()),
        ("EMAIL", credentials.email.clone().unwrap_or_default()),
        ("USER_NAME", credentials.user_name.clone().unwrap_or_default()),
    ];

    if let Some(good_commit) = good_commit {
        env.push(("GOOD_COMMIT", good_commit.to_string()));
    }

    env.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_environment() {
        let job = Job::new(
            "octo",
            "hello",
            "5eace776ec66a70b2775f4bbb9e2b2847331b0a9",
            "go",
            "git@github.com:octo/hello.git",
        );
        let credentials = Credentials {
            github_token: Some("ghp_x".to_string()),
            email: Some("ci@example.com".to_string()),
            user_name: None,
        };

        let env = build_environment(&job, &credentials, None);
        let get = |key: &str| env.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());

        assert_eq!(get("PROJECT_BRANCH"), Some("5eace776ec66a70b2775f4bbb9e2b2847331b0a9"));
        assert_eq!(get("COMMIT"), Some("5eace77"));
        assert_eq!(get("PROJECT_REPOSITORY_URL"), Some("git@github.com:octo/hello.git"));
        assert_eq!(get("PROJECT_REPOSITORY_NAME"), Some("hello"));
        assert_eq!(get("PROJECT_LANGUAGE"), Some("go"));
        assert_eq!(get("GITHUB_TOKEN"), Some("ghp_x"));
        assert_eq!(get("EMAIL"), Some("ci@example.com"));
        assert_eq!(get("USER_NAME"), Some(""));
        assert_eq!(get("GOOD_COMMIT"), None);

        let env = build_environment(&job, &credentials, Some("1111111"));
        assert_eq!(
            env.last(),
            Some(&("GOOD_COMMIT".to_string(), "1111111".to_string()))
        );
    }
}

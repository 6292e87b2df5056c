//! Build status reporting
//!
//! A [`StatusReporter`] is handed to a job by whoever triggered it and is
//! called with `pending` once the build starts and once more with the
//! terminal status. Reporting is best effort: failures are logged and never
//! affect the build.

use async_trait::async_trait;
use serde::Serialize;
use sicuro_core::domain::job::{BuildStatus, Job};
use tracing::{debug, warn};

/// Receives status updates of a single job
#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn report(&self, status: BuildStatus);
}

pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Context name shown next to the commit status on GitHub
pub const STATUS_CONTEXT: &str = "sicuro";

/// Body of `POST /repos/{owner}/{repo}/statuses/{sha}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitStatus {
    pub state: BuildStatus,
    pub target_url: String,
    pub description: String,
    pub context: String,
}

/// Publishes job statuses as GitHub commit statuses
#[derive(Debug, Clone)]
pub struct GithubStatusReporter {
    client: reqwest::Client,
    api_url: String,
    token: String,
    owner: String,
    repository: String,
    sha: String,
    target_url: String,
}

impl GithubStatusReporter {
    /// # Arguments
    /// * `token` - GitHub token allowed to write commit statuses
    /// * `job` - The job whose reference receives the statuses
    /// * `target_url` - Link shown on the status, usually the job's log page
    pub fn new(token: impl Into<String>, job: &Job, target_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: GITHUB_API_URL.to_string(),
            token: token.into(),
            owner: job.owner.clone(),
            repository: job.repository.clone(),
            sha: job.reference.clone(),
            target_url: target_url.into(),
        }
    }

    /// Points the reporter at another API host (GitHub Enterprise)
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn statuses_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/statuses/{}",
            self.api_url, self.owner, self.repository, self.sha
        )
    }

    pub fn commit_status(&self, status: BuildStatus) -> CommitStatus {
        let description = match status {
            BuildStatus::Pending => "Build started",
            BuildStatus::Success => "Build succeeded",
            BuildStatus::Failure => "Build failed",
            BuildStatus::Error => "Build could not be run",
        };

        CommitStatus {
            state: status,
            target_url: self.target_url.clone(),
            description: description.to_string(),
            context: STATUS_CONTEXT.to_string(),
        }
    }
}

#[async_trait]
impl StatusReporter for GithubStatusReporter {
    async fn report(&self, status: BuildStatus) {
        let url = self.statuses_url();
        debug!("Reporting {} to {}", status, url);

        let result = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "sicuro-ci")
            .json(&self.commit_status(status))
            .send()
            .await
            .and_then(|response| response.error_for_status());

        if let Err(e) = result {
            warn!(
                "Failed to report status {} for {}/{}@{}: {}",
                status, self.owner, self.repository, self.sha, e
            );
        }
    }
}

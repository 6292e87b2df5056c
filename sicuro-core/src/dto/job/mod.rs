//! Job DTOs for triggering builds

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::Job;

/// Manual trigger of a build, as sent by API clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRequest {
    pub owner: String,
    pub repository: String,
    /// Branch name or commit hash
    pub reference: String,
    pub language: String,
    pub repository_url: String,
    #[serde(default)]
    pub revert: bool,
}

impl TriggerRequest {
    pub fn into_job(self) -> Job {
        Job::new(
            self.owner,
            self.repository,
            self.reference,
            self.language,
            self.repository_url,
        )
        .with_revert(self.revert)
    }
}

/// Outcome of a trigger request
///
/// `accepted` is false when a job for the same target is still running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub accepted: bool,
    pub job_id: Option<Uuid>,
    /// Log name (`owner/repo/reference`) to fetch or stream
    pub log: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_request_defaults_to_regular_build() {
        let req: TriggerRequest = serde_json::from_value(serde_json::json!({
            "owner": "octo",
            "repository": "hello",
            "reference": "abc1234",
            "language": "Go",
            "repository_url": "git@github.com:octo/hello.git"
        }))
        .unwrap();

        let job = req.into_job();
        assert!(!job.is_revert);
        assert_eq!(job.log_name(), "octo/hello/abc1234");
        assert_eq!(job.language, "Go");
    }
}

//! GitHub webhook payloads
//!
//! Only the fields the job translator reads are modelled; serde ignores the
//! rest of the payload.

use serde::{Deserialize, Serialize};

/// `after` value GitHub sends when a push deletes the branch
pub const NULL_COMMIT: &str = "0000000000000000000000000000000000000000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryPayload {
    pub name: String,
    /// `owner/name`
    pub full_name: String,
    pub ssh_url: String,
    #[serde(default)]
    pub language: Option<String>,
}

impl RepositoryPayload {
    /// Owner part of `full_name`
    pub fn owner(&self) -> &str {
        self.full_name
            .split_once('/')
            .map(|(owner, _)| owner)
            .unwrap_or(&self.full_name)
    }
}

/// `push` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEvent {
    /// Commit the ref points to after the push
    pub after: String,
    #[serde(default)]
    pub deleted: bool,
    pub repository: RepositoryPayload,
}

impl PushEvent {
    pub fn is_branch_deletion(&self) -> bool {
        self.deleted || self.after == NULL_COMMIT
    }
}

/// `ping` event, sent when the hook is created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingEvent {
    #[serde(default)]
    pub zen: Option<String>,
    pub repository: RepositoryPayload,
}

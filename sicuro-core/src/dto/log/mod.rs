//! Log DTOs exchanged with viewers

use serde::{Deserialize, Serialize};

use crate::domain::job::BuildStatus;

/// One delivery of the log tail protocol
///
/// Carries the full current content and the cursor to resume from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogDelivery {
    pub content: String,
    pub cursor: String,
}

/// Point-in-time view of a log file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSnapshot {
    pub content: String,
    pub cursor: String,
    /// Whether a job is currently writing to this log
    pub active: bool,
}

/// A log file of a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogListing {
    /// Log name (`owner/repo/reference`)
    pub name: String,
    pub active: bool,
}

/// A ledger line as exposed over the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntryView {
    pub reference: String,
    pub status: BuildStatus,
}

//! Job domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::log::{self, is_safe_segment};

/// Number of leading reference characters exposed to the container as `COMMIT`
pub const SHORT_COMMIT_LEN: usize = 7;

/// One clone-build-test-report run for a target
///
/// Built by the webhook translator or a manual trigger and consumed exactly
/// once by the scheduler. Nothing about it is persisted beyond its log file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub owner: String,
    pub repository: String,
    /// Branch name or commit hash the build checks out
    pub reference: String,
    pub language: String,
    pub repository_url: String,
    /// Run the backup image against the last known-good reference
    pub is_revert: bool,
}

impl Job {
    pub fn new(
        owner: impl Into<String>,
        repository: impl Into<String>,
        reference: impl Into<String>,
        language: impl Into<String>,
        repository_url: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            repository: repository.into(),
            reference: reference.into(),
            language: language.into(),
            repository_url: repository_url.into(),
            is_revert: false,
        }
    }

    pub fn with_revert(mut self, is_revert: bool) -> Self {
        self.is_revert = is_revert;
        self
    }

    /// `owner/repo/reference`, the log name used in URLs and links
    pub fn log_name(&self) -> String {
        format!("{}/{}/{}", self.owner, self.repository, self.reference)
    }

    pub fn log_dir(&self, log_root: &Path) -> PathBuf {
        log_root.join(&self.owner).join(&self.repository)
    }

    pub fn log_file_path(&self, log_root: &Path) -> PathBuf {
        log::log_file_path(log_root, &self.log_name())
    }

    pub fn backup_dir(&self, log_root: &Path) -> PathBuf {
        log::backup_dir(log_root, &self.owner, &self.repository)
    }

    pub fn ledger_path(&self, log_root: &Path) -> PathBuf {
        log::ledger_path(log_root, &self.owner, &self.repository)
    }

    /// First seven characters of the reference, or all of it when shorter
    pub fn short_commit(&self) -> &str {
        match self.reference.char_indices().nth(SHORT_COMMIT_LEN) {
            Some((idx, _)) => &self.reference[..idx],
            None => &self.reference,
        }
    }

    /// Checks that the target maps onto a path inside the log root
    pub fn validate_target(&self) -> Result<(), String> {
        if !is_safe_segment(&self.owner) {
            return Err(format!("invalid owner '{}'", self.owner));
        }
        if !is_safe_segment(&self.repository) {
            return Err(format!("invalid repository '{}'", self.repository));
        }
        if self.reference.is_empty() || !self.reference.split('/').all(is_safe_segment) {
            return Err(format!("invalid reference '{}'", self.reference));
        }
        Ok(())
    }
}

/// Build status reported to callbacks and stored in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Pending,
    Success,
    Failure,
    Error,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Pending => "pending",
            BuildStatus::Success => "success",
            BuildStatus::Failure => "failure",
            BuildStatus::Error => "error",
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BuildStatus::Pending),
            "success" => Ok(BuildStatus::Success),
            "failure" => Ok(BuildStatus::Failure),
            "error" => Ok(BuildStatus::Error),
            other => Err(format!("unknown build status '{}'", other)),
        }
    }
}

/// Parses the free-form revert flag of a manual trigger
///
/// Absent or empty means "not a revert". Anything that is not a recognised
/// boolean spelling is returned as an error so the caller can log it before
/// falling back to `false`.
pub fn parse_revert_flag(raw: Option<&str>) -> Result<bool, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(false),
        Some("1" | "t" | "T" | "true" | "TRUE" | "True") => Ok(true),
        Some("0" | "f" | "F" | "false" | "FALSE" | "False") => Ok(false),
        Some(other) => Err(format!("invalid revert flag '{}'", other)),
    }
}

//! Log file layout and streaming cursor
//!
//! Every job writes to `<log-root>/<owner>/<repo>/<reference>.log`. The
//! per-project ledger lives next to the logs under `backup/bisect.txt`.

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Extension appended to a log name to get its file name
pub const LOG_FILE_EXT: &str = ".log";

/// Per-project directory holding the ledger
pub const BACKUP_DIR: &str = "backup";

/// Ledger file name inside [`BACKUP_DIR`]
pub const LEDGER_FILE: &str = "bisect.txt";

pub fn log_file_path(log_root: &Path, log_name: &str) -> PathBuf {
    log_root.join(format!("{}{}", log_name, LOG_FILE_EXT))
}

pub fn backup_dir(log_root: &Path, owner: &str, repository: &str) -> PathBuf {
    log_root.join(owner).join(repository).join(BACKUP_DIR)
}

pub fn ledger_path(log_root: &Path, owner: &str, repository: &str) -> PathBuf {
    backup_dir(log_root, owner, repository).join(LEDGER_FILE)
}

/// A path segment that cannot escape its parent directory
pub fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains('/')
        && !segment.contains('\\')
        && !segment.contains('\0')
}

/// Normalizes a log name taken from a request path
///
/// Strips surrounding slashes and rejects anything that would resolve outside
/// the log root.
pub fn normalize_log_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim_matches('/');
    if trimmed.is_empty() || !trimmed.split('/').all(is_safe_segment) {
        return None;
    }
    Some(trimmed.to_string())
}

/// Resume marker of a log subscriber
///
/// Wraps the log file's modification time as nanoseconds since the Unix epoch.
/// On the wire it is the base-16 rendering of that integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogCursor(i64);

impl LogCursor {
    pub const EPOCH: LogCursor = LogCursor(0);

    pub fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn as_nanos(&self) -> i64 {
        self.0
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        let time: DateTime<Utc> = time.into();
        Self(time.timestamp_nanos_opt().unwrap_or(i64::MAX))
    }

    pub fn is_newer_than(&self, other: &LogCursor) -> bool {
        self.0 > other.0
    }

    pub fn encode(&self) -> String {
        if self.0 < 0 {
            format!("-{:x}", self.0.unsigned_abs())
        } else {
            format!("{:x}", self.0)
        }
    }

    /// Parses a base-16 cursor, `None` when malformed
    pub fn decode(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        i64::from_str_radix(raw, 16).ok().map(Self)
    }
}

impl fmt::Display for LogCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

//! Log Service
//!
//! Read-side access to job logs and project ledgers.

use sicuro_core::domain::log::{
    self, BACKUP_DIR, LOG_FILE_EXT, is_safe_segment, normalize_log_name,
};
use sicuro_core::dto::log::{LedgerEntryView, LogListing, LogSnapshot};
use sicuro_runner::JobScheduler;
use sicuro_runner::error::LedgerError;
use sicuro_runner::ledger::read_ledger;
use std::io;

use crate::service::tail;

/// Service error type
#[derive(Debug)]
pub enum LogError {
    InvalidName(String),
    NotFound(String),
    Io(io::Error),
    Ledger(LedgerError),
}

impl From<LedgerError> for LogError {
    fn from(err: LedgerError) -> Self {
        LogError::Ledger(err)
    }
}

/// Current content of a log, with its cursor and whether a job writes to it
pub async fn get_snapshot(scheduler: &JobScheduler, raw_name: &str) -> Result<LogSnapshot, LogError> {
    let name = normalize_log_name(raw_name).ok_or_else(|| LogError::InvalidName(raw_name.to_string()))?;
    let path = log::log_file_path(&scheduler.config().log_root, &name);

    let (content, cursor) = tail::snapshot(&path).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LogError::NotFound(name.clone()),
        _ => LogError::Io(e),
    })?;

    Ok(LogSnapshot {
        content,
        cursor: cursor.encode(),
        active: scheduler.is_active(&path),
    })
}

/// Lists the log files of a project, sorted by name
///
/// A project without logs yields an empty list. References containing `/`
/// live in nested directories and are listed under their full name; the
/// ledger's backup directory is skipped.
pub async fn list_project_logs(
    scheduler: &JobScheduler,
    owner: &str,
    repository: &str,
) -> Result<Vec<LogListing>, LogError> {
    check_project(owner, repository)?;
    let project_dir = scheduler.config().log_root.join(owner).join(repository);

    let mut logs = Vec::new();
    let mut pending = vec![(project_dir, String::new())];

    while let Some((dir, prefix)) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(LogError::Io(e)),
        };

        while let Some(entry) = entries.next_entry().await.map_err(LogError::Io)? {
            let file_type = entry.file_type().await.map_err(LogError::Io)?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };

            if file_type.is_dir() {
                if prefix.is_empty() && name == BACKUP_DIR {
                    continue;
                }
                pending.push((entry.path(), format!("{}{}/", prefix, name)));
                continue;
            }

            let Some(reference) = name.strip_suffix(LOG_FILE_EXT) else {
                continue;
            };
            if !file_type.is_file() {
                continue;
            }

            logs.push(LogListing {
                name: format!("{}/{}/{}{}", owner, repository, prefix, reference),
                active: scheduler.is_active(&entry.path()),
            });
        }
    }

    logs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(logs)
}

/// Entries of a project's ledger in stored order
///
/// Lines that are not `reference=status` are left out.
pub fn project_ledger(
    scheduler: &JobScheduler,
    owner: &str,
    repository: &str,
) -> Result<Vec<LedgerEntryView>, LogError> {
    check_project(owner, repository)?;
    let path = log::ledger_path(&scheduler.config().log_root, owner, repository);

    let ledger = read_ledger(&path)?;
    Ok(ledger
        .entries()
        .map(|entry| LedgerEntryView {
            reference: entry.reference.clone(),
            status: entry.status,
        })
        .collect())
}

fn check_project(owner: &str, repository: &str) -> Result<(), LogError> {
    if is_safe_segment(owner) && is_safe_segment(repository) {
        Ok(())
    } else {
        Err(LogError::InvalidName(format!("{}/{}", owner, repository)))
    }
}

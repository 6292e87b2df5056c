//! Error types for the runner

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Reasons a job is refused before any background work starts
///
/// None of these reach the status reporter: no job was committed to.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("unsupported language '{0}'")]
    UnsupportedLanguage(String),

    #[error("invalid job target: {0}")]
    InvalidTarget(String),

    #[error("failed to create log directory {path}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to prepare log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The container program could not be started or awaited
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("failed to start container program '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to attach log file to container output: {0}")]
    Output(#[source] io::Error),

    #[error("failed while waiting for the container to exit: {0}")]
    Wait(#[source] io::Error),
}

/// Ledger file could not be prepared, read or rewritten
#[derive(Debug, Error)]
#[error("ledger {path}: {source}")]
pub struct LedgerError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl LedgerError {
    pub(crate) fn new(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

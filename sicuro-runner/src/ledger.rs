//! Ledger file storage
//!
//! Loads a project's `backup/bisect.txt` at the start of a job so a revert
//! can resolve its known-good commit. Jobs for different references of one
//! project share the ledger, so recording re-reads the file under a
//! per-ledger lock and applies only the job's own entry.

use sicuro_core::domain::job::BuildStatus;
use sicuro_core::domain::ledger::Ledger;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;
use uuid::Uuid;

use crate::error::LedgerError;

/// Write locks for ledger files, one per path
#[derive(Debug, Clone, Default)]
pub struct LedgerLocks {
    locks: Arc<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
}

impl LedgerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock serializing every writer of the ledger at `path`
    pub fn for_path(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(path.to_path_buf()).or_default())
    }
}

/// A project ledger opened for read-modify-write
#[derive(Debug)]
pub struct LedgerFile {
    path: PathBuf,
    snapshot: String,
}

impl LedgerFile {
    /// Creates the backup directory and ledger file if needed, then reads it
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| LedgerError::new(dir, e))?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| LedgerError::new(path, e))?;

        let snapshot = fs::read_to_string(path).map_err(|e| LedgerError::new(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            snapshot,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Content read when the ledger was opened
    pub fn snapshot(&self) -> &str {
        &self.snapshot
    }

    pub fn ledger(&self) -> Ledger {
        Ledger::parse(&self.snapshot)
    }

    /// Records `status` for `reference` in the ledger as it is on disk now
    ///
    /// Entries written by other jobs since the snapshot was taken are kept.
    /// The new content goes to a uniquely named sibling temp file that is
    /// renamed over the ledger, so readers never see a half-written file.
    pub fn record(
        &self,
        locks: &LedgerLocks,
        reference: &str,
        status: BuildStatus,
    ) -> Result<(), LedgerError> {
        let lock = locks.for_path(&self.path);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut ledger = read_ledger(&self.path)?;
        ledger.upsert(reference, status);

        let tmp = self
            .path
            .with_extension(format!("txt.{}.tmp", Uuid::new_v4().simple()));
        fs::write(&tmp, ledger.render()).map_err(|e| LedgerError::new(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(LedgerError::new(&self.path, e));
        }

        debug!(
            "Recorded {}={} in ledger {}",
            reference,
            status,
            self.path.display()
        );
        Ok(())
    }
}

/// Reads a ledger for inspection; a missing file is an empty ledger
pub fn read_ledger(path: &Path) -> Result<Ledger, LedgerError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Ledger::parse(&content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Ledger::new()),
        Err(e) => Err(LedgerError::new(path, e)),
    }
}

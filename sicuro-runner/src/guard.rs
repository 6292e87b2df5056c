//! Single-flight guard
//!
//! Registry of log paths that currently have a job running. Claiming a path
//! is a single check-and-insert under the registry lock, so two concurrent
//! triggers for the same target can never both proceed. The claim is released
//! when its [`JobClaim`] is dropped.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Registry = Arc<Mutex<HashSet<PathBuf>>>;

/// In-process set of log paths with a job in flight
#[derive(Debug, Clone, Default)]
pub struct ActiveJobs {
    paths: Registry,
}

impl ActiveJobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `log_path`, or returns `None` if a job already holds it
    pub fn try_claim(&self, log_path: &Path) -> Option<JobClaim> {
        let mut paths = lock(&self.paths);
        if !paths.insert(log_path.to_path_buf()) {
            return None;
        }
        Some(JobClaim {
            path: log_path.to_path_buf(),
            paths: Arc::clone(&self.paths),
        })
    }

    pub fn is_active(&self, log_path: &Path) -> bool {
        lock(&self.paths).contains(log_path)
    }

    pub fn len(&self) -> usize {
        lock(&self.paths).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.paths).is_empty()
    }
}

/// Ownership of one log path for the lifetime of a job
#[derive(Debug)]
pub struct JobClaim {
    path: PathBuf,
    paths: Registry,
}

impl JobClaim {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for JobClaim {
    fn drop(&mut self) {
        lock(&self.paths).remove(&self.path);
    }
}

// A panic while holding the lock leaves the set itself consistent.
fn lock(paths: &Mutex<HashSet<PathBuf>>) -> MutexGuard<'_, HashSet<PathBuf>> {
    paths.lock().unwrap_or_else(PoisonError::into_inner)
}

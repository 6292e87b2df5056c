//! Sicuro Runner
//!
//! Executes CI jobs in build containers on the local host.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Guard: One job in flight per log path
//! - Podman: Container invocation and exit classification
//! - Ledger: Per-project record of build outcomes
//! - Status: Best-effort reporting of job statuses
//! - Scheduler: Job validation, dispatch and lifecycle

pub mod config;
pub mod error;
pub mod guard;
pub mod ledger;
pub mod podman;
pub mod scheduler;
pub mod status;

pub use config::{Credentials, RunnerConfig};
pub use error::{ContainerError, LedgerError, ScheduleError};
pub use podman::{ContainerRuntime, PodmanRuntime};
pub use scheduler::{Dispatch, JobScheduler, ScheduledJob};
pub use status::{GithubStatusReporter, StatusReporter};

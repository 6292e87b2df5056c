//! Scheduler layer for the runner
//!
//! This layer turns accepted jobs into container runs. It validates and
//! prepares each job, enforces one run per target, and drives the run from
//! pending to a recorded terminal status.

pub mod dispatcher;
mod execution;
pub mod summary;

pub use dispatcher::{Dispatch, JobScheduler, ScheduledJob};
pub use execution::build_environment;

//! Job scheduler
//!
//! Entry point for running a job. Validation and log preparation happen on
//! the caller's task and fail fast; the container run is dispatched to its
//! own task. At most one job runs per log path at any time.
//!
//! Preparation uses `tokio::fs`, so `run` can be awaited directly from
//! request handlers.

use sicuro_core::domain::job::{BuildStatus, Job};
use sicuro_core::domain::language::normalize_language;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::RunnerConfig;
use crate::error::ScheduleError;
use crate::guard::ActiveJobs;
use crate::ledger::LedgerLocks;
use crate::podman::ContainerRuntime;
use crate::scheduler::execution::Execution;
use crate::status::StatusReporter;

/// A job together with the optional reporter for its status updates
#[derive(Clone)]
pub struct ScheduledJob {
    pub job: Job,
    pub reporter: Option<Arc<dyn StatusReporter>>,
}

impl ScheduledJob {
    pub fn new(job: Job) -> Self {
        Self {
            job,
            reporter: None,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn StatusReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub(crate) async fn report(&self, status: BuildStatus) {
        if let Some(reporter) = &self.reporter {
            reporter.report(status).await;
        }
    }
}

/// Result of handing a job to the scheduler
#[derive(Debug)]
pub enum Dispatch {
    /// The job runs in the background; the handle yields its final status
    Accepted(JoinHandle<BuildStatus>),
    /// A job for the same log path is still running; nothing was done
    AlreadyRunning,
}

impl Dispatch {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Dispatch::Accepted(_))
    }
}

/// Runs jobs in build containers, one at a time per target
#[derive(Clone)]
pub struct JobScheduler {
    config: Arc<RunnerConfig>,
    active: ActiveJobs,
    ledger_locks: LedgerLocks,
    runtime: Arc<dyn ContainerRuntime>,
}

impl JobScheduler {
    pub fn new(config: RunnerConfig, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            config: Arc::new(config),
            active: ActiveJobs::new(),
            ledger_locks: LedgerLocks::new(),
            runtime,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Whether a job is currently writing to `log_path`
    pub fn is_active(&self, log_path: &Path) -> bool {
        self.active.is_active(log_path)
    }

    /// Validates and prepares a job, then dispatches it
    ///
    /// Must be called from within a Tokio runtime. Rejected jobs leave no
    /// trace on disk beyond the project directory and never reach the
    /// status reporter.
    pub async fn run(&self, scheduled: ScheduledJob) -> Result<Dispatch, ScheduleError> {
        let ScheduledJob { mut job, reporter } = scheduled;

        job.validate_target().map_err(|e| {
            warn!(job_id = %job.id, "Rejecting job: {}", e);
            ScheduleError::InvalidTarget(e)
        })?;

        job.language = normalize_language(&job.language);
        if !self.config.images.is_supported(&job.language) {
            warn!(
                job_id = %job.id,
                "Project language '{}' is currently not supported",
                job.language
            );
            return Err(ScheduleError::UnsupportedLanguage(job.language));
        }

        let log_path = job.log_file_path(&self.config.log_root);
        if let Some(dir) = log_path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|source| {
                warn!("Couldn't create directory {} for job: {}", dir.display(), source);
                ScheduleError::DirectoryCreation {
                    path: dir.to_path_buf(),
                    source,
                }
            })?;
        }

        let Some(claim) = self.active.try_claim(&log_path) else {
            info!("A job is currently in progress: {}", log_path.display());
            return Ok(Dispatch::AlreadyRunning);
        };

        // Truncate while holding the claim so no running job loses its log.
        tokio::fs::File::create(&log_path).await.map_err(|source| {
            warn!("Failed to clear log file {}: {}", log_path.display(), source);
            ScheduleError::LogFile {
                path: log_path.clone(),
                source,
            }
        })?;

        info!(
            job_id = %job.id,
            "Running job {} (language: {}, revert: {})",
            job.log_name(),
            job.language,
            job.is_revert
        );

        let execution = Execution {
            config: Arc::clone(&self.config),
            runtime: Arc::clone(&self.runtime),
            ledger_locks: self.ledger_locks.clone(),
            scheduled: ScheduledJob { job, reporter },
            log_path,
            claim,
        };

        Ok(Dispatch::Accepted(tokio::spawn(execution.run())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContainerError;
    use crate::podman::{ContainerInvocation, ExitOutcome};
    use async_trait::async_trait;
    use std::fs::{self, File};
    use std::io::{self, Write};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    /// Runtime that writes one line of output and returns a fixed outcome
    struct FakeRuntime {
        outcome: Option<ExitOutcome>,
        gate: Option<Arc<Semaphore>>,
        calls: AtomicUsize,
        invocations: Mutex<Vec<ContainerInvocation>>,
    }

    impl FakeRuntime {
        fn new(outcome: Option<ExitOutcome>) -> Self {
            Self {
                outcome,
                gate: None,
                calls: AtomicUsize::new(0),
                invocations: Mutex::new(Vec::new()),
            }
        }

        fn gated(outcome: ExitOutcome, gate: Arc<Semaphore>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(Some(outcome))
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ContainerRuntime for FakeRuntime {
        async fn run(
            &self,
            invocation: &ContainerInvocation,
            mut output: File,
        ) -> Result<ExitOutcome, ContainerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.invocations.lock().unwrap().push(invocation.clone());
            writeln!(output, "building with {}", invocation.image).unwrap();

            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }

            match &self.outcome {
                Some(outcome) => Ok(outcome.clone()),
                None => Err(ContainerError::Spawn {
                    program: "fake".to_string(),
                    source: io::Error::new(io::ErrorKind::NotFound, "not installed"),
                }),
            }
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        statuses: Mutex<Vec<BuildStatus>>,
    }

    impl RecordingReporter {
        fn statuses(&self) -> Vec<BuildStatus> {
            self.statuses.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StatusReporter for RecordingReporter {
        async fn report(&self, status: BuildStatus) {
            self.statuses.lock().unwrap().push(status);
        }
    }

    fn go_job(reference: &str) -> Job {
        Job::new("octo", "hello", reference, "Go", "git@github.com:octo/hello.git")
    }

    fn scheduler(root: &Path, runtime: Arc<FakeRuntime>) -> JobScheduler {
        JobScheduler::new(RunnerConfig::new(root.to_path_buf()), runtime)
    }

    async fn finish(dispatch: Dispatch) -> BuildStatus {
        match dispatch {
            Dispatch::Accepted(handle) => handle.await.unwrap(),
            Dispatch::AlreadyRunning => panic!("job was not accepted"),
        }
    }

    #[tokio::test]
    async fn test_successful_build() {
        let root = tempfile::tempdir().unwrap();
        let runtime = Arc::new(FakeRuntime::new(Some(ExitOutcome::Succeeded)));
        let reporter = Arc::new(RecordingReporter::default());
        let scheduler = scheduler(root.path(), runtime.clone());

        let job = go_job("abc1234");
        let scheduled = ScheduledJob::new(job.clone()).with_reporter(reporter.clone());
        let status = finish(scheduler.run(scheduled).await.unwrap()).await;

        assert_eq!(status, BuildStatus::Success);
        assert_eq!(reporter.statuses(), vec![BuildStatus::Pending, BuildStatus::Success]);

        let log = fs::read_to_string(job.log_file_path(root.path())).unwrap();
        assert!(log.contains("building with ci_image:1.16"));
        assert!(log.contains("Build completed successfully"));
        assert!(log.contains("Rebuild"));
        assert!(!log.contains("Revert commit"));

        let ledger = fs::read_to_string(job.ledger_path(root.path())).unwrap();
        assert_eq!(ledger, "abc1234=success\n");
        assert!(!scheduler.is_active(&job.log_file_path(root.path())));

        let invocation = runtime.invocations.lock().unwrap()[0].clone();
        assert_eq!(invocation.project_dir, root.path().join("octo/hello"));
        assert_eq!(invocation.env_var("PROJECT_LANGUAGE"), Some("go"));
        assert_eq!(invocation.env_var("GOOD_COMMIT"), None);
    }

    #[tokio::test]
    async fn test_failed_build_offers_revert() {
        let root = tempfile::tempdir().unwrap();
        let runtime = Arc::new(FakeRuntime::new(Some(ExitOutcome::Failed { code: Some(2) })));
        let reporter = Arc::new(RecordingReporter::default());
        let scheduler = scheduler(root.path(), runtime);

        let job = go_job("abc1234");
        let scheduled = ScheduledJob::new(job.clone()).with_reporter(reporter.clone());
        let status = finish(scheduler.run(scheduled).await.unwrap()).await;

        assert_eq!(status, BuildStatus::Failure);
        assert_eq!(reporter.statuses(), vec![BuildStatus::Pending, BuildStatus::Failure]);

        let log = fs::read_to_string(job.log_file_path(root.path())).unwrap();
        assert!(log.contains("Build failed with exit code 2."));
        assert!(log.contains("Revert commit"));
        assert!(log.contains("Rebuild"));

        let ledger = fs::read_to_string(job.ledger_path(root.path())).unwrap();
        assert_eq!(ledger, "abc1234=failure\n");
    }

    #[tokio::test]
    async fn test_unsupported_language_leaves_no_trace() {
        let root = tempfile::tempdir().unwrap();
        let runtime = Arc::new(FakeRuntime::new(Some(ExitOutcome::Succeeded)));
        let reporter = Arc::new(RecordingReporter::default());
        let scheduler = scheduler(root.path(), runtime.clone());

        let job = Job::new("octo", "hello", "abc1234", "COBOL", "git@github.com:octo/hello.git");
        let scheduled = ScheduledJob::new(job.clone()).with_reporter(reporter.clone());
        let result = scheduler.run(scheduled).await;

        assert!(matches!(result, Err(ScheduleError::UnsupportedLanguage(lang)) if lang == "cobol"));
        assert!(!job.log_file_path(root.path()).exists());
        assert!(!job.ledger_path(root.path()).exists());
        assert!(reporter.statuses().is_empty());
        assert_eq!(runtime.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_target_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let runtime = Arc::new(FakeRuntime::new(Some(ExitOutcome::Succeeded)));
        let scheduler = scheduler(root.path(), runtime.clone());

        let job = Job::new("..", "hello", "abc1234", "go", "git@github.com:octo/hello.git");
        let result = scheduler.run(ScheduledJob::new(job)).await;

        assert!(matches!(result, Err(ScheduleError::InvalidTarget(_))));
        assert_eq!(runtime.calls(), 0);
    }

    #[tokio::test]
    async fn test_single_flight_per_target() {
        let root = tempfile::tempdir().unwrap();
        let gate = Arc::new(Semaphore::new(0));
        let runtime = Arc::new(FakeRuntime::gated(ExitOutcome::Succeeded, gate.clone()));
        let reporter = Arc::new(RecordingReporter::default());
        let scheduler = scheduler(root.path(), runtime.clone());

        let job = go_job("abc1234");
        let first = scheduler
            .run(ScheduledJob::new(job.clone()).with_reporter(reporter.clone()))
            .await
            .unwrap();
        assert!(first.is_accepted());
        assert!(scheduler.is_active(&job.log_file_path(root.path())));

        let second = scheduler
            .run(ScheduledJob::new(job.clone()).with_reporter(reporter.clone()))
            .await
            .unwrap();
        assert!(matches!(second, Dispatch::AlreadyRunning));

        // Another target of the same project is independent.
        let other = scheduler.run(ScheduledJob::new(go_job("def5678"))).await.unwrap();
        assert!(other.is_accepted());

        gate.add_permits(2);
        assert_eq!(finish(first).await, BuildStatus::Success);
        assert_eq!(finish(other).await, BuildStatus::Success);

        assert_eq!(runtime.calls(), 2);
        assert_eq!(reporter.statuses(), vec![BuildStatus::Pending, BuildStatus::Success]);
        assert!(!scheduler.is_active(&job.log_file_path(root.path())));

        gate.add_permits(1);
        let again = scheduler.run(ScheduledJob::new(job)).await.unwrap();
        assert_eq!(finish(again).await, BuildStatus::Success);
        assert_eq!(runtime.calls(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_references_share_ledger() {
        let root = tempfile::tempdir().unwrap();
        let gate = Arc::new(Semaphore::new(0));
        let runtime = Arc::new(FakeRuntime::gated(ExitOutcome::Succeeded, gate.clone()));
        let scheduler = scheduler(root.path(), runtime.clone());

        let first = scheduler.run(ScheduledJob::new(go_job("aaaaaaa"))).await.unwrap();
        let second = scheduler.run(ScheduledJob::new(go_job("bbbbbbb"))).await.unwrap();

        // Both jobs have read the ledger once they reach the container.
        while runtime.calls() < 2 {
            tokio::task::yield_now().await;
        }
        gate.add_permits(2);
        assert_eq!(finish(first).await, BuildStatus::Success);
        assert_eq!(finish(second).await, BuildStatus::Success);

        let ledger_path = go_job("aaaaaaa").ledger_path(root.path());
        let content = fs::read_to_string(&ledger_path).unwrap();
        assert!(content.contains("aaaaaaa=success\n"), "ledger was {:?}", content);
        assert!(content.contains("bbbbbbb=success\n"), "ledger was {:?}", content);
        assert_eq!(content.lines().count(), 2);
        assert_eq!(fs::read_dir(ledger_path.parent().unwrap()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_revert_build_uses_backup_image_and_good_commit() {
        let root = tempfile::tempdir().unwrap();
        let runtime = Arc::new(FakeRuntime::new(Some(ExitOutcome::Succeeded)));
        let scheduler = scheduler(root.path(), runtime.clone());

        let job = go_job("bad0000").with_revert(true);
        let ledger_path = job.ledger_path(root.path());
        fs::create_dir_all(ledger_path.parent().unwrap()).unwrap();
        fs::write(&ledger_path, "bad0000=failure\ngood111=success\nold2222=success\n").unwrap();

        let status = finish(scheduler.run(ScheduledJob::new(job)).await.unwrap()).await;
        assert_eq!(status, BuildStatus::Success);

        let invocation = runtime.invocations.lock().unwrap()[0].clone();
        assert_eq!(invocation.image, "backup_ci_image:1.16");
        assert_eq!(invocation.env_var("GOOD_COMMIT"), Some("good111"));

        assert_eq!(
            fs::read_to_string(&ledger_path).unwrap(),
            "bad0000=success\ngood111=success\nold2222=success\n"
        );
    }

    #[tokio::test]
    async fn test_container_error_reports_error() {
        let root = tempfile::tempdir().unwrap();
        let runtime = Arc::new(FakeRuntime::new(None));
        let reporter = Arc::new(RecordingReporter::default());
        let scheduler = scheduler(root.path(), runtime);

        let job = go_job("abc1234");
        let scheduled = ScheduledJob::new(job.clone()).with_reporter(reporter.clone());
        let status = finish(scheduler.run(scheduled).await.unwrap()).await;

        assert_eq!(status, BuildStatus::Error);
        assert_eq!(reporter.statuses(), vec![BuildStatus::Pending, BuildStatus::Error]);

        let log = fs::read_to_string(job.log_file_path(root.path())).unwrap();
        assert!(log.contains("Build could not be run"));
        assert_eq!(
            fs::read_to_string(job.ledger_path(root.path())).unwrap(),
            "abc1234=error\n"
        );
    }

    #[tokio::test]
    async fn test_ledger_setup_failure_reports_error_only() {
        let root = tempfile::tempdir().unwrap();
        let runtime = Arc::new(FakeRuntime::new(Some(ExitOutcome::Succeeded)));
        let reporter = Arc::new(RecordingReporter::default());
        let scheduler = scheduler(root.path(), runtime.clone());

        let job = go_job("abc1234");
        fs::create_dir_all(job.log_dir(root.path())).unwrap();
        fs::write(job.backup_dir(root.path()), "not a directory").unwrap();

        let scheduled = ScheduledJob::new(job.clone()).with_reporter(reporter.clone());
        let status = finish(scheduler.run(scheduled).await.unwrap()).await;

        assert_eq!(status, BuildStatus::Error);
        assert_eq!(reporter.statuses(), vec![BuildStatus::Error]);
        assert_eq!(runtime.calls(), 0);
        assert!(!scheduler.is_active(&job.log_file_path(root.path())));
    }

    #[tokio::test]
    async fn test_previous_log_is_truncated() {
        let root = tempfile::tempdir().unwrap();
        let runtime = Arc::new(FakeRuntime::new(Some(ExitOutcome::Succeeded)));
        let scheduler = scheduler(root.path(), runtime);

        let job = go_job("abc1234");
        let log_path = job.log_file_path(root.path());
        fs::create_dir_all(log_path.parent().unwrap()).unwrap();
        fs::write(&log_path, "output of an earlier run\n").unwrap();

        finish(scheduler.run(ScheduledJob::new(job)).await.unwrap()).await;

        let log = fs::read_to_string(&log_path).unwrap();
        assert!(!log.contains("output of an earlier run"));
        assert!(log.starts_with("building with ci_image:1.16"));
    }
}

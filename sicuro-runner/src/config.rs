//! Runner configuration
//!
//! Defines where logs and ledgers live, which container program runs the
//! builds, the language to image table, the credentials forwarded into each
//! build container and the build timeout.

use sicuro_core::domain::language::ImageTable;
use std::path::PathBuf;
use std::time::Duration;

/// Build timeout used when `SICURO_JOB_TIMEOUT` is not set
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Identity and token forwarded into every build container
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub github_token: Option<String>,
    pub email: Option<String>,
    pub user_name: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            github_token: non_empty_var("GITHUB_TOKEN"),
            email: non_empty_var("EMAIL"),
            user_name: non_empty_var("USER_NAME"),
        }
    }
}

/// Runner configuration
///
/// Built once at start-up and shared read-only by the scheduler and every
/// job it dispatches.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Root directory of all job logs (`<root>/<owner>/<repo>/<ref>.log`)
    pub log_root: PathBuf,

    /// Container program invoked for each build (e.g., "podman")
    pub container_program: String,

    /// Supported languages and their build images
    pub images: ImageTable,

    pub credentials: Credentials,

    /// Maximum time a build container may run, `None` for no limit
    pub job_timeout: Option<Duration>,
}

impl RunnerConfig {
    /// Creates a new configuration with defaults
    pub fn new(log_root: PathBuf) -> Self {
        Self {
            log_root,
            container_program: "podman".to_string(),
            images: ImageTable::default(),
            credentials: Credentials::default(),
            job_timeout: Some(DEFAULT_JOB_TIMEOUT),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - SICURO_LOG_DIR (optional, default: $ROOT_DIR/ci/logs or ./ci/logs)
    /// - SICURO_CONTAINER_PROGRAM (optional, default: podman)
    /// - SICURO_IMAGES (optional, `lang=image` pairs separated by commas)
    /// - SICURO_JOB_TIMEOUT (optional, seconds, default: 1800, 0 disables)
    /// - GITHUB_TOKEN, EMAIL, USER_NAME (optional, forwarded into builds)
    pub fn from_env() -> anyhow::Result<Self> {
        let log_root = std::env::var("SICURO_LOG_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_log_root);

        let container_program =
            non_empty_var("SICURO_CONTAINER_PROGRAM").unwrap_or_else(|| "podman".to_string());

        let images = match std::env::var("SICURO_IMAGES") {
            Ok(spec) => ImageTable::default()
                .with_overrides(&spec)
                .map_err(|e| anyhow::anyhow!("Invalid SICURO_IMAGES: {}", e))?,
            Err(_) => ImageTable::default(),
        };

        let job_timeout = match std::env::var("SICURO_JOB_TIMEOUT") {
            Ok(raw) => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| anyhow::anyhow!("SICURO_JOB_TIMEOUT must be a number of seconds"))?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            Err(_) => Some(DEFAULT_JOB_TIMEOUT),
        };

        Ok(Self {
            log_root,
            container_program,
            images,
            credentials: Credentials::from_env(),
            job_timeout,
        })
    }

    pub fn with_images(mut self, images: ImageTable) -> Self {
        self.images = images;
        self
    }

    pub fn with_job_timeout(mut self, job_timeout: Option<Duration>) -> Self {
        self.job_timeout = job_timeout;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.log_root.as_os_str().is_empty() {
            anyhow::bail!("log_root cannot be empty");
        }

        if self.container_program.trim().is_empty() {
            anyhow::bail!("container_program cannot be empty");
        }

        if self.images.languages().next().is_none() {
            anyhow::bail!("at least one language image must be configured");
        }

        if self.job_timeout.is_some_and(|t| t.is_zero()) {
            anyhow::bail!("job_timeout must be greater than 0 when set");
        }

        Ok(())
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new(default_log_root())
    }
}

fn default_log_root() -> PathBuf {
    let root = std::env::var("ROOT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));
    root.join("ci").join("logs")
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

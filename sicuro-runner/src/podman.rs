//! Container runtime for build execution
//!
//! Runs one build container per job:
//! - Passing the job environment to the container
//! - Appending combined stdout/stderr to the job log file
//! - Classifying the exit status
//! - Killing and removing containers that outlive the build timeout

use async_trait::async_trait;
use sicuro_core::domain::job::BuildStatus;
use std::fs::File;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ContainerError;

/// Mount point of the project directory inside the build container
pub const PROJECT_MOUNT: &str = "/project";

/// Everything needed to start one build container
#[derive(Debug, Clone)]
pub struct ContainerInvocation {
    pub job_id: Uuid,
    pub image: String,
    /// Variables exported into the container, in order
    pub env: Vec<(String, String)>,
    /// Project log directory, mounted at [`PROJECT_MOUNT`]
    pub project_dir: PathBuf,
    pub timeout: Option<Duration>,
}

impl ContainerInvocation {
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// How a build container finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    Succeeded,
    Failed { code: Option<i32> },
    TimedOut(Duration),
}

impl ExitOutcome {
    /// Any completed run is a success or a failure, never an error
    pub fn status(&self) -> BuildStatus {
        match self {
            ExitOutcome::Succeeded => BuildStatus::Success,
            ExitOutcome::Failed { .. } | ExitOutcome::TimedOut(_) => BuildStatus::Failure,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ExitOutcome::Succeeded => "exit code 0".to_string(),
            ExitOutcome::Failed { code: Some(code) } => format!("exit code {}", code),
            ExitOutcome::Failed { code: None } => "terminated by signal".to_string(),
            ExitOutcome::TimedOut(limit) => format!("timed out after {}s", limit.as_secs()),
        }
    }
}

/// Starts build containers and waits for them
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Runs the invocation to completion, writing combined output to `output`
    async fn run(
        &self,
        invocation: &ContainerInvocation,
        output: File,
    ) -> Result<ExitOutcome, ContainerError>;
}

/// Runs builds through a podman-compatible CLI (`podman`, `docker`)
#[derive(Debug, Clone)]
pub struct PodmanRuntime {
    program: String,
}

impl PodmanRuntime {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn container_name(job_id: Uuid) -> String {
        format!("sicuro-{}", job_id)
    }

    /// Arguments of the `run` command
    ///
    /// Variables are passed by name only; their values travel through the
    /// program's environment so tokens never show up in the process list.
    pub fn build_args(&self, invocation: &ContainerInvocation) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            Self::container_name(invocation.job_id),
            "-v".to_string(),
            format!("{}:{}", invocation.project_dir.display(), PROJECT_MOUNT),
        ];

        for (key, _) in &invocation.env {
            args.push("-e".to_string());
            args.push(key.clone());
        }

        args.push(invocation.image.clone());
        args
    }

    /// Force-removes a container left behind by a killed run
    async fn remove_container(&self, name: &str) {
        match Command::new(&self.program)
            .arg("rm")
            .arg("-f")
            .arg(name)
            .output()
            .await
        {
            Ok(output) if output.status.success() => {
                debug!("Container {} removed", name);
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!("Failed to remove container {}: {}", name, stderr.trim());
            }
            Err(e) => {
                warn!("Failed to remove container {}: {}", name, e);
            }
        }
    }
}

#[async_trait]
impl ContainerRuntime for PodmanRuntime {
    async fn run(
        &self,
        invocation: &ContainerInvocation,
        output: File,
    ) -> Result<ExitOutcome, ContainerError> {
        let name = Self::container_name(invocation.job_id);
        let stderr = output.try_clone().map_err(ContainerError::Output)?;

        info!(
            "Starting container {} with image {} for job {}",
            name, invocation.image, invocation.job_id
        );

        let mut child = Command::new(&self.program)
            .args(self.build_args(invocation))
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::from(output))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ContainerError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let status = match invocation.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status.map_err(ContainerError::Wait)?,
                Err(_) => {
                    warn!(
                        "Container {} exceeded the {:?} build timeout, killing it",
                        name, limit
                    );
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill container process {}: {}", name, e);
                    }
                    self.remove_container(&name).await;
                    return Ok(ExitOutcome::TimedOut(limit));
                }
            },
            None => child.wait().await.map_err(ContainerError::Wait)?,
        };

        debug!("Container {} exited with {}", name, status);

        if status.success() {
            Ok(ExitOutcome::Succeeded)
        } else {
            Ok(ExitOutcome::Failed {
                code: status.code(),
            })
        }
    }
}

/// Checks that the container program is installed and answers `--version`
pub fn check_runtime_available(program: &str) -> anyhow::Result<String> {
    let output = std::process::Command::new(program)
        .arg("--version")
        .output()
        .map_err(|e| anyhow::anyhow!("Failed to execute '{} --version': {}", program, e))?;

    if !output.status.success() {
        anyhow::bail!("{} is not working correctly", program);
    }

    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    info!("Container runtime is available: {}", version);

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(timeout: Option<Duration>) -> ContainerInvocation {
        ContainerInvocation {
            job_id: Uuid::nil(),
            image: "ci_image:1.16".to_string(),
            env: vec![
                ("PROJECT_BRANCH".to_string(), "master".to_string()),
                ("GITHUB_TOKEN".to_string(), "secret".to_string()),
            ],
            project_dir: PathBuf::from("/logs/octo/hello"),
            timeout,
        }
    }

    #[test]
    fn test_build_args() {
        let runtime = PodmanRuntime::new("podman");
        let args = runtime.build_args(&invocation(None));

        assert_eq!(
            args,
            vec![
                "run",
                "--rm",
                "--name",
                "sicuro-00000000-0000-0000-0000-000000000000",
                "-v",
                "/logs/octo/hello:/project",
                "-e",
                "PROJECT_BRANCH",
                "-e",
                "GITHUB_TOKEN",
                "ci_image:1.16",
            ]
        );
        assert!(!args.iter().any(|a| a.contains("secret")));
    }

    #[test]
    fn test_exit_outcome_classification() {
        assert_eq!(ExitOutcome::Succeeded.status(), BuildStatus::Success);
        assert_eq!(
            ExitOutcome::Failed { code: Some(1) }.status(),
            BuildStatus::Failure
        );
        assert_eq!(
            ExitOutcome::TimedOut(Duration::from_secs(5)).status(),
            BuildStatus::Failure
        );
        assert_eq!(ExitOutcome::Failed { code: Some(2) }.describe(), "exit code 2");
        assert_eq!(
            ExitOutcome::TimedOut(Duration::from_secs(5)).describe(),
            "timed out after 5s"
        );
    }

    #[test]
    fn test_env_var_lookup() {
        let inv = invocation(None);
        assert_eq!(inv.env_var("PROJECT_BRANCH"), Some("master"));
        assert_eq!(inv.env_var("GOOD_COMMIT"), None);
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let output = File::create(dir.path().join("out.log")).unwrap();
        let runtime = PodmanRuntime::new("/nonexistent/sicuro-container-program");

        let result = runtime.run(&invocation(None), output).await;
        assert!(matches!(result, Err(ContainerError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_failure_and_output_is_captured() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("out.log");
        let output = File::create(&log_path).unwrap();

        // `sh run ...` tries to execute a script named "run" and exits non-zero.
        let runtime = PodmanRuntime::new("sh");
        let outcome = runtime
            .run(&invocation(Some(Duration::from_secs(10))), output)
            .await
            .unwrap();

        assert!(matches!(outcome, ExitOutcome::Failed { code: Some(c) } if c != 0));
        let captured = std::fs::read_to_string(&log_path).unwrap();
        assert!(!captured.is_empty());
    }
}

//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod ledger;
mod logs;
mod trigger;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Trigger a build
    Trigger {
        /// Repository owner
        #[arg(long)]
        owner: String,

        /// Repository name
        #[arg(long)]
        repo: String,

        /// Branch name or commit hash to build
        #[arg(long)]
        sha: String,

        /// Project language (e.g., go, ruby, javascript)
        #[arg(long)]
        language: String,

        /// Clone URL of the repository
        #[arg(long)]
        url: String,

        /// Run the revert build against the last known-good commit
        #[arg(long)]
        revert: bool,
    },
    /// Show a build log
    Logs {
        /// Log name (owner/repo/reference)
        name: String,

        /// Keep streaming the log as it grows
        #[arg(short, long)]
        follow: bool,

        /// Resume a stream after this cursor
        #[arg(long, requires = "follow")]
        cursor: Option<String>,
    },
    /// List the build logs of a project
    List {
        /// Project (owner/repo)
        project: String,
    },
    /// Show the recorded build statuses of a project
    Ledger {
        /// Project (owner/repo)
        project: String,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Trigger {
            owner,
            repo,
            sha,
            language,
            url,
            revert,
        } => {
            let req = sicuro_core::dto::job::TriggerRequest {
                owner,
                repository: repo,
                reference: sha,
                language,
                repository_url: url,
                revert,
            };
            trigger::handle_trigger(req, config).await
        }
        Commands::Logs {
            name,
            follow,
            cursor,
        } => logs::handle_logs(&name, follow, cursor, config).await,
        Commands::List { project } => logs::handle_list(&project, config).await,
        Commands::Ledger { project } => ledger::handle_ledger(&project, config).await,
    }
}

/// Split `owner/repo` into its parts
pub(crate) fn parse_project(project: &str) -> Result<(String, String)> {
    match project.trim_matches('/').split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => anyhow::bail!("Project must be given as owner/repo, got '{}'", project),
    }
}

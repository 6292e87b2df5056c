//! Ledger command handler

use anyhow::Result;
use colored::*;
use sicuro_core::domain::job::BuildStatus;

use crate::api::ApiClient;
use crate::commands::parse_project;
use crate::config::Config;

/// Show the ledger of a project, newest entries first
pub async fn handle_ledger(project: &str, config: &Config) -> Result<()> {
    let (owner, repo) = parse_project(project)?;
    let client = ApiClient::new(&config.server_url);
    let entries = client.get_ledger(&owner, &repo).await?;

    if entries.is_empty() {
        println!("{}", format!("No builds recorded for {}.", project).yellow());
        return Ok(());
    }

    println!("{}", format!("Ledger of {}:", project).bold());
    let mut good_marked = false;
    for entry in entries {
        let marker = if !good_marked && entry.status == BuildStatus::Success {
            good_marked = true;
            " (last known good)".green().to_string()
        } else {
            String::new()
        };
        println!(
            "  {:<42} {}{}",
            entry.reference,
            colorize_status(entry.status),
            marker
        );
    }

    Ok(())
}

/// Colorize a build status for display
fn colorize_status(status: BuildStatus) -> ColoredString {
    match status {
        BuildStatus::Pending => status.as_str().yellow(),
        BuildStatus::Success => status.as_str().green(),
        BuildStatus::Failure => status.as_str().red(),
        BuildStatus::Error => status.as_str().red().bold(),
    }
}

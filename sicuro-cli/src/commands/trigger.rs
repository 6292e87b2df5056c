//! Trigger command handler

use anyhow::Result;
use colored::*;
use sicuro_core::dto::job::TriggerRequest;

use crate::api::ApiClient;
use crate::config::Config;

/// Trigger a build and tell the user where to find its log
pub async fn handle_trigger(req: TriggerRequest, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.server_url);
    let revert = req.revert;
    let response = client.trigger(&req).await?;

    if response.accepted {
        let kind = if revert { "Revert build" } else { "Build" };
        println!("{} {}", "✓".green(), format!("{} started", kind).bold());
        if let Some(job_id) = response.job_id {
            println!("  Job: {}", job_id.to_string().dimmed());
        }
    } else {
        println!(
            "{}",
            "A build for this target is already running.".yellow()
        );
    }

    println!("  Log: {}", response.log.cyan());
    println!(
        "{}",
        format!("  Follow with: sicuro logs {} --follow", response.log).dimmed()
    );

    Ok(())
}

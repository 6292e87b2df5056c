//! Log command handlers
//!
//! Prints log snapshots, follows live logs and lists project logs.

use anyhow::Result;
use colored::*;
use futures_util::StreamExt;
use std::io::Write;

use crate::api::ApiClient;
use crate::commands::parse_project;
use crate::config::Config;

/// Cursor the server uses for a subscriber that has seen nothing
const EPOCH_CURSOR: &str = "0";

/// Show a log, or follow it when `follow` is set
pub async fn handle_logs(
    name: &str,
    follow: bool,
    cursor: Option<String>,
    config: &Config,
) -> Result<()> {
    let client = ApiClient::new(&config.server_url);

    if follow {
        return follow_log(&client, name, cursor.as_deref()).await;
    }

    let snapshot = client.get_log(name).await?;
    println!("{}", format!("Log {}:", name).bold());
    println!("{}", "─".repeat(80).dimmed());
    print!("{}", snapshot.content);
    if !snapshot.content.ends_with('\n') {
        println!();
    }
    println!("{}", "─".repeat(80).dimmed());
    if snapshot.active {
        println!("{}", "Build in progress".yellow());
    }
    println!("{}", format!("Cursor: {}", snapshot.cursor).dimmed());

    Ok(())
}

/// Stream a log until the server closes the connection or the user interrupts
async fn follow_log(client: &ApiClient, name: &str, cursor: Option<&str>) -> Result<()> {
    let stream = client.stream_log(name, cursor).await?;
    let mut stream = std::pin::pin!(stream);
    let interrupted = tokio::signal::ctrl_c();
    let mut interrupted = std::pin::pin!(interrupted);

    let mut printed = String::new();
    let mut last_cursor = cursor.unwrap_or(EPOCH_CURSOR).to_string();

    loop {
        tokio::select! {
            delivery = stream.next() => {
                let Some(delivery) = delivery else {
                    break;
                };
                let delivery = delivery?;

                // An unchanged cursor carries an error message, not log content.
                if delivery.cursor == last_cursor {
                    eprintln!("{}", delivery.content.red());
                    continue;
                }

                let mut stdout = std::io::stdout();
                write!(stdout, "{}", appended(&printed, &delivery.content))?;
                stdout.flush()?;

                printed = delivery.content;
                last_cursor = delivery.cursor;
            }
            _ = &mut interrupted => {
                break;
            }
        }
    }

    eprintln!("{}", format!("Resume with --cursor {}", last_cursor).dimmed());
    Ok(())
}

/// Part of `current` not printed yet
///
/// A log that no longer starts with what was printed was rewritten by a new
/// build and is printed again in full.
fn appended<'a>(printed: &str, current: &'a str) -> &'a str {
    current.strip_prefix(printed).unwrap_or(current)
}

/// List the logs of a project
pub async fn handle_list(project: &str, config: &Config) -> Result<()> {
    let (owner, repo) = parse_project(project)?;
    let client = ApiClient::new(&config.server_url);
    let logs = client.list_logs(&owner, &repo).await?;

    if logs.is_empty() {
        println!("{}", format!("No logs found for {}.", project).yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} log(s):", logs.len()).bold());
    println!();
    for log in logs {
        if log.active {
            println!("  {} {} {}", "▸".cyan(), log.name, "(running)".yellow());
        } else {
            println!("  {} {}", "▸".cyan(), log.name);
        }
    }

    Ok(())
}

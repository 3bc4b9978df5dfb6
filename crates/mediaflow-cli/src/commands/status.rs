//! Status command - show queue and pipeline status.

use super::{format_size, get_database};
use anyhow::{Context, Result};
use colored::Colorize;
use mediaflow_config::Config;
use mediaflow_core::{QueueStatus, RoutingMessage};

pub fn run() -> Result<()> {
    let db = get_database()?;
    let config = Config::load().context("Failed to load configuration")?;
    let queue = &config.queue.name;

    println!("{}", "Mediaflow Status".cyan().bold());
    println!("{}", "─".repeat(50));

    let stats = db.get_stats(queue)?;

    println!();
    println!("{} {}", "Routing Queue".white().bold(), queue.dimmed());
    println!("  {} Pending: {}", "○".yellow(), stats.queue_pending);
    println!("  {} Processing: {}", "◐".blue(), stats.queue_processing);
    println!("  {} Completed: {}", "●".green(), stats.queue_done);
    if stats.queue_failed > 0 {
        println!("  {} Failed: {}", "✗".red(), stats.queue_failed);
    }

    let pending = db.list_messages(queue, Some(QueueStatus::Pending))?;
    if !pending.is_empty() {
        println!();
        println!("{}", "Pending Messages".white().bold());
        for message in pending.iter().take(5) {
            println!("  {} {}", "•".dimmed(), describe(&message.body));
        }
        if pending.len() > 5 {
            println!("  {} ...and {} more", "".dimmed(), pending.len() - 5);
        }
    }

    let failed = db.list_messages(queue, Some(QueueStatus::Failed))?;
    if !failed.is_empty() {
        println!();
        println!("{}", "Failed Messages".red().bold());
        for message in failed.iter().take(3) {
            println!(
                "  {} {} (attempt {})",
                "✗".red(),
                describe(&message.body),
                message.attempts
            );
            if let Some(ref err) = message.error {
                println!("    {}", err.dimmed());
            }
        }
    }

    println!();
    println!("{}", "Knowledge Records".white().bold());
    println!("  Total: {}", stats.total_records);
    let mut sources: Vec<_> = stats.records_by_source.iter().collect();
    sources.sort();
    for (source, count) in sources {
        println!("  {} {}: {}", "•".dimmed(), source, count);
    }

    println!();
    println!("{}", "Workflow Executions".white().bold());
    println!("  Total: {}", stats.total_executions);
    let mut workflows: Vec<_> = stats.executions_by_workflow.iter().collect();
    workflows.sort();
    for (workflow, count) in workflows {
        println!("  {} {}: {}", "•".dimmed(), workflow, count);
    }

    println!();
    println!("Database size: {}", format_size(stats.database_size_bytes));

    if stats.queue_pending == 0 && stats.queue_processing == 0 {
        println!();
        println!(
            "{}",
            "No messages in queue. Use 'mediaflow upload <file>' to add content.".dimmed()
        );
    }

    Ok(())
}

/// Short label for a queued routing message.
fn describe(body: &str) -> String {
    match RoutingMessage::parse(body) {
        Ok(message) => format!("{} ({})", message.key, message.original_key),
        Err(_) => "(unparseable message)".to_string(),
    }
}

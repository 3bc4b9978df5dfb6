//! Dispatch command - consume routing messages from the local queue.

use super::{runtime, Pipeline};
use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use mediaflow_core::QueueMessage;
use mediaflow_db::Database;
use mediaflow_ingest::{BatchReport, DispatchOutcome};
use std::time::Duration;
use tracing::{error, warn};

pub fn run(all: bool, batch_size: Option<usize>, retry_failed: bool) -> Result<()> {
    let pipeline = Pipeline::load()?;
    let queue = pipeline.queue_name().to_string();
    let batch_size = batch_size.unwrap_or(pipeline.config.dispatch.batch_size).max(1);
    let db = &pipeline.db;

    let timeout = chrono::Duration::from_std(Duration::from_secs(
        pipeline.config.dispatch.visibility_timeout_seconds,
    ))
    .context("dispatch.visibility_timeout_seconds is out of range")?;
    let requeued = db.requeue_stale(&queue, timeout)?;
    if requeued > 0 {
        warn!("Requeued {} messages left processing by an earlier run", requeued);
        println!("{} Requeued {} abandoned messages", "↻".yellow(), requeued);
    }

    if retry_failed {
        let reset = db.retry_failed(&queue)?;
        println!("{} Reset {} failed messages to pending", "✓".green(), reset);
    }

    let (pending, _, _, _) = db.queue_counts(&queue)?;
    if pending == 0 {
        println!("{}", "No pending messages.".dimmed());
        return Ok(());
    }

    let total = if all { pending as u64 } else { pending.min(batch_size as i64) as u64 };
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .context("Invalid progress template")?
            .progress_chars("█▓░"),
    );

    let rt = runtime()?;
    let mut summary = BatchReport::default();

    loop {
        let messages = db.receive(&queue, batch_size)?;
        if messages.is_empty() {
            break;
        }

        let report = rt.block_on(
            pipeline
                .dispatcher
                .dispatch(messages.iter().map(|m| m.body.as_str())),
        );
        settle(db, &messages, &report);
        pb.inc(messages.len() as u64);
        summary.outcomes.extend(report.outcomes);

        if !all {
            break;
        }
    }

    pb.finish_and_clear();
    print_summary(&summary);

    Ok(())
}

/// Acknowledge each message according to its outcome. A message whose
/// acknowledgement fails stays processing and is redelivered after the
/// visibility timeout. Returns how many acknowledgements failed.
fn settle(db: &Database, messages: &[QueueMessage], report: &BatchReport) -> usize {
    let mut unsettled = 0;
    for (message, outcome) in messages.iter().zip(&report.outcomes) {
        let result = match outcome {
            DispatchOutcome::Failed(error) => {
                warn!("Message {} failed: {}", message.id, error);
                db.mark_failed(&message.id, error)
            }
            _ => db.mark_completed(&message.id),
        };
        if let Err(e) = result {
            error!("Failed to settle message {}: {}", message.id, e);
            unsettled += 1;
        }
    }
    unsettled
}

fn print_summary(report: &BatchReport) {
    println!("{}", "Dispatch Summary".cyan().bold());
    println!("{}", "─".repeat(50));
    println!("  {} Stored directly: {}", "●".green(), report.stored());
    println!("  {} Workflows started: {}", "▶".blue(), report.workflows_started());
    println!("  {} Unsupported: {}", "○".yellow(), report.unsupported());
    println!("  {} Skipped: {}", "-".dimmed(), report.skipped());
    if report.failed() > 0 {
        println!("  {} Failed: {}", "✗".red(), report.failed());
        println!();
        println!(
            "{}",
            "Failed messages can be retried with 'mediaflow dispatch --retry-failed'.".dimmed()
        );
    }
}

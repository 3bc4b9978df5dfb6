//! Relocate command - handle an upload notification file.

use super::{print_record_outcome, runtime, Pipeline};
use anyhow::{Context, Result};
use colored::Colorize;
use mediaflow_core::UploadNotification;
use std::path::Path;

pub fn run(notification: &Path) -> Result<()> {
    let pipeline = Pipeline::load()?;

    let body = std::fs::read_to_string(notification)
        .with_context(|| format!("Failed to read {}", notification.display()))?;
    let notification = UploadNotification::from_json(&body).context("Unparseable notification")?;

    println!(
        "{} {} records",
        "Relocating".cyan().bold(),
        notification.records.len()
    );

    let rt = runtime()?;
    let outcomes = rt.block_on(pipeline.relocator.handle_notification(&notification));

    for outcome in &outcomes {
        print_record_outcome(outcome);
    }

    let failed = outcomes.iter().filter(|o| o.is_failure()).count();
    if failed > 0 {
        println!();
        println!("{} {} of {} records failed", "!".yellow(), failed, outcomes.len());
    }

    Ok(())
}

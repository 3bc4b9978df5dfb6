//! Watch command implementation.

use super::{get_paths, print_record_outcome, runtime, Pipeline};
use anyhow::{Context, Result};
use colored::Colorize;
use mediaflow_ingest::{scan_incoming, UploadWatcher, WatcherConfig};
use std::time::Duration;
use tracing::info;

/// Watch the incoming prefix and relocate every new upload.
pub fn run(scan: bool) -> Result<()> {
    let pipeline = Pipeline::load()?;
    let paths = get_paths()?;
    let config = &pipeline.config;

    let bucket_dir = config.storage_root(&paths).join(&config.storage.bucket);
    let watcher_config = WatcherConfig::new(
        &config.storage.bucket,
        bucket_dir,
        &config.storage.incoming_prefix,
        &config.watch,
    );

    let mut watcher = UploadWatcher::new(watcher_config.clone())?;
    watcher.start()?;

    println!("{}", "Starting upload watcher...".cyan());
    println!("Watching: {}", watcher_config.incoming_dir().display());
    println!("\nPress Ctrl+C to stop.\n");

    let rt = runtime()?;

    if scan {
        let existing =
            scan_incoming(&watcher_config).context("Failed to scan incoming directory")?;
        println!("{} {} existing uploads", "Found".green(), existing.len());
        for outcome in rt.block_on(pipeline.relocator.handle_batch(&existing)) {
            print_record_outcome(&outcome);
        }
    }

    loop {
        let events = watcher.next_batch(Duration::from_millis(500));
        if events.is_empty() {
            continue;
        }

        info!("Relocating {} new uploads", events.len());
        for outcome in rt.block_on(pipeline.relocator.handle_batch(&events)) {
            print_record_outcome(&outcome);
        }
    }
}

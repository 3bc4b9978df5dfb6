//! Upload command - put a local file into the bucket and relocate it.

use super::{print_record_outcome, runtime, Pipeline};
use anyhow::{Context, Result};
use colored::Colorize;
use mediaflow_core::{keys, ObjectStore, UploadEvent, PUT_EVENT_NAME};
use std::path::Path;

pub fn run(file: &Path, key: Option<String>) -> Result<()> {
    let pipeline = Pipeline::load()?;
    let storage = &pipeline.config.storage;

    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .context("Upload path has no file name")?;
    let key = key.unwrap_or_else(|| format!("{}{}", storage.incoming_prefix, file_name));

    let body = std::fs::read(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let rt = runtime()?;
    let outcome = rt.block_on(async {
        pipeline
            .storage
            .put(&storage.bucket, &key, &body)
            .await
            .context("Failed to store upload")?;
        println!(
            "{} {} ({} bytes)",
            "Uploaded".green(),
            keys::s3_uri(&storage.bucket, &key),
            body.len()
        );

        let event = UploadEvent::new(storage.bucket.clone(), keys::encode_key(&key), PUT_EVENT_NAME);
        anyhow::Ok(pipeline.relocator.process_record(&event).await)
    })?;

    print_record_outcome(&outcome);
    if outcome.is_failure() {
        anyhow::bail!("Relocation of {} did not complete", key);
    }

    Ok(())
}

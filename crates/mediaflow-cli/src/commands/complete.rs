//! Complete commands - store workflow output in the knowledge base.

use super::{runtime, Pipeline};
use anyhow::{Context, Result};
use colored::Colorize;

pub fn transcript(uri: &str) -> Result<()> {
    let pipeline = Pipeline::load()?;
    let rt = runtime()?;

    let receipt = rt
        .block_on(pipeline.completion.store_transcript(uri))
        .with_context(|| format!("Failed to store transcript {}", uri))?;

    println!("{} Stored transcript as record {}", "✓".green(), receipt.record_id.cyan());
    Ok(())
}

pub fn text(uri: &str) -> Result<()> {
    let pipeline = Pipeline::load()?;
    let rt = runtime()?;

    let receipt = rt
        .block_on(pipeline.completion.store_extracted_text(uri))
        .with_context(|| format!("Failed to store extracted text {}", uri))?;

    println!("{} Stored extracted text as record {}", "✓".green(), receipt.record_id.cyan());
    Ok(())
}

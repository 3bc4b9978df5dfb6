//! Configuration commands.

use super::get_paths;
use anyhow::{Context, Result};
use colored::Colorize;
use mediaflow_config::Config;

/// Show the configuration in effect after the environment overlay.
pub fn show() -> Result<()> {
    let paths = get_paths()?;
    let config = Config::load().context("Failed to load configuration")?;

    println!("{}", "Current Configuration".cyan().bold());
    println!("{}", "─".repeat(50));

    if paths.config_file.exists() {
        println!("File: {}", paths.config_file.display());
    } else {
        println!("File: {} {}", paths.config_file.display(), "(not found, using defaults)".dimmed());
    }
    println!();

    let kb = &config.knowledge_base;
    let rows = [
        ("queue.name", config.queue.name.clone()),
        ("storage.root", config.storage_root(&paths).display().to_string()),
        ("storage.bucket", config.storage.bucket.clone()),
        ("storage.incoming_prefix", config.storage.incoming_prefix.clone()),
        ("storage.processed_prefix", config.storage.processed_prefix.clone()),
        ("workflows.extract_text", config.workflows.extract_text.clone()),
        ("workflows.transcribe_media", config.workflows.transcribe_media.clone()),
        ("knowledge_base.id", kb.id.clone()),
        ("knowledge_base.bypass_tool_consent", kb.bypass_tool_consent.to_string()),
        ("knowledge_base.region", kb.region.clone()),
        (
            "knowledge_base.endpoint",
            kb.endpoint.clone().unwrap_or_else(|| "(local database)".to_string()),
        ),
        ("dispatch.batch_size", config.dispatch.batch_size.to_string()),
        ("dispatch.direct_store", config.dispatch.direct_store.to_string()),
        ("dispatch.preview_bytes", config.dispatch.preview_bytes.to_string()),
        (
            "dispatch.visibility_timeout_seconds",
            config.dispatch.visibility_timeout_seconds.to_string(),
        ),
    ];
    for (key, value) in rows {
        let value = if value.is_empty() {
            "(unset)".red().to_string()
        } else {
            value
        };
        println!("  {:<36} {}", key, value);
    }

    println!();
    match config.validate() {
        Ok(()) => println!("{} Configuration is complete.", "✓".green()),
        Err(e) => println!("{} {}", "✗".red(), e),
    }

    Ok(())
}

pub fn path() -> Result<()> {
    let paths = get_paths()?;
    println!("{}", paths.config_file.display());
    Ok(())
}

//! Initialize mediaflow.

use super::get_paths;
use anyhow::{Context, Result};
use colored::Colorize;
use mediaflow_config::Config;
use mediaflow_db::Database;

pub fn run() -> Result<()> {
    let paths = get_paths()?;

    if paths.is_initialized() {
        println!(
            "{} Mediaflow is already initialized.",
            "Note:".yellow().bold()
        );
        println!("  Config: {}", paths.config_file.display());
        println!("  Database: {}", paths.database_file.display());
        return Ok(());
    }

    println!("{}", "Initializing mediaflow...".cyan().bold());

    paths
        .ensure_dirs()
        .context("Failed to create directories")?;
    println!("  {} Created directories", "✓".green());

    if !paths.config_file.exists() {
        Config::create_default_file(&paths.config_file)
            .context("Failed to create config file")?;
    }
    println!(
        "  {} Config: {}",
        "✓".green(),
        paths.config_file.display()
    );

    let _db = Database::open(&paths.database_file).context("Failed to initialize database")?;
    println!(
        "  {} Created database: {}",
        "✓".green(),
        paths.database_file.display()
    );

    let config = Config::load().context("Failed to load configuration")?;
    let bucket_dir = config.storage_root(&paths).join(&config.storage.bucket);
    std::fs::create_dir_all(&bucket_dir).context("Failed to create bucket directory")?;
    println!(
        "  {} Object storage: {}",
        "✓".green(),
        bucket_dir.display()
    );

    println!();
    println!("{}", "Mediaflow initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Review config: {}", "mediaflow config show".cyan());
    println!("  2. Upload a file: {}", "mediaflow upload ~/notes.md".cyan());
    println!("  3. Route it: {}", "mediaflow dispatch".cyan());

    Ok(())
}

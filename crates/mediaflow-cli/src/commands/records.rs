//! Records command - list stored knowledge records.

use super::get_database;
use anyhow::Result;
use colored::Colorize;

const PREVIEW_CHARS: usize = 80;

pub fn run(limit: i64, source: Option<String>) -> Result<()> {
    let db = get_database()?;
    let records = db.list_records(source.as_deref(), limit)?;

    if records.is_empty() {
        println!("{}", "No records found.".dimmed());
        return Ok(());
    }

    println!("{}", "Knowledge Records".cyan().bold());
    println!("{}", "─".repeat(70));

    for record in records {
        let date = record.created_at.format("%Y-%m-%d %H:%M").to_string();
        let key = record
            .metadata
            .get("s3_key")
            .and_then(|v| v.as_str())
            .unwrap_or("-");

        println!(
            "{} {} {} {}",
            key.white().bold(),
            format!("[{}]", record.id.chars().take(8).collect::<String>()).dimmed(),
            record.source().unwrap_or("unknown").cyan(),
            date.dimmed()
        );

        let preview: String = record
            .content
            .chars()
            .take(PREVIEW_CHARS)
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();
        println!("    {}", preview.dimmed());
    }

    Ok(())
}

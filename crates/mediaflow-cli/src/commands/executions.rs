//! Executions command - list workflow starts.

use super::get_database;
use anyhow::Result;
use colored::Colorize;

pub fn run(limit: i64, workflow: Option<String>) -> Result<()> {
    let db = get_database()?;
    let executions = db.list_executions(workflow.as_deref(), limit)?;

    if executions.is_empty() {
        println!("{}", "No workflow executions found.".dimmed());
        return Ok(());
    }

    println!("{}", "Workflow Executions".cyan().bold());
    println!("{}", "─".repeat(70));

    for execution in executions {
        println!(
            "{} {} {} {}",
            "▶".blue(),
            execution.workflow_id.white().bold(),
            format!("[{}]", execution.id.chars().take(8).collect::<String>()).dimmed(),
            execution.started_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
        );
        println!(
            "    s3://{}/{} ({})",
            execution.input.bucket_name, execution.input.object_key, execution.input.file_extension
        );
    }

    Ok(())
}

//! CLI command implementations.

pub mod complete;
pub mod config;
pub mod dispatch;
pub mod executions;
pub mod init;
pub mod records;
pub mod relocate;
pub mod status;
pub mod upload;
pub mod watch;

use anyhow::{Context, Result};
use colored::Colorize;
use mediaflow_config::{AppPaths, Config};
use mediaflow_core::KnowledgeStore;
use mediaflow_db::{Database, SqliteKnowledgeStore, SqliteQueue, SqliteWorkflowStarter};
use mediaflow_ingest::{
    ClassificationTable, CompletionHandler, FsObjectStore, KnowledgeBaseSaver,
    KnowledgeBaseSettings, QueueDispatcher, RecordOutcome, Relocator, RelocatorSettings,
    WorkflowTargets,
};
use mediaflow_kb::HttpKnowledgeBase;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Get the application paths.
pub fn get_paths() -> Result<AppPaths> {
    AppPaths::new().context("Failed to determine application directories")
}

/// Get a database connection, ensuring mediaflow is initialized.
pub fn get_database() -> Result<Database> {
    let paths = get_paths()?;

    if !paths.is_initialized() {
        anyhow::bail!("Mediaflow is not initialized. Run 'mediaflow init' first.");
    }

    Database::open(&paths.database_file).context("Failed to open database")
}

pub fn runtime() -> Result<Runtime> {
    Runtime::new().context("Failed to create async runtime")
}

/// Every service of the pipeline, wired from validated configuration.
pub struct Pipeline {
    pub config: Config,
    pub db: Database,
    pub storage: Arc<FsObjectStore>,
    pub relocator: Relocator,
    pub dispatcher: QueueDispatcher,
    pub completion: CompletionHandler,
}

impl Pipeline {
    /// Load configuration and open the database. Missing required
    /// configuration stops the command before any work is done.
    pub fn load() -> Result<Self> {
        let paths = get_paths()?;
        let config = Config::load_validated().context("Invalid configuration")?;
        let db = get_database()?;
        Self::build(config, &paths, db)
    }

    pub fn build(config: Config, paths: &AppPaths, db: Database) -> Result<Self> {
        let storage = Arc::new(FsObjectStore::new(config.storage_root(paths)));
        let queue = Arc::new(SqliteQueue::new(db.clone(), config.queue.name.clone()));
        let workflows = Arc::new(SqliteWorkflowStarter::new(db.clone()));

        let backend: Arc<dyn KnowledgeStore> = match config.knowledge_base.endpoint {
            Some(_) => Arc::new(
                HttpKnowledgeBase::from_config(&config.knowledge_base)
                    .context("Failed to create knowledge base client")?,
            ),
            None => Arc::new(SqliteKnowledgeStore::new(db.clone())),
        };
        let saver = KnowledgeBaseSaver::new(
            backend,
            KnowledgeBaseSettings::from_config(&config.knowledge_base),
        );

        let relocator = Relocator::new(
            storage.clone(),
            queue,
            RelocatorSettings::from_config(&config),
        );
        let dispatcher = QueueDispatcher::new(
            storage.clone(),
            workflows,
            saver.clone(),
            WorkflowTargets::from_config(&config),
        )
        .with_table(ClassificationTable::for_direct_store(config.dispatch.direct_store))
        .with_preview_bytes(config.dispatch.preview_bytes);
        let completion = CompletionHandler::new(storage.clone(), saver);

        Ok(Self {
            config,
            db,
            storage,
            relocator,
            dispatcher,
            completion,
        })
    }

    pub fn queue_name(&self) -> &str {
        &self.config.queue.name
    }
}

/// Print one relocation outcome.
pub fn print_record_outcome(outcome: &RecordOutcome) {
    match outcome {
        RecordOutcome::Relocated {
            object,
            message_id: Some(message_id),
        } => {
            println!(
                "  {} {} → {} {}",
                "✓".green(),
                object.original_key,
                object.new_key.cyan(),
                format!("[{}]", message_id.chars().take(8).collect::<String>()).dimmed()
            );
        }
        RecordOutcome::Relocated {
            object,
            message_id: None,
        } => {
            println!(
                "  {} {} → {} {}",
                "!".yellow(),
                object.original_key,
                object.new_key,
                "(copied, not queued)".yellow()
            );
        }
        RecordOutcome::Skipped(reason) => {
            println!("  {} {}", "-".dimmed(), reason.to_string().dimmed());
        }
        RecordOutcome::Failed(error) => {
            println!("  {} {}", "✗".red(), error);
        }
    }
}

/// Format a file size in human-readable form.
pub fn format_size(bytes: i64) -> String {
    const KB: i64 = 1024;
    const MB: i64 = KB * 1024;
    const GB: i64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

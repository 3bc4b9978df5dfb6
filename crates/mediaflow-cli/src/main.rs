//! Mediaflow CLI - Upload relocation and routing dispatch for a local media pipeline.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Mediaflow - Route uploads to text extraction, transcription, or the knowledge base
#[derive(Parser)]
#[command(name = "mediaflow")]
#[command(author = "Lalo Morales <lalomorales22@github.com>")]
#[command(version)]
#[command(about = "Route uploads to text extraction, transcription, or the knowledge base", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit log entries as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize mediaflow (create config, database, and object storage)
    Init,

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Put a local file into the incoming prefix and relocate it
    Upload {
        /// File to upload
        file: PathBuf,

        /// Object key (default: incoming prefix + file name)
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Relocate the objects listed in an upload notification file
    Relocate {
        /// Notification JSON in the `{"Records": [...]}` shape
        notification: PathBuf,
    },

    /// Consume routing messages from the queue
    Dispatch {
        /// Keep consuming until the queue is empty
        #[arg(short, long)]
        all: bool,

        /// Messages per batch (default: from config)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Reset failed messages to pending first
        #[arg(long)]
        retry_failed: bool,
    },

    /// Watch the incoming prefix and relocate new uploads
    Watch {
        /// Also relocate files already present in the incoming prefix
        #[arg(long)]
        scan: bool,
    },

    /// Show queue and pipeline status
    Status,

    /// List knowledge records
    Records {
        /// Maximum number of records to show
        #[arg(short, long, default_value = "10")]
        limit: i64,

        /// Only records with this metadata source
        #[arg(short, long)]
        source: Option<String>,
    },

    /// List started workflow executions
    Executions {
        /// Maximum number of executions to show
        #[arg(short, long, default_value = "10")]
        limit: i64,

        /// Only executions of this workflow
        #[arg(short, long)]
        workflow: Option<String>,
    },

    /// Store the output of a finished workflow
    #[command(subcommand)]
    Complete(CompleteCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration (file + environment)
    Show,

    /// Print the config file path
    Path,
}

#[derive(Subcommand)]
enum CompleteCommands {
    /// Store a transcription result document
    Transcript {
        /// s3:// or https:// URI of the transcript JSON
        uri: String,
    },

    /// Store a plain-text extraction output
    Text {
        /// s3:// or https:// URI of the text object
        uri: String,
    },
}

fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mediaflow=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mediaflow=info,warn"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let result = match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::show(),
            ConfigCommands::Path => commands::config::path(),
        },
        Commands::Upload { file, key } => commands::upload::run(&file, key),
        Commands::Relocate { notification } => commands::relocate::run(&notification),
        Commands::Dispatch {
            all,
            batch_size,
            retry_failed,
        } => commands::dispatch::run(all, batch_size, retry_failed),
        Commands::Watch { scan } => commands::watch::run(scan),
        Commands::Status => commands::status::run(),
        Commands::Records { limit, source } => commands::records::run(limit, source),
        Commands::Executions { limit, workflow } => commands::executions::run(limit, workflow),
        Commands::Complete(cmd) => match cmd {
            CompleteCommands::Transcript { uri } => commands::complete::transcript(&uri),
            CompleteCommands::Text { uri } => commands::complete::text(&uri),
        },
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

//! Error types for the ingestion pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur while relocating, dispatching, or storing objects.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Service(#[from] mediaflow_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Refusing to store empty content")]
    EmptyContent,

    #[error("Invalid object URI: {0}")]
    InvalidUri(String),

    #[error("Transcript document is missing {0}")]
    MalformedTranscript(&'static str),

    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Watch error: {0}")]
    WatchError(String),
}

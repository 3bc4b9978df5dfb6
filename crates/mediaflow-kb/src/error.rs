//! Error types for knowledge-base calls.

use thiserror::Error;

/// Errors that can occur when talking to the knowledge base.
#[derive(Error, Debug)]
pub enum KbError {
    /// The endpoint refused the connection.
    #[error("Knowledge base is not reachable at {endpoint}")]
    Unreachable { endpoint: String },

    /// Request timeout.
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// API returned an error response.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The response did not carry a record identifier.
    #[error("Response is missing a record id")]
    MissingRecordId,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for knowledge-base operations.
pub type KbResult<T> = Result<T, KbError>;

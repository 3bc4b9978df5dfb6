//! Mediaflow Core - Domain types and service capabilities for the ingestion pipeline.

mod error;
pub mod keys;
mod ports;
mod types;

pub use error::{Error, Result};
pub use ports::{KnowledgeStore, MessageQueue, ObjectStore, WorkflowStarter};
pub use types::*;

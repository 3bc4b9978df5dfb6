//! Mediaflow DB - Local persistence for mediaflow using SQLite.
//!
//! Holds the routing-message queue, knowledge records, and the log of
//! started workflow executions, and exposes them through the pipeline's
//! capability traits.

mod adapters;
mod database;
mod error;
mod migrations;
mod operations;

pub use adapters::{SqliteKnowledgeStore, SqliteQueue, SqliteWorkflowStarter};
pub use database::Database;
pub use error::{DbError, DbResult};

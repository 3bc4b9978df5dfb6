//! Mediaflow KB - Client for a remote knowledge base reachable over HTTP.
//!
//! Every store call is POSTed as one JSON document carrying the content,
//! its metadata, and the knowledge-base configuration.

mod client;
mod error;
mod types;

pub use client::HttpKnowledgeBase;
pub use error::{KbError, KbResult};
pub use types::StoreResponse;

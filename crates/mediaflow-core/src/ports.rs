//! Capabilities of the external services the pipeline talks to.
//!
//! Each service is constructed once per process and injected into the
//! components that need it.

use crate::error::Result;
use crate::types::{ExecutionId, MessageId, StoreReceipt, StoreRequest, WorkflowInput};
use async_trait::async_trait;

/// Object storage with get/copy/put semantics.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read the full object body.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Write an object, replacing any existing one.
    async fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<()>;

    /// Server-side copy of an object within or across buckets.
    async fn copy(&self, bucket: &str, source_key: &str, dest_bucket: &str, dest_key: &str) -> Result<()>;
}

/// Producer side of an at-least-once message queue.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn send(&self, body: &str) -> Result<MessageId>;
}

/// One-way start of an external long-running workflow.
///
/// The returned id is informational; nothing waits on the execution.
#[async_trait]
pub trait WorkflowStarter: Send + Sync {
    async fn start(&self, workflow_id: &str, input: &WorkflowInput) -> Result<ExecutionId>;
}

/// Text + metadata persistence. Every call creates a new record.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn store(&self, request: &StoreRequest) -> Result<StoreReceipt>;
}

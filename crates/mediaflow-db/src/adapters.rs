//! Capability implementations backed by the local database.

use crate::database::Database;
use crate::error::DbError;
use async_trait::async_trait;
use mediaflow_core::{
    Error, ExecutionId, KnowledgeRecord, KnowledgeStore, MessageId, MessageQueue, QueueMessage,
    Result, StoreReceipt, StoreRequest, WorkflowExecution, WorkflowInput, WorkflowStarter,
};
use tracing::debug;

/// Producer handle for one named queue.
#[derive(Clone)]
pub struct SqliteQueue {
    db: Database,
    queue: String,
}

impl SqliteQueue {
    pub fn new(db: Database, queue: impl Into<String>) -> Self {
        Self {
            db,
            queue: queue.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.queue
    }
}

#[async_trait]
impl MessageQueue for SqliteQueue {
    async fn send(&self, body: &str) -> Result<MessageId> {
        let message = QueueMessage::new(&self.queue, body);
        self.db
            .enqueue(&message)
            .map_err(|e| Error::Queue(e.to_string()))?;
        debug!("Enqueued message {} on {}", message.id, self.queue);
        Ok(message.id)
    }
}

/// Knowledge store that keeps records in the `records` table.
#[derive(Clone)]
pub struct SqliteKnowledgeStore {
    db: Database,
}

impl SqliteKnowledgeStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl KnowledgeStore for SqliteKnowledgeStore {
    async fn store(&self, request: &StoreRequest) -> Result<StoreReceipt> {
        let record = KnowledgeRecord::from_request(request);
        self.db
            .insert_record(&record)
            .map_err(|e| Error::KnowledgeStore(e.to_string()))?;
        Ok(StoreReceipt {
            record_id: record.id,
            status: Some("stored".to_string()),
        })
    }
}

/// Workflow starter that only logs the start in the `executions` table.
#[derive(Clone)]
pub struct SqliteWorkflowStarter {
    db: Database,
}

impl SqliteWorkflowStarter {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WorkflowStarter for SqliteWorkflowStarter {
    async fn start(&self, workflow_id: &str, input: &WorkflowInput) -> Result<ExecutionId> {
        let execution = WorkflowExecution::new(workflow_id, input.clone());
        self.db.insert_execution(&execution).map_err(|e| match e {
            DbError::Serialization(err) => Error::from(err),
            other => Error::Workflow(other.to_string()),
        })?;
        Ok(execution.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediaflow_core::{Metadata, QueueStatus, StoreAction};

    #[tokio::test]
    async fn test_queue_send_enqueues_pending() {
        let db = Database::open_in_memory().unwrap();
        let queue = SqliteQueue::new(db.clone(), "routing");

        let id = queue.send(r#"{"bucket":"media"}"#).await.unwrap();

        let message = db.get_message(&id).unwrap();
        assert_eq!(message.queue, "routing");
        assert_eq!(message.status, QueueStatus::Pending);
    }

    #[tokio::test]
    async fn test_store_creates_new_record_each_call() {
        let db = Database::open_in_memory().unwrap();
        let store = SqliteKnowledgeStore::new(db.clone());
        let request = StoreRequest {
            action: StoreAction::Store,
            content: "same".to_string(),
            metadata: Metadata::new(),
            knowledge_base_id: "kb".to_string(),
            bypass_tool_consent: true,
            region_name: "us-east-1".to_string(),
        };

        let first = store.store(&request).await.unwrap();
        let second = store.store(&request).await.unwrap();

        assert_ne!(first.record_id, second.record_id);
        assert_eq!(db.count_records().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_workflow_start_is_logged() {
        let db = Database::open_in_memory().unwrap();
        let starter = SqliteWorkflowStarter::new(db.clone());
        let input = WorkflowInput {
            bucket_name: "media".to_string(),
            object_key: "processed/x.mp4".to_string(),
            filename: "x.mp4".to_string(),
            file_extension: ".mp4".to_string(),
        };

        let execution_id = starter.start("transcribe", &input).await.unwrap();

        let executions = db.list_executions(Some("transcribe"), 10).unwrap();
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].id, execution_id);
        assert_eq!(executions[0].input, input);
    }
}

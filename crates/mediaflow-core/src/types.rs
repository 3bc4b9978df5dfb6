//! Core domain types for mediaflow.

use crate::error::{Error, Result};
use crate::keys;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form metadata attached to knowledge records.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Unique identifier for queue messages.
pub type MessageId = String;

/// Unique identifier for knowledge records.
pub type RecordId = String;

/// Unique identifier for workflow executions.
pub type ExecutionId = String;

/// Suffix carried by event names of objects created through a copy.
pub const COPY_EVENT_SUFFIX: &str = ":Copy";

/// Event name used for locally produced upload notifications.
pub const PUT_EVENT_NAME: &str = "ObjectCreated:Put";

/// A single object-created notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadEvent {
    pub bucket: String,
    /// Key exactly as delivered, still percent-encoded.
    pub key: String,
    pub event_name: String,
}

impl UploadEvent {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        event_name: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            event_name: event_name.into(),
        }
    }

    /// Whether the object arrived through a copy rather than an original upload.
    pub fn is_copy(&self) -> bool {
        self.event_name.ends_with(COPY_EVENT_SUFFIX)
    }
}

/// Storage notification batch in the `{"Records": [...]}` wire shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadNotification {
    #[serde(rename = "Records", default)]
    pub records: Vec<NotificationRecord>,
}

impl UploadNotification {
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Build a notification carrying the given events.
    pub fn from_events(events: &[UploadEvent]) -> Self {
        let records = events
            .iter()
            .map(|e| NotificationRecord {
                event_name: Some(e.event_name.clone()),
                s3: Some(S3Entity {
                    bucket: Some(BucketEntity {
                        name: e.bucket.clone(),
                    }),
                    object: Some(ObjectEntity { key: e.key.clone() }),
                }),
            })
            .collect();
        Self { records }
    }
}

/// One record of an [`UploadNotification`]. Fields are optional on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationRecord {
    #[serde(rename = "eventName", default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub s3: Option<S3Entity>,
}

impl NotificationRecord {
    /// Convert to an [`UploadEvent`], or `None` if a required field is absent.
    pub fn to_event(&self) -> Option<UploadEvent> {
        let s3 = self.s3.as_ref()?;
        let bucket = s3.bucket.as_ref()?.name.clone();
        let key = s3.object.as_ref()?.key.clone();
        let event_name = self.event_name.clone()?;
        if bucket.is_empty() || key.is_empty() {
            return None;
        }
        Some(UploadEvent {
            bucket,
            key,
            event_name,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3Entity {
    #[serde(default)]
    pub bucket: Option<BucketEntity>,
    #[serde(default)]
    pub object: Option<ObjectEntity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectEntity {
    pub key: String,
}

/// An uploaded object after it was copied under the processed prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocatedObject {
    pub document_id: String,
    pub bucket: String,
    pub original_key: String,
    pub new_key: String,
    /// Extension of the source key, case preserved.
    pub extension: String,
    pub original_s3_uri: String,
    pub s3_uri: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl RelocatedObject {
    pub fn new(bucket: impl Into<String>, original_key: impl Into<String>, new_key: impl Into<String>) -> Self {
        let bucket = bucket.into();
        let original_key = original_key.into();
        let new_key = new_key.into();
        Self {
            document_id: keys::short_id(),
            extension: keys::split_extension(&original_key).to_string(),
            original_s3_uri: keys::s3_uri(&bucket, &original_key),
            s3_uri: keys::s3_uri(&bucket, &new_key),
            timestamp: Utc::now().timestamp_millis(),
            bucket,
            original_key,
            new_key,
        }
    }
}

/// Queue payload describing a relocated object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingMessage {
    #[serde(rename = "documentId")]
    pub document_id: String,
    pub original_key: String,
    pub key: String,
    /// Lower-cased, dot-prefixed extension of `key`.
    pub extension: String,
    pub bucket: String,
    pub s3_uri: String,
    pub original_s3_uri: String,
    pub timestamp: i64,
}

impl RoutingMessage {
    /// Derive the message from a relocated object. The extension is taken
    /// from the relocated key.
    pub fn from_relocated(object: &RelocatedObject) -> Self {
        Self {
            document_id: object.document_id.clone(),
            original_key: object.original_key.clone(),
            key: object.new_key.clone(),
            extension: keys::split_extension(&object.new_key).to_lowercase(),
            bucket: object.bucket.clone(),
            s3_uri: object.s3_uri.clone(),
            original_s3_uri: object.original_s3_uri.clone(),
            timestamp: object.timestamp,
        }
    }

    /// Parse a queue body, rejecting messages without a bucket or key.
    pub fn parse(body: &str) -> Result<Self> {
        let message: RoutingMessage = serde_json::from_str(body)?;
        if message.bucket.trim().is_empty() {
            return Err(Error::InvalidInput("routing message is missing `bucket`".to_string()));
        }
        if message.key.trim().is_empty() {
            return Err(Error::InvalidInput("routing message is missing `key`".to_string()));
        }
        Ok(message)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn filename(&self) -> &str {
        keys::file_name(&self.key)
    }
}

/// The two external long-running workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    ExtractText,
    TranscribeMedia,
}

impl WorkflowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::ExtractText => "extract_text",
            WorkflowKind::TranscribeMedia => "transcribe_media",
        }
    }
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input handed to either workflow when it is started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowInput {
    pub bucket_name: String,
    pub object_key: String,
    pub filename: String,
    pub file_extension: String,
}

impl WorkflowInput {
    pub fn from_message(message: &RoutingMessage, extension: &str) -> Self {
        Self {
            bucket_name: message.bucket.clone(),
            object_key: message.key.clone(),
            filename: message.filename().to_string(),
            file_extension: extension.to_string(),
        }
    }
}

/// Operation requested from the knowledge store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreAction {
    Store,
}

/// A complete knowledge-store call: content, metadata, and store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRequest {
    pub action: StoreAction,
    pub content: String,
    pub metadata: Metadata,
    pub knowledge_base_id: String,
    pub bypass_tool_consent: bool,
    pub region_name: String,
}

/// Descriptor returned by the store for a newly created record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreReceipt {
    pub record_id: RecordId,
    #[serde(default)]
    pub status: Option<String>,
}

/// A record persisted in the knowledge store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub id: RecordId,
    pub knowledge_base_id: String,
    pub content: String,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeRecord {
    pub fn from_request(request: &StoreRequest) -> Self {
        Self {
            id: keys::new_id(),
            knowledge_base_id: request.knowledge_base_id.clone(),
            content: request.content.clone(),
            metadata: request.metadata.clone(),
            created_at: Utc::now(),
        }
    }

    /// Metadata `source` value, if any.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(|v| v.as_str())
    }
}

/// Status of a queue message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    #[default]
    Pending,
    Processing,
    Done,
    Failed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Processing => "processing",
            QueueStatus::Done => "done",
            QueueStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(QueueStatus::Pending),
            "processing" => Some(QueueStatus::Processing),
            "done" => Some(QueueStatus::Done),
            "failed" => Some(QueueStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A message held by a queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMessage {
    pub id: MessageId,
    pub queue: String,
    pub body: String,
    pub status: QueueStatus,
    pub attempts: i32,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl QueueMessage {
    pub fn new(queue: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: keys::new_id(),
            queue: queue.into(),
            body: body.into(),
            status: QueueStatus::Pending,
            attempts: 0,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }
}

/// A started workflow execution, as recorded by a local starter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: ExecutionId,
    pub workflow_id: String,
    pub input: WorkflowInput,
    pub started_at: DateTime<Utc>,
}

impl WorkflowExecution {
    pub fn new(workflow_id: impl Into<String>, input: WorkflowInput) -> Self {
        Self {
            id: keys::new_id(),
            workflow_id: workflow_id.into(),
            input,
            started_at: Utc::now(),
        }
    }
}

/// Counts across the local pipeline tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineStats {
    pub queue_pending: i64,
    pub queue_processing: i64,
    pub queue_done: i64,
    pub queue_failed: i64,
    pub records_by_source: std::collections::HashMap<String, i64>,
    pub total_records: i64,
    pub executions_by_workflow: std::collections::HashMap<String, i64>,
    pub total_executions: i64,
    pub database_size_bytes: i64,
}

//! Routing-message consumer: classify by extension, then store or start a workflow.

use crate::classify::{Classification, ClassificationTable};
use crate::error::IngestResult;
use crate::knowledge::KnowledgeBaseSaver;
use mediaflow_config::Config;
use mediaflow_core::{
    keys, ExecutionId, Metadata, ObjectStore, RecordId, RoutingMessage, WorkflowInput,
    WorkflowKind, WorkflowStarter,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// `source` metadata value of directly stored objects.
pub const DIRECT_STORE_SOURCE: &str = "ingestion-pipeline";

const DEFAULT_PREVIEW_BYTES: usize = 4096;

/// Identifiers of the two workflows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowTargets {
    pub extract_text: String,
    pub transcribe_media: String,
}

impl WorkflowTargets {
    pub fn from_config(config: &Config) -> Self {
        Self {
            extract_text: config.workflows.extract_text.clone(),
            transcribe_media: config.workflows.transcribe_media.clone(),
        }
    }

    pub fn id_for(&self, kind: WorkflowKind) -> &str {
        match kind {
            WorkflowKind::ExtractText => &self.extract_text,
            WorkflowKind::TranscribeMedia => &self.transcribe_media,
        }
    }
}

/// What happened to one routing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Stored {
        record_id: RecordId,
    },
    WorkflowStarted {
        workflow: WorkflowKind,
        execution_id: ExecutionId,
    },
    Unsupported {
        extension: String,
    },
    /// The body could not be parsed or lacked `bucket`/`key`.
    Skipped(String),
    Failed(String),
}

impl DispatchOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, DispatchOutcome::Failed(_))
    }

    /// Error text for a failed outcome.
    pub fn error(&self) -> Option<&str> {
        match self {
            DispatchOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Outcomes of one batch, in message order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<DispatchOutcome>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn stored(&self) -> usize {
        self.count(|o| matches!(o, DispatchOutcome::Stored { .. }))
    }

    pub fn workflows_started(&self) -> usize {
        self.count(|o| matches!(o, DispatchOutcome::WorkflowStarted { .. }))
    }

    pub fn unsupported(&self) -> usize {
        self.count(|o| matches!(o, DispatchOutcome::Unsupported { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DispatchOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(DispatchOutcome::is_failure)
    }

    fn count(&self, pred: impl Fn(&DispatchOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}

/// Consumes routing messages one at a time. Each message is handled
/// independently; nothing is retried here.
#[derive(Clone)]
pub struct QueueDispatcher {
    storage: Arc<dyn ObjectStore>,
    workflows: Arc<dyn WorkflowStarter>,
    saver: KnowledgeBaseSaver,
    targets: WorkflowTargets,
    table: ClassificationTable,
    preview_bytes: usize,
}

impl QueueDispatcher {
    pub fn new(
        storage: Arc<dyn ObjectStore>,
        workflows: Arc<dyn WorkflowStarter>,
        saver: KnowledgeBaseSaver,
        targets: WorkflowTargets,
    ) -> Self {
        Self {
            storage,
            workflows,
            saver,
            targets,
            table: ClassificationTable::standard(),
            preview_bytes: DEFAULT_PREVIEW_BYTES,
        }
    }

    pub fn with_table(mut self, table: ClassificationTable) -> Self {
        self.table = table;
        self
    }

    pub fn with_preview_bytes(mut self, preview_bytes: usize) -> Self {
        self.preview_bytes = preview_bytes;
        self
    }

    pub fn classify(&self, extension: &str) -> Classification {
        self.table.classify(extension)
    }

    /// Dispatch every body in order and report each outcome.
    pub async fn dispatch<I, S>(&self, bodies: I) -> BatchReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = BatchReport::default();
        for body in bodies {
            report.outcomes.push(self.dispatch_body(body.as_ref()).await);
        }
        info!(
            "Dispatched {} messages: {} stored, {} workflows, {} unsupported, {} skipped, {} failed",
            report.len(),
            report.stored(),
            report.workflows_started(),
            report.unsupported(),
            report.skipped(),
            report.failed()
        );
        report
    }

    /// Parse and dispatch one queue body.
    pub async fn dispatch_body(&self, body: &str) -> DispatchOutcome {
        match RoutingMessage::parse(body) {
            Ok(message) => self.dispatch_message(&message).await,
            Err(e) => {
                warn!("Skipping unroutable message: {}", e);
                DispatchOutcome::Skipped(e.to_string())
            }
        }
    }

    /// Dispatch one parsed routing message.
    pub async fn dispatch_message(&self, message: &RoutingMessage) -> DispatchOutcome {
        let extension = effective_extension(message);
        let classification = self.table.classify(&extension);
        debug!("{} classified as {} ({})", message.key, classification, extension);

        match classification {
            Classification::DirectStore => match self.store_directly(message, &extension).await {
                Ok(record_id) => {
                    info!("Stored {} directly as record {}", object_uri(message), record_id);
                    DispatchOutcome::Stored { record_id }
                }
                Err(e) => {
                    warn!("Direct store of {} failed: {}", object_uri(message), e);
                    DispatchOutcome::Failed(e.to_string())
                }
            },
            Classification::ExtractTextWorkflow => {
                self.start_workflow(message, WorkflowKind::ExtractText, &extension).await
            }
            Classification::TranscribeMediaWorkflow => {
                self.start_workflow(message, WorkflowKind::TranscribeMedia, &extension).await
            }
            Classification::Unsupported => {
                warn!("Unsupported file type {:?} for {}", extension, message.key);
                DispatchOutcome::Unsupported { extension }
            }
        }
    }

    async fn store_directly(&self, message: &RoutingMessage, extension: &str) -> IngestResult<RecordId> {
        let body = self.storage.get(&message.bucket, &message.key).await?;
        let text = String::from_utf8_lossy(&body);
        debug!(
            "Direct store content of {} ({} bytes): {}",
            message.key,
            text.len(),
            preview(&text, self.preview_bytes)
        );

        let receipt = self
            .saver
            .store_text(&text, Some(direct_store_metadata(message, extension)))
            .await?;
        Ok(receipt.record_id)
    }

    async fn start_workflow(
        &self,
        message: &RoutingMessage,
        workflow: WorkflowKind,
        extension: &str,
    ) -> DispatchOutcome {
        let input = WorkflowInput::from_message(message, extension);
        let workflow_id = self.targets.id_for(workflow);

        match self.workflows.start(workflow_id, &input).await {
            Ok(execution_id) => {
                info!(
                    "Started {} workflow for {} (execution {})",
                    workflow, input.object_key, execution_id
                );
                DispatchOutcome::WorkflowStarted {
                    workflow,
                    execution_id,
                }
            }
            Err(e) => {
                warn!("Failed to start {} workflow for {}: {}", workflow, input.object_key, e);
                DispatchOutcome::Failed(e.to_string())
            }
        }
    }
}

/// The message's extension, falling back to the key when it is absent.
fn effective_extension(message: &RoutingMessage) -> String {
    let extension = if message.extension.trim().is_empty() {
        keys::split_extension(&message.key)
    } else {
        message.extension.as_str()
    };
    keys::normalize_extension(extension)
}

fn direct_store_metadata(message: &RoutingMessage, extension: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("source".to_string(), json!(DIRECT_STORE_SOURCE));
    metadata.insert("s3_key".to_string(), json!(message.key));
    metadata.insert("bucket".to_string(), json!(message.bucket));
    if !message.document_id.is_empty() {
        metadata.insert("document_id".to_string(), json!(message.document_id));
    }
    metadata.insert("extension".to_string(), json!(extension));
    metadata
}

/// Longest prefix of `text` no longer than `max_bytes`, cut on a char boundary.
fn preview(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn object_uri(message: &RoutingMessage) -> String {
    if message.s3_uri.is_empty() {
        keys::s3_uri(&message.bucket, &message.key)
    } else {
        message.s3_uri.clone()
    }
}

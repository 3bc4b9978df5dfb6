//! Moves new uploads under the processed prefix and announces them.

use crate::error::IngestResult;
use mediaflow_config::Config;
use mediaflow_core::{
    keys, MessageId, MessageQueue, ObjectStore, RelocatedObject, RoutingMessage, UploadEvent,
    UploadNotification,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Relocation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocatorSettings {
    /// Only events from this bucket are relocated.
    pub source_bucket: String,
    /// Destination prefix. Keys already below it are never relocated again.
    pub processed_prefix: String,
}

impl RelocatorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            source_bucket: config.storage.bucket.clone(),
            processed_prefix: config.storage.processed_prefix.clone(),
        }
    }
}

/// Why an event was not relocated. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The object was created by a copy, most likely one of ours.
    CopyEvent,
    ForeignBucket(String),
    AlreadyProcessed(String),
    EmptyKey,
    /// A notification record without bucket, key, or event name.
    IncompleteRecord,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::CopyEvent => write!(f, "copy event"),
            SkipReason::ForeignBucket(bucket) => write!(f, "event from foreign bucket {}", bucket),
            SkipReason::AlreadyProcessed(key) => write!(f, "{} is already processed", key),
            SkipReason::EmptyKey => write!(f, "empty object key"),
            SkipReason::IncompleteRecord => write!(f, "incomplete notification record"),
        }
    }
}

/// Decision for a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relocation {
    Relocated(RelocatedObject),
    Skipped(SkipReason),
}

/// Result of fully handling one notification record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The object was copied. `message_id` is `None` when the enqueue
    /// failed after the copy, leaving an orphaned processed object.
    Relocated {
        object: RelocatedObject,
        message_id: Option<MessageId>,
    },
    Skipped(SkipReason),
    Failed(String),
}

impl RecordOutcome {
    pub fn is_orphaned(&self) -> bool {
        matches!(self, RecordOutcome::Relocated { message_id: None, .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RecordOutcome::Failed(_)) || self.is_orphaned()
    }
}

/// Copies each accepted upload to `<processed_prefix><id><ext>` and sends a
/// routing message for it. Copy, then enqueue; there is no compensation if
/// the enqueue fails.
#[derive(Clone)]
pub struct Relocator {
    storage: Arc<dyn ObjectStore>,
    queue: Arc<dyn MessageQueue>,
    settings: RelocatorSettings,
}

impl Relocator {
    pub fn new(
        storage: Arc<dyn ObjectStore>,
        queue: Arc<dyn MessageQueue>,
        settings: RelocatorSettings,
    ) -> Self {
        Self {
            storage,
            queue,
            settings,
        }
    }

    pub fn settings(&self) -> &RelocatorSettings {
        &self.settings
    }

    /// Decide what to do with an event without touching any service.
    pub fn plan(&self, event: &UploadEvent) -> Relocation {
        if event.is_copy() {
            return Relocation::Skipped(SkipReason::CopyEvent);
        }

        let key = keys::decode_key(&event.key);

        if event.bucket != self.settings.source_bucket {
            return Relocation::Skipped(SkipReason::ForeignBucket(event.bucket.clone()));
        }
        if key.trim().is_empty() {
            return Relocation::Skipped(SkipReason::EmptyKey);
        }
        if key.starts_with(&self.settings.processed_prefix) {
            return Relocation::Skipped(SkipReason::AlreadyProcessed(key));
        }

        let new_key = format!(
            "{}{}{}",
            self.settings.processed_prefix,
            keys::short_id(),
            keys::split_extension(&key)
        );
        Relocation::Relocated(RelocatedObject::new(event.bucket.clone(), key, new_key))
    }

    /// Plan the event and perform the copy for accepted ones.
    pub async fn relocate(&self, event: &UploadEvent) -> IngestResult<Relocation> {
        let relocation = self.plan(event);
        if let Relocation::Relocated(object) = &relocation {
            self.storage
                .copy(&object.bucket, &object.original_key, &object.bucket, &object.new_key)
                .await?;
            info!("Copied {} to {}", object.original_s3_uri, object.s3_uri);
        }
        Ok(relocation)
    }

    /// Relocate one event and enqueue its routing message. Never fails.
    pub async fn process_record(&self, event: &UploadEvent) -> RecordOutcome {
        let object = match self.relocate(event).await {
            Ok(Relocation::Relocated(object)) => object,
            Ok(Relocation::Skipped(reason)) => {
                info!("Skipping {}/{}: {}", event.bucket, event.key, reason);
                return RecordOutcome::Skipped(reason);
            }
            Err(e) => {
                warn!("Failed to relocate {}/{}: {}", event.bucket, event.key, e);
                return RecordOutcome::Failed(e.to_string());
            }
        };

        let message = RoutingMessage::from_relocated(&object);
        let sent = match message.to_json() {
            Ok(body) => self.queue.send(&body).await,
            Err(e) => Err(e),
        };

        match sent {
            Ok(message_id) => {
                info!(
                    "Queued {} ({}) as message {}",
                    object.new_key, object.document_id, message_id
                );
                RecordOutcome::Relocated {
                    object,
                    message_id: Some(message_id),
                }
            }
            Err(e) => {
                warn!(
                    "Copied {} but could not queue its routing message: {}",
                    object.s3_uri, e
                );
                RecordOutcome::Relocated {
                    object,
                    message_id: None,
                }
            }
        }
    }

    /// Process events in order. One failing event never stops the rest.
    pub async fn handle_batch(&self, events: &[UploadEvent]) -> Vec<RecordOutcome> {
        let mut outcomes = Vec::with_capacity(events.len());
        for event in events {
            outcomes.push(self.process_record(event).await);
        }
        debug!("Handled {} upload events", outcomes.len());
        outcomes
    }

    /// Process every record of a storage notification.
    pub async fn handle_notification(&self, notification: &UploadNotification) -> Vec<RecordOutcome> {
        let mut outcomes = Vec::with_capacity(notification.records.len());
        for record in &notification.records {
            match record.to_event() {
                Some(event) => outcomes.push(self.process_record(&event).await),
                None => {
                    warn!("Skipping notification record without bucket, key, or event name");
                    outcomes.push(RecordOutcome::Skipped(SkipReason::IncompleteRecord));
                }
            }
        }
        outcomes
    }
}

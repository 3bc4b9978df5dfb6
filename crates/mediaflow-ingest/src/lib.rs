//! Mediaflow Ingest - Upload relocation and routing dispatch.
//!
//! This crate provides:
//! - The relocator that moves new uploads under the processed prefix and
//!   announces them on the routing queue
//! - The dispatcher that classifies routed objects by extension and either
//!   stores their text directly or starts a workflow
//! - The knowledge-base saver and workflow completion handler
//! - A filesystem object store and upload watcher for running locally

mod classify;
mod completion;
mod dispatcher;
mod error;
mod knowledge;
mod relocator;
mod storage;
mod watcher;

#[cfg(test)]
mod testing;
#[cfg(test)]
mod tests;

pub use classify::{
    Classification, ClassificationTable, DIRECT_STORE_EXTENSIONS, EXTRACT_TEXT_EXTENSIONS,
    TRANSCRIBE_MEDIA_EXTENSIONS,
};
pub use completion::{parse_object_uri, CompletionHandler, EXTRACTION_SOURCE, TRANSCRIPT_SOURCE};
pub use dispatcher::{
    BatchReport, DispatchOutcome, QueueDispatcher, WorkflowTargets, DIRECT_STORE_SOURCE,
};
pub use error::{IngestError, IngestResult};
pub use knowledge::{KnowledgeBaseSaver, KnowledgeBaseSettings};
pub use relocator::{RecordOutcome, Relocation, Relocator, RelocatorSettings, SkipReason};
pub use storage::FsObjectStore;
pub use watcher::{scan_incoming, UploadWatcher, WatcherConfig};

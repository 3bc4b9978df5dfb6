//! Pipeline scenarios: relocation through dispatch, against in-memory services.

use crate::dispatcher::{DispatchOutcome, QueueDispatcher, WorkflowTargets};
use crate::knowledge::{KnowledgeBaseSaver, KnowledgeBaseSettings};
use crate::relocator::{RecordOutcome, Relocator, RelocatorSettings, SkipReason};
use crate::testing::{FakeKnowledgeStore, FakeObjectStore, FakeQueue, FakeWorkflowStarter};
use mediaflow_core::{RoutingMessage, UploadEvent, UploadNotification, WorkflowKind};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

const BUCKET: &str = "media";

struct Pipeline {
    relocator: Relocator,
    dispatcher: QueueDispatcher,
    storage: Arc<FakeObjectStore>,
    queue: Arc<FakeQueue>,
    workflows: Arc<FakeWorkflowStarter>,
    store: Arc<FakeKnowledgeStore>,
}

impl Pipeline {
    fn new() -> Self {
        let storage = Arc::new(FakeObjectStore::default());
        let queue = Arc::new(FakeQueue::default());
        let workflows = Arc::new(FakeWorkflowStarter::default());
        let store = Arc::new(FakeKnowledgeStore::default());

        let relocator = Relocator::new(
            storage.clone(),
            queue.clone(),
            RelocatorSettings {
                source_bucket: BUCKET.to_string(),
                processed_prefix: "processed/".to_string(),
            },
        );
        let saver = KnowledgeBaseSaver::new(
            store.clone(),
            KnowledgeBaseSettings {
                knowledge_base_id: "kb-main".to_string(),
                bypass_tool_consent: true,
                region: "us-east-1".to_string(),
            },
        );
        let dispatcher = QueueDispatcher::new(
            storage.clone(),
            workflows.clone(),
            saver,
            WorkflowTargets {
                extract_text: "extract-text".to_string(),
                transcribe_media: "transcribe-media".to_string(),
            },
        );

        Self {
            relocator,
            dispatcher,
            storage,
            queue,
            workflows,
            store,
        }
    }

    fn upload(&self, key: &str, body: &str) -> UploadEvent {
        self.storage.insert(BUCKET, key, body);
        UploadEvent::new(BUCKET, key, "ObjectCreated:Put")
    }

    /// Routing message for a processed key, bypassing the relocator.
    fn routed(&self, key: &str, body: &str) -> String {
        self.storage.insert(BUCKET, key, body);
        json!({
            "documentId": "doc",
            "original_key": "uploads/source",
            "key": key,
            "extension": mediaflow_core::keys::split_extension(key).to_lowercase(),
            "bucket": BUCKET,
            "s3_uri": format!("s3://{}/{}", BUCKET, key),
            "original_s3_uri": "s3://media/uploads/source",
            "timestamp": 0,
        })
        .to_string()
    }
}

#[tokio::test]
async fn test_copy_events_are_no_ops() {
    let p = Pipeline::new();
    p.storage.insert(BUCKET, "uploads/a.pdf", "x");

    for name in ["ObjectCreated:Copy", "s3:ObjectCreated:Copy"] {
        let outcome = p
            .relocator
            .process_record(&UploadEvent::new(BUCKET, "uploads/a.pdf", name))
            .await;
        assert_eq!(outcome, RecordOutcome::Skipped(SkipReason::CopyEvent));
    }

    assert!(p.storage.copies().is_empty());
    assert!(p.queue.sent().is_empty());
}

#[tokio::test]
async fn test_processed_keys_are_not_relocated() {
    let p = Pipeline::new();
    for key in ["processed/abc.pdf", "processed/nested/x.mp4", "processed/"] {
        let event = p.upload(key, "x");
        let outcome = p.relocator.process_record(&event).await;
        assert!(matches!(outcome, RecordOutcome::Skipped(SkipReason::AlreadyProcessed(_))));
    }
    assert!(p.storage.copies().is_empty());
    assert!(p.queue.sent().is_empty());
}

#[tokio::test]
async fn test_new_keys_are_unique_for_identical_input() {
    let p = Pipeline::new();
    let event = p.upload("uploads/same.pdf", "x");

    let mut new_keys = HashSet::new();
    for _ in 0..50 {
        match p.relocator.process_record(&event).await {
            RecordOutcome::Relocated { object, .. } => {
                assert!(new_keys.insert(object.new_key));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    assert_eq!(p.storage.copies().len(), 50);
    assert_eq!(p.queue.sent().len(), 50);
}

#[tokio::test]
async fn test_text_extensions_store_once_without_workflow() {
    let p = Pipeline::new();
    let bodies = vec![
        p.routed("processed/a.md", "# notes"),
        p.routed("processed/b.csv", "a,b\n1,2"),
        p.routed("processed/c.MD", "# upper"),
    ];

    let report = p.dispatcher.dispatch(&bodies).await;

    assert_eq!(report.stored(), 3);
    assert_eq!(p.store.requests().len(), 3);
    assert!(p.workflows.starts().is_empty());
}

#[tokio::test]
async fn test_document_extensions_start_extraction() {
    let p = Pipeline::new();
    for ext in [".pdf", ".jpg", ".docx", ".txt"] {
        let key = format!("processed/doc{}", ext);
        let body = p.routed(&key, "x");
        let outcome = p.dispatcher.dispatch_body(&body).await;
        assert!(
            matches!(outcome, DispatchOutcome::WorkflowStarted { workflow: WorkflowKind::ExtractText, .. }),
            "{}",
            ext
        );
    }

    let starts = p.workflows.starts();
    assert_eq!(starts.len(), 4);
    for (workflow_id, input) in &starts {
        assert_eq!(workflow_id, "extract-text");
        assert_eq!(input.bucket_name, BUCKET);
        assert!(input.object_key.starts_with("processed/doc."));
    }
    assert!(p.store.requests().is_empty());
}

#[tokio::test]
async fn test_media_extensions_start_transcription() {
    let p = Pipeline::new();
    let bodies = vec![p.routed("processed/a.mp4", "x"), p.routed("processed/b.mkv", "x")];

    let report = p.dispatcher.dispatch(&bodies).await;

    assert_eq!(report.workflows_started(), 2);
    let starts = p.workflows.starts();
    assert!(starts.iter().all(|(id, _)| id == "transcribe-media"));
    assert!(p.store.requests().is_empty());
}

#[tokio::test]
async fn test_unknown_extension_has_no_side_effects() {
    let p = Pipeline::new();
    let body = p.routed("processed/archive.zip", "PK");

    let outcome = p.dispatcher.dispatch_body(&body).await;

    assert_eq!(
        outcome,
        DispatchOutcome::Unsupported {
            extension: ".zip".to_string()
        }
    );
    assert!(p.store.requests().is_empty());
    assert!(p.workflows.starts().is_empty());
}

#[tokio::test]
async fn test_failing_message_does_not_stop_batch() {
    let p = Pipeline::new();
    p.workflows.fail_when_key_contains("second");
    p.store.fail_when_content_contains("poison");
    let bodies = vec![
        p.routed("processed/first.pdf", "x"),
        p.routed("processed/second.pdf", "x"),
        p.routed("processed/third.md", "# third"),
    ];

    let report = p.dispatcher.dispatch(&bodies).await;

    assert_eq!(report.len(), 3);
    assert!(matches!(report.outcomes[0], DispatchOutcome::WorkflowStarted { .. }));
    assert!(report.outcomes[1].is_failure());
    assert!(matches!(report.outcomes[2], DispatchOutcome::Stored { .. }));

    // Same isolation when the store call is the one that fails.
    let bodies = vec![
        p.routed("processed/one.csv", "a,b"),
        p.routed("processed/two.csv", "poison"),
        p.routed("processed/three.mp4", "x"),
    ];
    let report = p.dispatcher.dispatch(&bodies).await;
    assert_eq!(report.stored(), 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.workflows_started(), 1);
    assert!(report.outcomes[1].is_failure());
}

#[tokio::test]
async fn test_failing_record_does_not_stop_notification() {
    let p = Pipeline::new();
    let events = vec![
        p.upload("uploads/one.pdf", "x"),
        p.upload("uploads/two.pdf", "x"),
        p.upload("uploads/three.pdf", "x"),
    ];
    p.storage.fail_copy_when_key_contains("two");

    let outcomes = p.relocator.handle_batch(&events).await;

    assert!(matches!(outcomes[0], RecordOutcome::Relocated { .. }));
    assert!(matches!(outcomes[1], RecordOutcome::Failed(_)));
    assert!(matches!(outcomes[2], RecordOutcome::Relocated { .. }));
    assert_eq!(p.queue.sent().len(), 2);
}

#[tokio::test]
async fn test_scenario_csv_is_stored_directly() {
    let p = Pipeline::new();
    let event = p.upload("reports/q1.csv", "region,total\neu,10\n");

    let outcomes = p
        .relocator
        .handle_notification(&UploadNotification::from_events(&[event]))
        .await;
    let RecordOutcome::Relocated { object, .. } = &outcomes[0] else {
        panic!("expected relocation, got {:?}", outcomes[0]);
    };
    assert!(object.new_key.starts_with("processed/"));
    assert!(object.new_key.ends_with(".csv"));

    let sent = p.queue.sent();
    let message = RoutingMessage::parse(&sent[0]).unwrap();
    assert_eq!(message.extension, ".csv");
    assert_eq!(message.original_key, "reports/q1.csv");

    let report = p.dispatcher.dispatch(&sent).await;

    assert_eq!(report.stored(), 1);
    assert!(p.workflows.starts().is_empty());
    let requests = p.store.requests();
    assert_eq!(requests[0].content, "region,total\neu,10\n");
    assert_eq!(requests[0].metadata["s3_key"], json!(object.new_key));
    assert_eq!(requests[0].metadata["source"], json!("ingestion-pipeline"));
}

#[tokio::test]
async fn test_scenario_mp4_starts_transcription() {
    let p = Pipeline::new();
    let event = p.upload("media/clip.mp4", "\0\0\0 ftyp");

    let outcomes = p.relocator.handle_batch(&[event]).await;
    let RecordOutcome::Relocated { object, .. } = &outcomes[0] else {
        panic!("expected relocation, got {:?}", outcomes[0]);
    };

    let report = p.dispatcher.dispatch(p.queue.sent()).await;

    assert_eq!(report.workflows_started(), 1);
    let starts = p.workflows.starts();
    assert_eq!(starts[0].0, "transcribe-media");
    assert_eq!(
        serde_json::to_value(&starts[0].1).unwrap(),
        json!({
            "bucket_name": BUCKET,
            "object_key": object.new_key,
            "filename": mediaflow_core::keys::file_name(&object.new_key),
            "file_extension": ".mp4",
        })
    );
    assert!(p.store.requests().is_empty());
}

#[tokio::test]
async fn test_scenario_repeat_notification_for_processed_key() {
    let p = Pipeline::new();
    let event = p.upload("reports/q1.csv", "a,b");
    let outcomes = p.relocator.handle_batch(&[event]).await;
    let RecordOutcome::Relocated { object, .. } = &outcomes[0] else {
        panic!("expected relocation");
    };

    // The copy itself produces a notification for the processed key, and
    // duplicates of it may arrive as plain puts.
    let repeats = vec![
        UploadEvent::new(BUCKET, object.new_key.clone(), "ObjectCreated:Copy"),
        UploadEvent::new(BUCKET, object.new_key.clone(), "ObjectCreated:Put"),
    ];
    let outcomes = p.relocator.handle_batch(&repeats).await;

    assert!(outcomes.iter().all(|o| matches!(o, RecordOutcome::Skipped(_))));
    assert_eq!(p.storage.copies().len(), 1);
    assert_eq!(p.queue.sent().len(), 1);
}

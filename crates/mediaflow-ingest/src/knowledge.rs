//! Single construction path for knowledge-base writes.

use crate::error::{IngestError, IngestResult};
use mediaflow_config::KnowledgeBaseConfig;
use mediaflow_core::{KnowledgeStore, Metadata, StoreAction, StoreReceipt, StoreRequest};
use std::sync::Arc;
use tracing::debug;

/// Store configuration fixed when the saver is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeBaseSettings {
    pub knowledge_base_id: String,
    pub bypass_tool_consent: bool,
    pub region: String,
}

impl KnowledgeBaseSettings {
    pub fn from_config(config: &KnowledgeBaseConfig) -> Self {
        Self {
            knowledge_base_id: config.id.clone(),
            bypass_tool_consent: config.bypass_tool_consent,
            region: config.region.clone(),
        }
    }
}

/// Writes text into the knowledge base. Callers supply only content and
/// metadata. Every call creates a new record.
#[derive(Clone)]
pub struct KnowledgeBaseSaver {
    backend: Arc<dyn KnowledgeStore>,
    settings: KnowledgeBaseSettings,
}

impl KnowledgeBaseSaver {
    pub fn new(backend: Arc<dyn KnowledgeStore>, settings: KnowledgeBaseSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &KnowledgeBaseSettings {
        &self.settings
    }

    /// Build the store call for `text`. Metadata is always present.
    pub fn build_request(&self, text: &str, metadata: Option<Metadata>) -> IngestResult<StoreRequest> {
        if text.trim().is_empty() {
            return Err(IngestError::EmptyContent);
        }

        Ok(StoreRequest {
            action: StoreAction::Store,
            content: text.to_string(),
            metadata: metadata.unwrap_or_default(),
            knowledge_base_id: self.settings.knowledge_base_id.clone(),
            bypass_tool_consent: self.settings.bypass_tool_consent,
            region_name: self.settings.region.clone(),
        })
    }

    /// Store `text` and return the store-assigned record descriptor.
    pub async fn store_text(&self, text: &str, metadata: Option<Metadata>) -> IngestResult<StoreReceipt> {
        let request = self.build_request(text, metadata)?;
        let receipt = self.backend.store(&request).await?;
        debug!(
            "Stored {} bytes as record {} in {}",
            request.content.len(),
            receipt.record_id,
            request.knowledge_base_id
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeKnowledgeStore;
    use serde_json::json;

    fn settings() -> KnowledgeBaseSettings {
        KnowledgeBaseSettings {
            knowledge_base_id: "kb-42".to_string(),
            bypass_tool_consent: true,
            region: "eu-west-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_store_text_applies_settings() {
        let store = Arc::new(FakeKnowledgeStore::default());
        let saver = KnowledgeBaseSaver::new(store.clone(), settings());

        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), json!("unit"));
        let receipt = saver.store_text("hello", Some(metadata)).await.unwrap();

        let calls = store.requests();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].content, "hello");
        assert_eq!(calls[0].knowledge_base_id, "kb-42");
        assert_eq!(calls[0].region_name, "eu-west-1");
        assert!(calls[0].bypass_tool_consent);
        assert_eq!(calls[0].metadata["source"], json!("unit"));
        assert!(!receipt.record_id.is_empty());
    }

    #[tokio::test]
    async fn test_missing_metadata_becomes_empty_map() {
        let store = Arc::new(FakeKnowledgeStore::default());
        let saver = KnowledgeBaseSaver::new(store.clone(), settings());

        saver.store_text("text", None).await.unwrap();

        let request = serde_json::to_value(&store.requests()[0]).unwrap();
        assert_eq!(request["action"], json!("store"));
        assert_eq!(request["metadata"], json!({}));
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected_before_backend() {
        let store = Arc::new(FakeKnowledgeStore::default());
        let saver = KnowledgeBaseSaver::new(store.clone(), settings());

        let err = saver.store_text("  \n", None).await.unwrap_err();
        assert!(matches!(err, IngestError::EmptyContent));
        assert!(store.requests().is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let store = Arc::new(FakeKnowledgeStore::default());
        store.fail_when_content_contains("boom");
        let saver = KnowledgeBaseSaver::new(store, settings());

        let err = saver.store_text("boom", None).await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::Service(mediaflow_core::Error::KnowledgeStore(_))
        ));
    }

    #[tokio::test]
    async fn test_each_call_creates_a_record() {
        let store = Arc::new(FakeKnowledgeStore::default());
        let saver = KnowledgeBaseSaver::new(store.clone(), settings());

        let a = saver.store_text("same", None).await.unwrap();
        let b = saver.store_text("same", None).await.unwrap();
        assert_ne!(a.record_id, b.record_id);
        assert_eq!(store.requests().len(), 2);
    }
}

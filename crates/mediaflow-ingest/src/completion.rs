//! Stores the output of finished workflows in the knowledge base.

use crate::error::{IngestError, IngestResult};
use crate::knowledge::KnowledgeBaseSaver;
use mediaflow_core::{Metadata, ObjectStore, StoreReceipt};
use percent_encoding::percent_decode_str;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use url::Url;

/// `source` metadata value of stored transcripts.
pub const TRANSCRIPT_SOURCE: &str = "transcription";

/// `source` metadata value of stored text-extraction output.
pub const EXTRACTION_SOURCE: &str = "document-extraction";

/// Split an object URI into `(bucket, key)`.
///
/// Accepts `s3://bucket/key`, virtual-hosted
/// `https://bucket.s3.<region>.amazonaws.com/key`, and path-style
/// `https://s3.<region>.amazonaws.com/bucket/key`.
pub fn parse_object_uri(uri: &str) -> IngestResult<(String, String)> {
    let invalid = || IngestError::InvalidUri(uri.to_string());
    let url = Url::parse(uri.trim()).map_err(|_| invalid())?;
    let host = url.host_str().ok_or_else(invalid)?;
    let path = percent_decode_str(url.path().trim_start_matches('/'))
        .decode_utf8_lossy()
        .into_owned();

    let (bucket, key) = match url.scheme() {
        "s3" => (host.to_string(), path),
        "https" | "http" => {
            if let Some(idx) = host.find(".s3.").or_else(|| host.find(".s3-")) {
                (host[..idx].to_string(), path)
            } else {
                let (bucket, key) = path.split_once('/').ok_or_else(invalid)?;
                (bucket.to_string(), key.to_string())
            }
        }
        _ => return Err(invalid()),
    };

    if bucket.is_empty() || key.is_empty() {
        return Err(invalid());
    }
    Ok((bucket, key))
}

/// Stores transcripts and extracted text produced by the workflows.
#[derive(Clone)]
pub struct CompletionHandler {
    storage: Arc<dyn ObjectStore>,
    saver: KnowledgeBaseSaver,
}

impl CompletionHandler {
    pub fn new(storage: Arc<dyn ObjectStore>, saver: KnowledgeBaseSaver) -> Self {
        Self { storage, saver }
    }

    /// Store the transcript text of a transcription result document.
    pub async fn store_transcript(&self, uri: &str) -> IngestResult<StoreReceipt> {
        let (bucket, key) = parse_object_uri(uri)?;
        let body = self.storage.get(&bucket, &key).await?;
        let document: Value = serde_json::from_slice(&body)?;
        let transcript = transcript_text(&document)?;

        let receipt = self
            .saver
            .store_text(transcript, Some(metadata(TRANSCRIPT_SOURCE, &bucket, &key)))
            .await?;
        info!("Stored transcript {} as record {}", key, receipt.record_id);
        Ok(receipt)
    }

    /// Store a plain-text extraction output.
    pub async fn store_extracted_text(&self, uri: &str) -> IngestResult<StoreReceipt> {
        let (bucket, key) = parse_object_uri(uri)?;
        let body = self.storage.get(&bucket, &key).await?;
        let text = String::from_utf8_lossy(&body);

        let receipt = self
            .saver
            .store_text(&text, Some(metadata(EXTRACTION_SOURCE, &bucket, &key)))
            .await?;
        info!("Stored extracted text {} as record {}", key, receipt.record_id);
        Ok(receipt)
    }
}

fn transcript_text(document: &Value) -> IngestResult<&str> {
    document
        .get("results")
        .ok_or(IngestError::MalformedTranscript("results"))?
        .get("transcripts")
        .and_then(|t| t.get(0))
        .ok_or(IngestError::MalformedTranscript("results.transcripts[0]"))?
        .get("transcript")
        .and_then(Value::as_str)
        .ok_or(IngestError::MalformedTranscript("results.transcripts[0].transcript"))
}

fn metadata(source: &str, bucket: &str, key: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("source".to_string(), json!(source));
    metadata.insert("s3_key".to_string(), json!(key));
    metadata.insert("bucket".to_string(), json!(bucket));
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::KnowledgeBaseSettings;
    use crate::testing::{FakeKnowledgeStore, FakeObjectStore};

    fn handler() -> (CompletionHandler, Arc<FakeObjectStore>, Arc<FakeKnowledgeStore>) {
        let storage = Arc::new(FakeObjectStore::default());
        let store = Arc::new(FakeKnowledgeStore::default());
        let saver = KnowledgeBaseSaver::new(
            store.clone(),
            KnowledgeBaseSettings {
                knowledge_base_id: "kb".to_string(),
                bypass_tool_consent: false,
                region: "us-east-1".to_string(),
            },
        );
        (CompletionHandler::new(storage.clone(), saver), storage, store)
    }

    #[test]
    fn test_parse_object_uri_forms() {
        let expected = ("media".to_string(), "transcripts/job 1.json".to_string());
        assert_eq!(parse_object_uri("s3://media/transcripts/job%201.json").unwrap(), expected);
        assert_eq!(
            parse_object_uri("https://media.s3.us-east-1.amazonaws.com/transcripts/job%201.json").unwrap(),
            expected
        );
        assert_eq!(
            parse_object_uri("https://s3.us-east-1.amazonaws.com/media/transcripts/job%201.json").unwrap(),
            expected
        );
    }

    #[test]
    fn test_parse_object_uri_rejects_bad_input() {
        for uri in ["", "not a uri", "s3://media", "s3://media/", "ftp://media/key", "https://s3.amazonaws.com/media"] {
            assert!(
                matches!(parse_object_uri(uri), Err(IngestError::InvalidUri(_))),
                "{}",
                uri
            );
        }
    }

    #[tokio::test]
    async fn test_store_transcript() {
        let (handler, storage, store) = handler();
        storage.insert(
            "media",
            "transcripts/job.json",
            json!({"results": {"transcripts": [{"transcript": "hello world"}]}}).to_string(),
        );

        handler.store_transcript("s3://media/transcripts/job.json").await.unwrap();

        let requests = store.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].content, "hello world");
        assert_eq!(requests[0].metadata["source"], json!("transcription"));
        assert_eq!(requests[0].metadata["s3_key"], json!("transcripts/job.json"));
        assert!(!requests[0].bypass_tool_consent);
    }

    #[tokio::test]
    async fn test_malformed_transcript() {
        let (handler, storage, store) = handler();
        storage.insert("media", "t.json", json!({"results": {"transcripts": []}}).to_string());

        let err = handler.store_transcript("s3://media/t.json").await.unwrap_err();

        assert!(matches!(err, IngestError::MalformedTranscript(_)));
        assert!(store.requests().is_empty());
    }

    #[tokio::test]
    async fn test_store_extracted_text() {
        let (handler, storage, store) = handler();
        storage.insert("media", "extracted/abc.txt", "page one\npage two");

        handler
            .store_extracted_text("https://media.s3.us-east-1.amazonaws.com/extracted/abc.txt")
            .await
            .unwrap();

        let requests = store.requests();
        assert_eq!(requests[0].content, "page one\npage two");
        assert_eq!(requests[0].metadata["source"], json!("document-extraction"));
    }

    #[tokio::test]
    async fn test_missing_object_is_an_error() {
        let (handler, _, store) = handler();
        let err = handler.store_extracted_text("s3://media/missing.txt").await.unwrap_err();
        assert!(matches!(err, IngestError::Service(mediaflow_core::Error::NotFound(_))));
        assert!(store.requests().is_empty());
    }
}

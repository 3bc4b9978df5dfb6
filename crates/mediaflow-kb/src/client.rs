//! Knowledge-base HTTP client.

use crate::error::{KbError, KbResult};
use crate::types::StoreResponse;
use async_trait::async_trait;
use mediaflow_config::KnowledgeBaseConfig;
use mediaflow_core::{Error, KnowledgeStore, StoreReceipt, StoreRequest};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Client for a knowledge base exposing `POST /store`.
#[derive(Clone)]
pub struct HttpKnowledgeBase {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpKnowledgeBase {
    /// Create a client from configuration. The endpoint must be set.
    pub fn from_config(config: &KnowledgeBaseConfig) -> KbResult<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(|| KbError::InvalidConfig("knowledge_base.endpoint is not set".to_string()))?;
        Self::new(endpoint, Duration::from_secs(config.timeout_seconds))
    }

    /// Create a client for the given endpoint.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> KbResult<Self> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(KbError::InvalidConfig("empty endpoint".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(KbError::Http)?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn store_url(&self) -> String {
        format!("{}/store", self.endpoint)
    }

    /// Check if the knowledge base answers its health route.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/health", self.endpoint);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Send one store call and return the created record's descriptor.
    pub async fn store_request(&self, request: &StoreRequest) -> KbResult<StoreReceipt> {
        let url = self.store_url();
        debug!(
            "Storing {} bytes in knowledge base {} via {}",
            request.content.len(),
            request.knowledge_base_id,
            url
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(KbError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let body: StoreResponse = response.json().await?;
        body.into_receipt().ok_or(KbError::MissingRecordId)
    }

    fn classify_send_error(&self, e: reqwest::Error) -> KbError {
        if e.is_connect() {
            KbError::Unreachable {
                endpoint: self.endpoint.clone(),
            }
        } else if e.is_timeout() {
            KbError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            KbError::Http(e)
        }
    }
}

#[async_trait]
impl KnowledgeStore for HttpKnowledgeBase {
    async fn store(&self, request: &StoreRequest) -> mediaflow_core::Result<StoreReceipt> {
        self.store_request(request)
            .await
            .map_err(|e| Error::KnowledgeStore(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediaflow_core::{Metadata, StoreAction};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(content: &str) -> StoreRequest {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), json!("ingestion-pipeline"));
        metadata.insert("s3_key".to_string(), json!("processed/abc.csv"));
        StoreRequest {
            action: StoreAction::Store,
            content: content.to_string(),
            metadata,
            knowledge_base_id: "kb-main".to_string(),
            bypass_tool_consent: true,
            region_name: "us-east-1".to_string(),
        }
    }

    fn client_for(server: &MockServer) -> HttpKnowledgeBase {
        HttpKnowledgeBase::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_client_requires_endpoint() {
        let config = KnowledgeBaseConfig::default();
        assert!(matches!(
            HttpKnowledgeBase::from_config(&config),
            Err(KbError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_store_url_trims_trailing_slash() {
        let config = KnowledgeBaseConfig {
            endpoint: Some("http://localhost:8080/".to_string()),
            ..KnowledgeBaseConfig::default()
        };
        let client = HttpKnowledgeBase::from_config(&config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080");
        assert_eq!(client.store_url(), "http://localhost:8080/store");
    }

    #[tokio::test]
    async fn test_store_posts_request_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/store"))
            .and(body_json(json!({
                "action": "store",
                "content": "region,total\neu,10\n",
                "metadata": {
                    "source": "ingestion-pipeline",
                    "s3_key": "processed/abc.csv",
                },
                "knowledge_base_id": "kb-main",
                "bypass_tool_consent": true,
                "region_name": "us-east-1",
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"record_id": "r-42", "status": "stored"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let receipt = client_for(&server)
            .store_request(&request("region,total\neu,10\n"))
            .await
            .unwrap();

        assert_eq!(receipt.record_id, "r-42");
        assert_eq!(receipt.status.as_deref(), Some("stored"));
    }

    #[tokio::test]
    async fn test_store_through_trait_accepts_id_field() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/store"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "r-7"})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let store: &dyn KnowledgeStore = &client;
        let receipt = store.store(&request("notes")).await.unwrap();
        assert_eq!(receipt.record_id, "r-7");
        assert!(receipt.status.is_none());
    }

    #[tokio::test]
    async fn test_error_status_is_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/store"))
            .respond_with(ResponseTemplate::new(400).set_body_string("unknown knowledge base"))
            .mount(&server)
            .await;

        match client_for(&server).store_request(&request("x")).await {
            Err(KbError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "unknown knowledge base");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_maps_to_knowledge_store_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/store"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(matches!(
            client.store_request(&request("x")).await,
            Err(KbError::Api { status: 503, .. })
        ));
        assert!(matches!(
            client.store(&request("x")).await,
            Err(Error::KnowledgeStore(_))
        ));
    }

    #[tokio::test]
    async fn test_response_without_id_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/store"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .mount(&server)
            .await;

        assert!(matches!(
            client_for(&server).store_request(&request("x")).await,
            Err(KbError::MissingRecordId)
        ));
    }

    #[tokio::test]
    async fn test_health_route() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        assert!(client_for(&server).is_available().await);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_typed_error() {
        // Port 9 (discard) is not expected to accept HTTP connections locally.
        let client = HttpKnowledgeBase::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();

        let err = client.store(&request("hello")).await.unwrap_err();
        assert!(matches!(err, Error::KnowledgeStore(_)));
        assert!(!client.is_available().await);
    }
}

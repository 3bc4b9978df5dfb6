//! In-memory capability fakes with failure injection.

use async_trait::async_trait;
use mediaflow_core::{
    keys, Error, ExecutionId, KnowledgeStore, MessageId, MessageQueue, ObjectStore, Result,
    StoreReceipt, StoreRequest, WorkflowInput, WorkflowStarter,
};
use std::collections::HashMap;
use std::sync::Mutex;

/// Substring triggers: any call whose subject contains one of them fails.
#[derive(Default)]
struct Triggers(Mutex<Vec<String>>);

impl Triggers {
    fn add(&self, needle: &str) {
        self.0.lock().unwrap().push(needle.to_string());
    }

    fn hit(&self, subject: &str) -> bool {
        self.0.lock().unwrap().iter().any(|n| subject.contains(n.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyCall {
    pub bucket: String,
    pub source_key: String,
    pub dest_bucket: String,
    pub dest_key: String,
}

#[derive(Default)]
pub struct FakeObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    copies: Mutex<Vec<CopyCall>>,
    fail_copy: Triggers,
    fail_get: Triggers,
}

impl FakeObjectStore {
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), body.into());
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    pub fn copies(&self) -> Vec<CopyCall> {
        self.copies.lock().unwrap().clone()
    }

    pub fn fail_copy_when_key_contains(&self, needle: &str) {
        self.fail_copy.add(needle);
    }

    pub fn fail_get_when_key_contains(&self, needle: &str) {
        self.fail_get.add(needle);
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        if self.fail_get.hit(key) {
            return Err(Error::Storage(format!("injected get failure for {}", key)));
        }
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| Error::NotFound(keys::s3_uri(bucket, key)))
    }

    async fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<()> {
        self.insert(bucket, key, body.to_vec());
        Ok(())
    }

    async fn copy(&self, bucket: &str, source_key: &str, dest_bucket: &str, dest_key: &str) -> Result<()> {
        if self.fail_copy.hit(source_key) {
            return Err(Error::Storage(format!("injected copy failure for {}", source_key)));
        }
        let body = self
            .objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), source_key.to_string()))
            .cloned()
            .ok_or_else(|| Error::NotFound(keys::s3_uri(bucket, source_key)))?;
        self.insert(dest_bucket, dest_key, body);
        self.copies.lock().unwrap().push(CopyCall {
            bucket: bucket.to_string(),
            source_key: source_key.to_string(),
            dest_bucket: dest_bucket.to_string(),
            dest_key: dest_key.to_string(),
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeQueue {
    sent: Mutex<Vec<String>>,
    fail: Triggers,
}

impl FakeQueue {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_when_body_contains(&self, needle: &str) {
        self.fail.add(needle);
    }
}

#[async_trait]
impl MessageQueue for FakeQueue {
    async fn send(&self, body: &str) -> Result<MessageId> {
        if self.fail.hit(body) {
            return Err(Error::Queue("injected send failure".to_string()));
        }
        self.sent.lock().unwrap().push(body.to_string());
        Ok(keys::new_id())
    }
}

#[derive(Default)]
pub struct FakeWorkflowStarter {
    starts: Mutex<Vec<(String, WorkflowInput)>>,
    fail: Triggers,
}

impl FakeWorkflowStarter {
    pub fn starts(&self) -> Vec<(String, WorkflowInput)> {
        self.starts.lock().unwrap().clone()
    }

    pub fn fail_when_key_contains(&self, needle: &str) {
        self.fail.add(needle);
    }
}

#[async_trait]
impl WorkflowStarter for FakeWorkflowStarter {
    async fn start(&self, workflow_id: &str, input: &WorkflowInput) -> Result<ExecutionId> {
        if self.fail.hit(&input.object_key) {
            return Err(Error::Workflow(format!("injected start failure for {}", workflow_id)));
        }
        self.starts
            .lock()
            .unwrap()
            .push((workflow_id.to_string(), input.clone()));
        Ok(keys::new_id())
    }
}

#[derive(Default)]
pub struct FakeKnowledgeStore {
    requests: Mutex<Vec<StoreRequest>>,
    fail: Triggers,
}

impl FakeKnowledgeStore {
    pub fn requests(&self) -> Vec<StoreRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn fail_when_content_contains(&self, needle: &str) {
        self.fail.add(needle);
    }
}

#[async_trait]
impl KnowledgeStore for FakeKnowledgeStore {
    async fn store(&self, request: &StoreRequest) -> Result<StoreReceipt> {
        if self.fail.hit(&request.content) {
            return Err(Error::KnowledgeStore("injected store failure".to_string()));
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(StoreReceipt {
            record_id: keys::new_id(),
            status: Some("stored".to_string()),
        })
    }
}

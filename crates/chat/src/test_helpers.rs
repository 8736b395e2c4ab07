//! Shared test doubles for orchestrator tests.

use async_trait::async_trait;
use parley_core::context::ContextProvider;
use parley_core::error::{ContextError, ProviderError, StoreError};
use parley_core::message::Role;
use parley_core::provider::{GenerateRequest, GenerateResponse, Provider};
use parley_core::session::{SessionPolicy, SessionStore, StoredHistory};
use std::sync::Mutex;

/// A provider that returns scripted replies in order and records every request.
pub struct ScriptedProvider {
    replies: Mutex<Vec<Result<String, ProviderError>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedProvider {
    pub fn replies(texts: &[&str]) -> Self {
        Self {
            replies: Mutex::new(texts.iter().map(|t| Ok(t.to_string())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: ProviderError) -> Self {
        Self {
            replies: Mutex::new(vec![Err(err)]),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }

    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let model = request.model.clone();
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };

        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            panic!("ScriptedProvider: no more replies (call #{call})");
        }
        replies
            .remove(0)
            .map(|text| GenerateResponse { text, model })
    }
}

/// A store whose writes always fail, and whose reads optionally fail too.
pub struct FailingStore {
    read_error: Option<StoreError>,
}

impl FailingStore {
    /// Reads fail with a connection error.
    pub fn reads() -> Self {
        Self::reads_with(StoreError::Connection("connection refused".into()))
    }

    pub fn reads_with(err: StoreError) -> Self {
        Self {
            read_error: Some(err),
        }
    }

    pub fn writes() -> Self {
        Self { read_error: None }
    }

    fn read<T>(&self, ok: T) -> Result<T, StoreError> {
        match &self.read_error {
            Some(err) => Err(err.clone()),
            None => Ok(ok),
        }
    }
}

#[async_trait]
impl SessionStore for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    fn policy(&self) -> SessionPolicy {
        SessionPolicy::default()
    }

    async fn exists(&self, _session_id: &str) -> Result<bool, StoreError> {
        self.read(false)
    }

    async fn load(&self, _session_id: &str) -> Result<StoredHistory, StoreError> {
        self.read(StoredHistory::Absent)
    }

    async fn append(&self, _session_id: &str, _role: Role, _content: &str) -> Result<(), StoreError> {
        Err(StoreError::Command("READONLY You can't write against a read only replica.".into()))
    }

    async fn reset(&self, _session_id: &str) -> Result<bool, StoreError> {
        Err(StoreError::Command("READONLY".into()))
    }

    async fn ttl(&self, _session_id: &str) -> Result<Option<std::time::Duration>, StoreError> {
        self.read(None)
    }
}

/// A context provider with a fixed answer.
pub struct StaticContext {
    result: Result<String, ContextError>,
}

impl StaticContext {
    pub fn ok(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
        }
    }

    pub fn failing(err: ContextError) -> Self {
        Self { result: Err(err) }
    }
}

#[async_trait]
impl ContextProvider for StaticContext {
    fn name(&self) -> &str {
        "static"
    }

    fn error_label(&self) -> &str {
        "Static"
    }

    async fn fetch(&self, _reference: &str) -> Result<String, ContextError> {
        self.result.clone()
    }
}

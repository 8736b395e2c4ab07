//! The chat orchestrator — one request, start to finish.
//!
//! Per request, strictly in this order:
//!
//! 1. Check whether the session exists.
//! 2. Read its history (before any mutation).
//! 3. Fetch context, if requested. Failures become inline markers.
//! 4. Assemble the prompt.
//! 5. Generate a reply. On failure nothing is persisted.
//! 6. Append the user turn, then the assistant turn.
//! 7. Derive `expired` from the values read in steps 1 and 2.

use crate::prompt;
use parley_core::context::{ContextBlock, ContextProvider, ContextSource};
use parley_core::error::{ChatError, ContextError, StoreError};
use parley_core::message::{Role, Turn};
use parley_core::provider::{GenerateRequest, Provider, SamplingOptions};
use parley_core::session::SessionStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Reply used when the backend generates nothing.
pub const EMPTY_REPLY_FALLBACK: &str =
    "I apologize, but I couldn't generate a response. Please try again.";

/// A single chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextRequest>,
}

impl ChatRequest {
    pub fn new(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            context: None,
        }
    }

    /// Attach a context reference; the source is inferred unless given.
    pub fn with_context(mut self, reference: impl Into<String>, source: Option<ContextSource>) -> Self {
        self.context = Some(ContextRequest {
            reference: reference.into(),
            source,
        });
        self
    }
}

/// What to enrich the prompt with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRequest {
    /// A URL or a search query.
    pub reference: String,
    /// Explicit routing; inferred from `reference` when absent.
    #[serde(default)]
    pub source: Option<ContextSource>,
}

/// The result of a successful chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatOutcome {
    pub reply: String,
    /// True when the session did not exist and had no history before this
    /// request, i.e. it is new or its TTL lapsed.
    pub expired: bool,
}

/// Drives chat requests through the store, context providers and inference.
pub struct ChatOrchestrator {
    store: Arc<dyn SessionStore>,
    provider: Arc<dyn Provider>,
    model: String,
    sampling: SamplingOptions,
    context_providers: HashMap<ContextSource, Arc<dyn ContextProvider>>,
}

impl ChatOrchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provider,
            model: model.into(),
            sampling: SamplingOptions::default(),
            context_providers: HashMap::new(),
        }
    }

    pub fn with_sampling(mut self, sampling: SamplingOptions) -> Self {
        self.sampling = sampling;
        self
    }

    /// Register a provider for one context source, replacing any previous one.
    pub fn with_context_provider(
        mut self,
        source: ContextSource,
        provider: Arc<dyn ContextProvider>,
    ) -> Self {
        self.context_providers.insert(source, provider);
        self
    }

    pub fn with_context_providers(
        mut self,
        providers: HashMap<ContextSource, Arc<dyn ContextProvider>>,
    ) -> Self {
        self.context_providers.extend(providers);
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Handle one chat turn.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome, ChatError> {
        let session_id = request.session_id.as_str();

        let existed = self
            .store
            .exists(session_id)
            .await
            .map_err(|e| read_failure(session_id, e))?;
        let history = self
            .store
            .get(session_id)
            .await
            .map_err(|e| read_failure(session_id, e))?;
        debug!(session_id, existed, turns = history.len(), "Loaded session");

        let context = match &request.context {
            Some(ctx) if !ctx.reference.trim().is_empty() => Some(self.fetch_context(ctx).await),
            _ => None,
        };

        let prompt = prompt::assemble(&history, context.as_ref(), &request.message);
        let generation = GenerateRequest::new(&self.model, prompt).with_options(self.sampling);

        let response = self.provider.generate(generation).await.map_err(|e| {
            error!(session_id, provider = self.provider.name(), "Inference failed: {e}");
            ChatError::from(e)
        })?;
        let reply = finalize_reply(&response.text);

        self.store
            .append(session_id, Role::User, &request.message)
            .await
            .map_err(|e| persistence_failure(session_id, e))?;
        self.store
            .append(session_id, Role::Assistant, &reply)
            .await
            .map_err(|e| persistence_failure(session_id, e))?;

        let expired = !existed && history.is_empty();
        info!(session_id, expired, reply_chars = reply.chars().count(), "Chat turn complete");

        Ok(ChatOutcome { reply, expired })
    }

    /// Current history of a session, oldest first.
    pub async fn history(&self, session_id: &str) -> Result<Vec<Turn>, ChatError> {
        self.store
            .get(session_id)
            .await
            .map_err(|e| read_failure(session_id, e))
    }

    /// Drop a session. Returns whether it existed.
    pub async fn reset(&self, session_id: &str) -> Result<bool, ChatError> {
        self.store.reset(session_id).await.map_err(|e| {
            if e.is_transient() {
                ChatError::TransientUpstream(e.to_string())
            } else {
                persistence_failure(session_id, e)
            }
        })
    }

    async fn fetch_context(&self, request: &ContextRequest) -> ContextBlock {
        let reference = request.reference.trim();
        let source = request
            .source
            .unwrap_or_else(|| ContextSource::infer(reference));

        let Some(provider) = self.context_providers.get(&source) else {
            let err = ContextError::NotConfigured(source.as_str().into());
            warn!(source = source.as_str(), "{err}");
            return ContextBlock::degraded("Context", &err);
        };

        match provider.fetch(reference).await {
            Ok(text) => {
                debug!(provider = provider.name(), chars = text.chars().count(), "Context fetched");
                ContextBlock::from_text(text)
            }
            Err(e) => {
                warn!(provider = provider.name(), reference, "Context fetch degraded: {e}");
                ContextBlock::degraded(provider.error_label(), &e)
            }
        }
    }
}

fn finalize_reply(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        warn!("Inference returned an empty response");
        EMPTY_REPLY_FALLBACK.to_string()
    } else {
        trimmed.to_string()
    }
}

fn read_failure(session_id: &str, e: StoreError) -> ChatError {
    error!(session_id, "Session read failed: {e}");
    if e.is_transient() {
        ChatError::TransientUpstream(e.to_string())
    } else {
        ChatError::Persistence {
            session_id: session_id.to_string(),
            reason: e.to_string(),
        }
    }
}

fn persistence_failure(session_id: &str, e: StoreError) -> ChatError {
    error!(session_id, "Session write failed: {e}");
    ChatError::Persistence {
        session_id: session_id.to_string(),
        reason: e.to_string(),
    }
}

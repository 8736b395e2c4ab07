//! Error types for the Parley domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator has its own error type; [`ChatError`] is the only
//! failure that crosses the orchestration boundary.

use thiserror::Error;

/// Startup failures: wiring the store, provider and context providers.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Context errors ---
    #[error("Context error: {0}")]
    Context(#[from] ContextError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Collaborator errors ---

/// Failures of the text-generation backend.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Timeouts and connection failures may succeed on resubmission.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Network(_))
    }
}

/// Failures of the session store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Store {operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("Store connection failed: {0}")]
    Connection(String),

    #[error("Store command failed: {0}")]
    Command(String),

    #[error("Failed to encode session history: {0}")]
    Encode(String),
}

impl StoreError {
    /// Timeouts and connection failures may succeed on resubmission.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Connection(_))
    }
}

/// Failures of a context provider. Never propagated past the orchestrator;
/// rendered into the prompt as an inline marker instead.
#[derive(Debug, Clone, Error)]
pub enum ContextError {
    #[error("Invalid URL format: {0}")]
    InvalidReference(String),

    #[error("Request timed out after {timeout_secs} seconds for {reference}")]
    Timeout { reference: String, timeout_secs: u64 },

    #[error("Failed to connect to {0}")]
    Connection(String),

    #[error("HTTP {status} error for {reference}")]
    Http { status: u16, reference: String },

    #[error("No provider configured for {0} context")]
    NotConfigured(String),

    #[error("{0}")]
    Other(String),
}

/// The failures a chat request can end with.
///
/// Malformed stored state and degraded context fetches are absorbed inside
/// the orchestrator and never show up here.
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    /// A store or inference call timed out or could not connect. Retry-eligible.
    #[error("Upstream temporarily unavailable: {0}")]
    TransientUpstream(String),

    /// The inference backend answered with a failure. Nothing was persisted.
    #[error("AI service unavailable: {0}")]
    BackendUnavailable(String),

    /// The store rejected a call in a way a retry will not fix, most often a
    /// write after the reply was generated.
    #[error("Session store failed for session {session_id}: {reason}")]
    Persistence { session_id: String, reason: String },
}

impl ChatError {
    /// Machine-readable kind, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TransientUpstream(_) => "transient_upstream",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::Persistence { .. } => "persistence",
        }
    }
}

impl From<ProviderError> for ChatError {
    fn from(err: ProviderError) -> Self {
        if err.is_transient() {
            Self::TransientUpstream(err.to_string())
        } else {
            Self::BackendUnavailable(err.to_string())
        }
    }
}

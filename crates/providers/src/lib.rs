//! Text-generation backends for Parley.
//!
//! All providers implement the `parley_core::Provider` trait.
//! `build_from_config` selects the backend named in configuration.

pub mod ollama;
pub mod openai_compat;
pub mod router;

pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;

use parley_core::error::ProviderError;

/// Map a `reqwest` transport error to a provider error.
pub(crate) fn transport_error(provider: &str, base_url: &str, timeout_secs: u64, e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(format!(
            "{provider} request timed out after {timeout_secs} seconds"
        ))
    } else if e.is_connect() {
        ProviderError::Network(format!("Failed to connect to {provider} at {base_url}: {e}"))
    } else {
        ProviderError::Network(format!("{provider} request failed: {e}"))
    }
}

/// Whether a failure while reading a success body came from the transport
/// rather than the payload.
pub(crate) fn is_transport_failure(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body()
}

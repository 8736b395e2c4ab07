//! Provider selection from configuration.

use crate::ollama::OllamaProvider;
use crate::openai_compat::OpenAiCompatProvider;
use parley_config::AppConfig;
use parley_core::error::ProviderError;
use parley_core::provider::Provider;
use std::sync::Arc;

/// Build the provider named by `inference.backend`.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let inference = &config.inference;
    let provider: Arc<dyn Provider> = match inference.backend.as_str() {
        "ollama" => Arc::new(OllamaProvider::new(&inference.base_url, inference.timeout())?),
        "openai_compat" => Arc::new(OpenAiCompatProvider::new(
            &inference.base_url,
            inference.api_key.clone(),
            inference.timeout(),
        )?),
        other => {
            return Err(ProviderError::NotConfigured(format!(
                "unknown inference backend '{other}'"
            )));
        }
    };

    tracing::info!(
        provider = provider.name(),
        base_url = %inference.base_url,
        model = %inference.model,
        "Inference provider ready"
    );
    Ok(provider)
}

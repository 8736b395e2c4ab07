//! Ollama provider.
//!
//! Talks to the native `/api/generate` endpoint with streaming disabled,
//! so each call yields one complete JSON object.

use async_trait::async_trait;
use parley_core::error::ProviderError;
use parley_core::provider::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{is_transport_failure, transport_error};

/// A local or remote Ollama server.
pub struct OllamaProvider {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a provider for the server at `base_url`.
    ///
    /// `timeout` bounds the whole request, including generation time.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn transport(&self, e: reqwest::Error) -> ProviderError {
        transport_error("Ollama", &self.base_url, self.timeout.as_secs(), e)
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = ApiGenerateRequest {
            model: &request.model,
            prompt: &request.prompt,
            stream: false,
            options: request.options,
        };

        debug!(model = %request.model, prompt_chars = request.prompt.len(), "Sending generate request to Ollama");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Ollama returned an error");
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: text,
            });
        }

        let parsed: ApiGenerateResponse = response
            .json()
            .await
            .map_err(|e| {
                if is_transport_failure(&e) {
                    self.transport(e)
                } else {
                    ProviderError::MalformedResponse(e.to_string())
                }
            })?;

        Ok(GenerateResponse {
            text: parsed.response.unwrap_or_default(),
            model: parsed.model.unwrap_or(request.model),
        })
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport(e))?;
        Ok(response.status().is_success())
    }
}

// --- Ollama API types (internal) ---

#[derive(Serialize)]
struct ApiGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: SamplingOptions,
}

#[derive(Deserialize)]
struct ApiGenerateResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    response: Option<String>,
}

//! Page scraper — fetch a URL and extract its visible text.

use async_trait::async_trait;
use parley_core::context::ContextProvider;
use parley_core::error::ContextError;
use scraper::Html;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{http_client, transport_error};

/// Elements whose text never reaches the prompt.
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "form", "button",
];

/// Fetches a single page and returns its cleaned, length-capped text.
pub struct PageScraper {
    client: reqwest::Client,
    timeout: Duration,
    max_chars: usize,
}

impl PageScraper {
    pub fn new(timeout: Duration, max_chars: usize, user_agent: &str) -> Result<Self, ContextError> {
        Ok(Self {
            client: http_client(timeout, user_agent)?,
            timeout,
            max_chars,
        })
    }

    /// Accept only absolute http(s) URLs with a host.
    fn validate(reference: &str) -> Result<url::Url, ContextError> {
        let parsed = url::Url::parse(reference)
            .map_err(|_| ContextError::InvalidReference(reference.to_string()))?;
        let has_host = parsed.host_str().is_some_and(|h| !h.is_empty());
        if matches!(parsed.scheme(), "http" | "https") && has_host {
            Ok(parsed)
        } else {
            Err(ContextError::InvalidReference(reference.to_string()))
        }
    }
}

#[async_trait]
impl ContextProvider for PageScraper {
    fn name(&self) -> &str {
        "page_scraper"
    }

    fn error_label(&self) -> &str {
        "Scraping"
    }

    async fn fetch(&self, reference: &str) -> Result<String, ContextError> {
        let url = Self::validate(reference.trim()).inspect_err(|e| warn!("{e}"))?;

        info!(%url, "Scraping URL");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(reference, self.timeout.as_secs(), e))?;

        let status = response.status().as_u16();
        if status != 200 {
            warn!(status, %url, "Scrape target returned an error");
            return Err(ContextError::Http {
                status,
                reference: reference.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(reference, self.timeout.as_secs(), e))?;

        let text = extract_text(&body, self.max_chars);
        if text.is_empty() {
            warn!(%url, "No text content extracted");
            return Err(ContextError::Other(
                "No text content found on the page".into(),
            ));
        }

        info!(chars = text.chars().count(), %url, "Scraped page");
        Ok(text)
    }
}

/// Visible text of an HTML document, whitespace-collapsed and capped at
/// `max_chars` characters (with `...` appended when cut).
pub fn extract_text(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);

    let mut words: Vec<&str> = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let skipped = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if !skipped {
            words.extend(text.split_whitespace());
        }
    }
    let text = words.join(" ");

    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            debug!(max_chars, "Truncated scraped text");
            format!("{}...", &text[..cut])
        }
        None => text,
    }
}

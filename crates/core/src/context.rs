//! ContextProvider trait — per-request enrichment text.
//!
//! A provider turns a reference (a URL or a search query) into plain text.
//! The text is injected into a single prompt and never persisted.

use crate::error::ContextError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Case-insensitive marker identifying aggregated result lists.
pub const RESULT_SET_MARKER: &str = "search results:";

/// How a context block is framed inside the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContextKind {
    /// Content of a single page.
    Generic,
    /// An aggregated list of search results.
    ResultSet,
}

/// Ephemeral enrichment text for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBlock {
    pub kind: ContextKind,
    pub text: String,
}

impl ContextBlock {
    /// Build a block, inferring its kind from the text itself.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let kind = if text.to_lowercase().contains(RESULT_SET_MARKER) {
            ContextKind::ResultSet
        } else {
            ContextKind::Generic
        };
        Self { kind, text }
    }

    /// Inline marker for a provider failure, e.g. `[Scraping Error: ...]`.
    pub fn degraded(label: &str, err: &ContextError) -> Self {
        Self::from_text(format!("[{label} Error: {err}]"))
    }
}

/// Which kind of provider a reference should be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    /// Fetch and extract a single web page.
    Page,
    /// Run a web search and list the top results.
    Search,
}

impl ContextSource {
    /// Infer the source from a reference: http(s) URLs are pages,
    /// everything else is a search query.
    pub fn infer(reference: &str) -> Self {
        let trimmed = reference.trim_start().to_ascii_lowercase();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Page
        } else {
            Self::Search
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Search => "search",
        }
    }
}

/// The core ContextProvider trait.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// A human-readable name (e.g., "page_scraper", "web_search").
    fn name(&self) -> &str;

    /// Label used in inline error markers.
    fn error_label(&self) -> &str {
        "Context"
    }

    /// Fetch text for a reference.
    ///
    /// Implementations may return either an error or text that already
    /// carries a bracketed error marker; callers treat both as prompt text.
    async fn fetch(&self, reference: &str) -> Result<String, ContextError>;
}

//! Context providers for Parley.
//!
//! - [`PageScraper`] fetches a web page and extracts its visible text.
//! - [`WebSearch`] runs a DuckDuckGo query and lists the top results.

pub mod scrape;
pub mod search;

pub use scrape::PageScraper;
pub use search::WebSearch;

use parley_config::AppConfig;
use parley_core::context::{ContextProvider, ContextSource};
use parley_core::error::ContextError;
use std::collections::HashMap;
use std::sync::Arc;

/// Context providers keyed by the source they serve.
pub type ContextProviders = HashMap<ContextSource, Arc<dyn ContextProvider>>;

/// Build the providers enabled in `[context]`.
pub fn build_from_config(config: &AppConfig) -> Result<ContextProviders, ContextError> {
    let ctx = &config.context;
    let mut providers: ContextProviders = HashMap::new();

    if ctx.scrape_enabled {
        providers.insert(
            ContextSource::Page,
            Arc::new(PageScraper::new(ctx.timeout(), ctx.max_chars, &ctx.user_agent)?),
        );
    }
    if ctx.search_enabled {
        providers.insert(
            ContextSource::Search,
            Arc::new(WebSearch::new(
                &ctx.search_url,
                ctx.search_results,
                ctx.timeout(),
                &ctx.user_agent,
            )?),
        );
    }

    tracing::debug!(count = providers.len(), "Context providers ready");
    Ok(providers)
}

/// Build the shared HTTP client used by both providers.
pub(crate) fn http_client(
    timeout: std::time::Duration,
    user_agent: &str,
) -> Result<reqwest::Client, ContextError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| ContextError::Other(format!("Failed to build HTTP client: {e}")))
}

/// Map a transport failure for `reference` to a context error.
pub(crate) fn transport_error(reference: &str, timeout_secs: u64, e: reqwest::Error) -> ContextError {
    if e.is_timeout() {
        ContextError::Timeout {
            reference: reference.to_string(),
            timeout_secs,
        }
    } else if e.is_connect() {
        ContextError::Connection(reference.to_string())
    } else {
        ContextError::Other(format!("Unexpected error while fetching {reference}: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_providers_enabled_by_default() {
        let providers = build_from_config(&AppConfig::default()).unwrap();
        assert_eq!(providers[&ContextSource::Page].name(), "page_scraper");
        assert_eq!(providers[&ContextSource::Search].name(), "web_search");
    }

    #[test]
    fn disabled_providers_are_omitted() {
        let mut config = AppConfig::default();
        config.context.search_enabled = false;
        let providers = build_from_config(&config).unwrap();
        assert!(providers.contains_key(&ContextSource::Page));
        assert!(!providers.contains_key(&ContextSource::Search));
    }
}

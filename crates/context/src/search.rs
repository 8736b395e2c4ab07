//! Web search via DuckDuckGo's HTML endpoint.

use async_trait::async_trait;
use parley_core::context::ContextProvider;
use parley_core::error::ContextError;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{http_client, transport_error};

/// One organic search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Runs a query and formats the top results as a numbered list.
pub struct WebSearch {
    client: reqwest::Client,
    endpoint: String,
    max_results: usize,
    timeout: Duration,
}

impl WebSearch {
    pub fn new(
        endpoint: impl Into<String>,
        max_results: usize,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, ContextError> {
        Ok(Self {
            client: http_client(timeout, user_agent)?,
            endpoint: endpoint.into(),
            max_results,
            timeout,
        })
    }

    /// Run `query` and return up to `max_results` hits.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ContextError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| transport_error(&self.endpoint, self.timeout.as_secs(), e))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(ContextError::Http {
                status,
                reference: self.endpoint.clone(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&self.endpoint, self.timeout.as_secs(), e))?;
        parse_results(&body, self.max_results)
    }
}

#[async_trait]
impl ContextProvider for WebSearch {
    fn name(&self) -> &str {
        "web_search"
    }

    fn error_label(&self) -> &str {
        "Search"
    }

    async fn fetch(&self, reference: &str) -> Result<String, ContextError> {
        let query = reference.trim();
        if query.is_empty() {
            return Err(ContextError::Other("Search query is empty".into()));
        }

        info!(query, "Searching DuckDuckGo");
        let hits = self.search(query).await.inspect_err(|e| warn!(query, "Search failed: {e}"))?;
        info!(count = hits.len(), "Search results found");
        Ok(format_results(&hits))
    }
}

fn selector(css: &str) -> Result<Selector, ContextError> {
    Selector::parse(css).map_err(|e| ContextError::Other(format!("Invalid CSS selector {css}: {e:?}")))
}

fn collapsed_text(el: ElementRef<'_>) -> String {
    el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// Parse a DuckDuckGo HTML results page. Ads are skipped.
pub fn parse_results(html: &str, limit: usize) -> Result<Vec<SearchHit>, ContextError> {
    let result_sel = selector("div.result")?;
    let title_sel = selector("a.result__a")?;
    let snippet_sel = selector(".result__snippet")?;

    let document = Html::parse_document(html);
    let hits = document
        .select(&result_sel)
        .filter(|r| !r.value().classes().any(|c| c == "result--ad"))
        .filter_map(|r| {
            let link = r.select(&title_sel).next()?;
            let href = link.value().attr("href").unwrap_or_default();
            Some(SearchHit {
                title: Some(collapsed_text(link))
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "No title".into()),
                url: resolve_link(href),
                snippet: r.select(&snippet_sel).next().map(collapsed_text).unwrap_or_default(),
            })
        })
        .take(limit)
        .collect::<Vec<_>>();

    debug!(count = hits.len(), "Parsed search results");
    Ok(hits)
}

/// DuckDuckGo wraps targets as `//duckduckgo.com/l/?uddg=<encoded>`; unwrap them.
fn resolve_link(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    url::Url::parse(&absolute)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "uddg")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or(absolute)
}

/// Render hits the way the prompt expects them.
pub fn format_results(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No search results found.".into();
    }

    let mut out = String::from("Here are the top search results:\n\n");
    for (i, hit) in hits.iter().enumerate() {
        out.push_str(&format!("{}. **{}**\n", i + 1, hit.title));
        out.push_str(&format!("   URL: {}\n", hit.url));
        if !hit.snippet.is_empty() {
            out.push_str(&format!("   {}\n", hit.snippet));
        }
        out.push('\n');
    }
    out
}

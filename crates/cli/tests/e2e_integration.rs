//! End-to-end integration tests for the Parley pipeline.
//!
//! These tests wire real components together: the in-memory session
//! store, the page scraper and web search against a local mock web
//! server, the orchestrator and the HTTP gateway. Only the language
//! model is scripted.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use parley_chat::{ChatOrchestrator, ChatRequest};
use parley_config::AppConfig;
use parley_context::{PageScraper, WebSearch};
use parley_core::context::ContextSource;
use parley_core::error::ProviderError;
use parley_core::message::Turn;
use parley_core::provider::{GenerateRequest, GenerateResponse, Provider};
use parley_core::session::{SessionPolicy, SessionStore};
use parley_gateway::{GatewayState, build_router};
use parley_memory::InMemorySessionStore;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that answers with scripted replies and records prompts.
struct ScriptedProvider {
    replies: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompt(&self, index: usize) -> String {
        self.prompts.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        self.prompts.lock().unwrap().push(request.prompt);
        let text = self
            .replies
            .lock()
            .unwrap()
            .pop()
            .expect("ScriptedProvider exhausted");
        Ok(GenerateResponse {
            text,
            model: request.model,
        })
    }
}

fn store(max_turns: usize) -> Arc<InMemorySessionStore> {
    Arc::new(InMemorySessionStore::new(SessionPolicy::new(
        Duration::from_secs(600),
        max_turns,
    )))
}

// ── Conversation flow ─────────────────────────────────────────────────────

#[tokio::test]
async fn multi_turn_conversation_keeps_bounded_history() {
    let store = store(4);
    let provider = Arc::new(ScriptedProvider::new(&["a1", "a2", "a3"]));
    let chat = ChatOrchestrator::new(store.clone(), provider.clone(), "llama3.1:8b");

    let first = chat.chat(&ChatRequest::new("conv", "q1")).await.unwrap();
    assert!(first.expired);
    let second = chat.chat(&ChatRequest::new("conv", "q2")).await.unwrap();
    assert!(!second.expired);
    chat.chat(&ChatRequest::new("conv", "q3")).await.unwrap();

    // Bound of 4 keeps only the last two exchanges.
    assert_eq!(
        store.get("conv").await.unwrap(),
        vec![
            Turn::user("q2"),
            Turn::assistant("a2"),
            Turn::user("q3"),
            Turn::assistant("a3"),
        ]
    );

    // The third prompt saw the full history as it stood before the request.
    let third = provider.prompt(2);
    assert!(third.contains("\nUser: q1\nAssistant: a1\nUser: q2\nAssistant: a2\n--- End of History ---"));
}

#[tokio::test]
async fn scraped_page_is_framed_in_prompt_but_not_stored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/release-notes"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body><nav>menu</nav><article>Rust 1.80 adds LazyCell.</article></body></html>",
        ))
        .mount(&server)
        .await;

    let store = store(20);
    let provider = Arc::new(ScriptedProvider::new(&["It adds LazyCell."]));
    let scraper = PageScraper::new(Duration::from_secs(5), 5000, "parley-e2e").unwrap();
    let chat = ChatOrchestrator::new(store.clone(), provider.clone(), "m")
        .with_context_provider(ContextSource::Page, Arc::new(scraper));

    let url = format!("{}/release-notes", server.uri());
    let outcome = chat
        .chat(&ChatRequest::new("s", "What's new?").with_context(&url, None))
        .await
        .unwrap();
    assert_eq!(outcome.reply, "It adds LazyCell.");

    let prompt = provider.prompt(0);
    assert!(prompt.contains("--- Web Page Content ---"));
    assert!(prompt.contains("\nRust 1.80 adds LazyCell.\n--- End of Web Page Content ---"));
    assert!(!prompt.contains("menu"));

    assert_eq!(
        store.get("s").await.unwrap(),
        vec![Turn::user("What's new?"), Turn::assistant("It adds LazyCell.")]
    );
}

#[tokio::test]
async fn failed_scrape_degrades_but_chat_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let provider = Arc::new(ScriptedProvider::new(&["I could not read that page."]));
    let scraper = PageScraper::new(Duration::from_secs(5), 5000, "parley-e2e").unwrap();
    let chat = ChatOrchestrator::new(store(20), provider.clone(), "m")
        .with_context_provider(ContextSource::Page, Arc::new(scraper));

    let url = format!("{}/broken", server.uri());
    let outcome = chat
        .chat(&ChatRequest::new("s", "Summarize").with_context(&url, None))
        .await
        .unwrap();
    assert_eq!(outcome.reply, "I could not read that page.");
    assert!(provider
        .prompt(0)
        .contains(&format!("[Scraping Error: HTTP 500 error for {url}]")));
}

#[tokio::test]
async fn search_results_use_realtime_framing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div class="result"><a class="result__a" href="https://blog.rust-lang.org/">Rust Blog</a>
               <a class="result__snippet">Announcing Rust 1.80</a></div>"#,
        ))
        .mount(&server)
        .await;

    let provider = Arc::new(ScriptedProvider::new(&["Rust 1.80 is out."]));
    let search = WebSearch::new(
        format!("{}/html/", server.uri()),
        5,
        Duration::from_secs(5),
        "parley-e2e",
    )
    .unwrap();
    let chat = ChatOrchestrator::new(store(20), provider.clone(), "m")
        .with_context_provider(ContextSource::Search, Arc::new(search));

    chat.chat(&ChatRequest::new("s", "Latest Rust?").with_context("latest rust release", None))
        .await
        .unwrap();

    let prompt = provider.prompt(0);
    assert!(prompt.contains("--- REAL-TIME SEARCH RESULTS ---"));
    assert!(prompt.contains("1. **Rust Blog**\n   URL: https://blog.rust-lang.org/\n   Announcing Rust 1.80"));
    assert!(prompt.contains("--- END OF SEARCH RESULTS ---"));
}

#[tokio::test(start_paused = true)]
async fn idle_session_expires_and_restarts() {
    let store = store(20);
    let provider = Arc::new(ScriptedProvider::new(&["first", "second"]));
    let chat = ChatOrchestrator::new(store.clone(), provider.clone(), "m");

    chat.chat(&ChatRequest::new("idle", "hello")).await.unwrap();
    tokio::time::advance(Duration::from_secs(599)).await;
    assert!(store.exists("idle").await.unwrap());
    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(!store.exists("idle").await.unwrap());

    let outcome = chat.chat(&ChatRequest::new("idle", "anyone?")).await.unwrap();
    assert!(outcome.expired);
    assert!(!provider.prompt(1).contains("hello"));
}

// ── Over HTTP ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn gateway_full_session_lifecycle() {
    let store = store(20);
    let provider = Arc::new(ScriptedProvider::new(&["Hi!", "Still here."]));
    let chat = Arc::new(ChatOrchestrator::new(store.clone(), provider, "m"));
    let app = build_router(Arc::new(GatewayState::new(chat, AppConfig::default())));

    let post = |uri: &str, body: serde_json::Value| {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    for (message, expired) in [("hello", true), ("you there?", false)] {
        let response = app
            .clone()
            .oneshot(post(
                "/api/llm/chat",
                serde_json::json!({ "session_id": "web", "message": message }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["session_expired"], expired);
    }

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/llm/session/web").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["message_count"], 4);
    assert_eq!(body["history"][1]["role"], "assistant");
    assert_eq!(body["history"][1]["content"], "Hi!");

    let response = app
        .oneshot(post("/api/llm/reset", serde_json::json!({ "session_id": "web" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(store.get("web").await.unwrap().is_empty());
}

// ── Configuration ─────────────────────────────────────────────────────────

#[test]
fn config_file_drives_session_policy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[store]\nbackend = \"memory\"\n\n[session]\nttl_secs = 30\nmax_history_messages = 6\n",
    )
    .unwrap();

    let config = AppConfig::load_from(&path).unwrap();
    let policy = config.session_policy();
    assert_eq!(policy.ttl, Duration::from_secs(30));
    assert_eq!(policy.max_turns, 6);
}

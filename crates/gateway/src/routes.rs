//! HTTP handlers.
//!
//! - `GET  /`                           — service banner
//! - `GET  /api/health`                 — liveness plus store reachability
//! - `POST /api/llm/chat`               — one chat turn
//! - `POST /api/llm/reset`              — drop a session
//! - `GET  /api/llm/session/{id}`       — inspect a session's history

use axum::Json;
use axum::extract::{Path, State};
use parley_chat::{ChatRequest, ContextRequest};
use parley_core::context::ContextSource;
use parley_core::message::Turn;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::SharedState;
use crate::error::ApiError;

// ── Wire types ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize)]
pub struct ChatBody {
    pub session_id: String,
    pub message: String,
    /// Enrich the prompt with `context_ref`.
    #[serde(default, alias = "use_scrape")]
    pub use_context: bool,
    /// A URL to scrape or a query to search.
    #[serde(default, alias = "scrape_url")]
    pub context_ref: Option<String>,
    /// `page` or `search`; inferred from `context_ref` when absent.
    #[serde(default)]
    pub context_source: Option<ContextSource>,
}

impl ChatBody {
    fn into_request(self) -> Result<ChatRequest, ApiError> {
        require_session_id(&self.session_id)?;
        if self.message.trim().is_empty() {
            return Err(ApiError::InvalidRequest("message must not be empty".into()));
        }

        let context = match (self.use_context, self.context_ref) {
            (true, Some(reference)) if !reference.trim().is_empty() => Some(ContextRequest {
                reference,
                source: self.context_source,
            }),
            _ => None,
        };

        Ok(ChatRequest {
            session_id: self.session_id,
            message: self.message,
            context,
        })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ChatReply {
    pub reply: String,
    pub session_expired: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ResetBody {
    pub session_id: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ResetReply {
    pub message: String,
    pub session_id: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct HistoryReply {
    pub session_id: String,
    pub history: Vec<Turn>,
    pub message_count: usize,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct HealthReply {
    pub status: String,
    pub store: bool,
    pub version: String,
    pub uptime_secs: i64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RootReply {
    pub name: String,
    pub version: String,
    pub status: String,
}

fn require_session_id(session_id: &str) -> Result<(), ApiError> {
    if session_id.trim().is_empty() {
        Err(ApiError::InvalidRequest("session_id must not be empty".into()))
    } else {
        Ok(())
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

pub async fn root_handler() -> Json<RootReply> {
    Json(RootReply {
        name: "Parley API".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        status: "running".into(),
    })
}

pub async fn health_handler(State(state): State<SharedState>) -> Json<HealthReply> {
    let store = state
        .orchestrator
        .store()
        .health_check()
        .await
        .unwrap_or(false);

    Json(HealthReply {
        status: "ok".into(),
        store,
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
    })
}

pub async fn chat_handler(
    State(state): State<SharedState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatReply>, ApiError> {
    let request = body.into_request()?;
    info!(
        session_id = %request.session_id,
        with_context = request.context.is_some(),
        "Chat request"
    );

    let outcome = state.orchestrator.chat(&request).await?;
    Ok(Json(ChatReply {
        reply: outcome.reply,
        session_expired: outcome.expired,
    }))
}

pub async fn reset_handler(
    State(state): State<SharedState>,
    Json(body): Json<ResetBody>,
) -> Result<Json<ResetReply>, ApiError> {
    require_session_id(&body.session_id)?;
    state.orchestrator.reset(&body.session_id).await?;

    Ok(Json(ResetReply {
        message: "Session reset successfully".into(),
        session_id: body.session_id,
    }))
}

pub async fn history_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<HistoryReply>, ApiError> {
    let history = state.orchestrator.history(&session_id).await?;

    Ok(Json(HistoryReply {
        message_count: history.len(),
        session_id,
        history,
    }))
}

//! HTTP API gateway for Parley.
//!
//! Exposes the chat, reset and session-inspection endpoints plus health
//! checks. Built on Axum; every request is handled by a shared
//! [`ChatOrchestrator`].

pub mod error;
pub mod routes;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use parley_chat::ChatOrchestrator;
use parley_config::AppConfig;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub config: AppConfig,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl GatewayState {
    pub fn new(orchestrator: Arc<ChatOrchestrator>, config: AppConfig) -> Self {
        Self {
            orchestrator,
            config,
            start_time: chrono::Utc::now(),
        }
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// Layers: CORS from `gateway.cors_origins`, a 1 MB body limit, and HTTP
/// trace logging.
pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.gateway.cors_origins);

    Router::new()
        .route("/", get(routes::root_handler))
        .route("/api/health", get(routes::health_handler))
        .route("/api/llm/chat", post(routes::chat_handler))
        .route("/api/llm/reset", post(routes::reset_handler))
        .route("/api/llm/session/{session_id}", get(routes::history_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    if origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(allowed))
}

/// Wire the session store, inference provider and context providers
/// named in `config` into an orchestrator.
///
/// Fails if the session store cannot be reached.
pub async fn build_orchestrator(config: &AppConfig) -> parley_core::Result<ChatOrchestrator> {
    let store = parley_memory::build_from_config(config).await?;
    let provider = parley_providers::build_from_config(config)?;
    let context_providers = parley_context::build_from_config(config)?;

    Ok(
        ChatOrchestrator::new(store, provider, &config.inference.model)
            .with_sampling(config.inference.sampling())
            .with_context_providers(context_providers),
    )
}

/// Start the gateway HTTP server and run until Ctrl+C.
///
/// The session store handle is closed after the server drains.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    info!(
        inference = %config.inference.base_url,
        model = %config.inference.model,
        store = %config.store.backend,
        ttl_secs = config.session.ttl_secs,
        "Starting Parley gateway"
    );

    let orchestrator = Arc::new(build_orchestrator(&config).await?);
    let store = orchestrator.store().clone();
    let app = build_router(Arc::new(GatewayState::new(orchestrator, config)));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {e}");
            }
        })
        .await?;

    info!("Shutting down gateway");
    if let Err(e) = store.close().await {
        warn!("Failed to close session store: {e}");
    }
    Ok(())
}

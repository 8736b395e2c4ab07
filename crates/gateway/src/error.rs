//! HTTP mapping for chat failures.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use parley_core::error::ChatError;
use serde::{Deserialize, Serialize};

/// Seconds clients are asked to wait before retrying a transient failure.
pub const RETRY_AFTER_SECS: u64 = 5;

/// JSON error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// An error leaving a handler.
#[derive(Debug)]
pub enum ApiError {
    Chat(ChatError),
    InvalidRequest(String),
}

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        Self::Chat(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Chat(ChatError::TransientUpstream(_) | ChatError::BackendUnavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Chat(ChatError::Persistence { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Chat(e) => e.kind(),
            Self::InvalidRequest(_) => "invalid_request",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: match &self {
                Self::Chat(e) => e.to_string(),
                Self::InvalidRequest(msg) => msg.clone(),
            },
            kind: self.kind().to_string(),
        };

        let mut response = (status, Json(body)).into_response();
        if matches!(self, Self::Chat(ChatError::TransientUpstream(_))) {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECS));
        }
        response
    }
}

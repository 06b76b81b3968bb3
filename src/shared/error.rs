//! Application Error Types
//!
//! Centralized error handling with Axum integration, plus the error taxonomy
//! of the real-time gateway path.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("WebSocket upgrade failed: {0}")]
    UpgradeFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, 10001, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, 10002, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, 10003, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, 10004, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, 10007, msg.clone()),
            AppError::UpgradeFailed(msg) => {
                tracing::error!("WebSocket upgrade failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, 10008, "WebSocket upgrade failed".into())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
            }
        };

        let body = ErrorResponse { code, message };

        (status, Json(body)).into_response()
    }
}

/// Errors raised on the real-time path.
///
/// Every variant is local to the connection that produced it: the session
/// that hits one of these logs it and either keeps reading or shuts itself
/// down, but never affects other connections or the dispatcher pool.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Upgrade failed: {0}")]
    UpgradeFailed(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("Chat {0} not found")]
    ChatNotFound(String),

    #[error("User {user_id} is not a participant of chat {chat_id}")]
    NotParticipant { chat_id: String, user_id: String },

    #[error("Persistence error: {0}")]
    Persistence(#[source] AppError),

    #[error("No display record for online users {0:?}")]
    UnresolvedUsers(Vec<String>),

    #[error("Broadcast queue is full")]
    QueueFull,

    #[error("Broadcast dispatcher is closed")]
    DispatcherClosed,
}

impl GatewayError {
    /// Policy violations are dropped quietly; everything else is worth a louder log.
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, Self::ChatNotFound(_) | Self::NotParticipant { .. })
    }
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Unauthenticated(msg) => AppError::Unauthorized(msg),
            GatewayError::UpgradeFailed(msg) => AppError::UpgradeFailed(msg),
            GatewayError::MalformedPayload(e) => AppError::BadRequest(e.to_string()),
            GatewayError::ChatNotFound(_) => AppError::NotFound(e.to_string()),
            GatewayError::NotParticipant { .. } => AppError::Forbidden(e.to_string()),
            GatewayError::Persistence(inner) => inner,
            GatewayError::UnresolvedUsers(_)
            | GatewayError::QueueFull
            | GatewayError::DispatcherClosed => AppError::Internal(e.to_string()),
        }
    }
}

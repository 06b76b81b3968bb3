//! WebSocket Connection Handler
//!
//! Upgrade entry point for the chat gateway. The credential is verified by
//! the `AuthUser` extractor before the upgrade is attempted.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::StreamExt;

use super::connection::{new_connection_id, Connection, WsConnection};
use super::session::{run_session, SessionState};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::{AppError, GatewayError};
use crate::startup::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, AppError> {
    let ws = upgrade.map_err(|e| {
        tracing::warn!(user_id = %auth.user_id, error = %e, "WebSocket upgrade rejected");
        AppError::from(GatewayError::UpgradeFailed(e.to_string()))
    })?;

    let max_message_size = state.settings.websocket.max_message_size;
    let max_frame_size = state.settings.websocket.max_frame_size;
    let user_id = auth.user_id;
    let failed_user = user_id.clone();

    Ok(ws
        .max_message_size(max_message_size)
        .max_frame_size(max_frame_size)
        .on_failed_upgrade(move |e| {
            tracing::error!(user_id = %failed_user, error = %e, "WebSocket upgrade failed");
        })
        .on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState, user_id: String) {
    let connection_id = new_connection_id();
    let mut session = SessionState::new(connection_id.clone());
    session.authenticate(user_id.clone());

    tracing::debug!(user_id = %user_id, connection_id = %connection_id, "New WebSocket connection");

    // Split socket: the write half goes to the registry, the read half stays here
    let (sink, stream) = socket.split();
    let send_timeout = Duration::from_millis(state.settings.websocket.send_timeout_ms);
    let connection: Arc<dyn Connection> = Arc::new(WsConnection::new(
        connection_id,
        user_id,
        sink,
        send_timeout,
    ));

    run_session(state.gateway.clone(), session, connection, stream).await;
}

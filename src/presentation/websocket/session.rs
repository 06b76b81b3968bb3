//! WebSocket Session Management
//!
//! Lifecycle of one connection after its credential has been verified:
//! register presence, announce, read frames until the peer goes away, then
//! clean up on every exit path.

use std::sync::Arc;

use axum::extract::ws::Message as WsMessage;
use chrono::Utc;
use futures::{Stream, StreamExt};

use super::connection::Connection;
use super::gateway::Gateway;
use super::messages::{InboundMessage, PresenceChange};
use crate::domain::NewMessage;
use crate::shared::error::GatewayError;

/// Phases a session moves through, strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionPhase {
    Connecting,
    Authenticated,
    Upgraded,
    Reading,
    Closed,
}

/// Why a session's read loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Close frame received or the stream ended.
    PeerClosed,
    /// The transport reported an error.
    TransportError,
    /// A frame could not be decoded as a chat message.
    MalformedPayload,
}

/// Per-connection session state
#[derive(Debug)]
pub struct SessionState {
    pub connection_id: String,
    pub user_id: String,
    pub phase: SessionPhase,
    pub messages_received: u64,
}

impl SessionState {
    pub fn new(connection_id: String) -> Self {
        Self {
            connection_id,
            user_id: String::new(),
            phase: SessionPhase::Connecting,
            messages_received: 0,
        }
    }

    /// Bind the verified identity to this session.
    pub fn authenticate(&mut self, user_id: impl Into<String>) {
        self.user_id = user_id.into();
        self.advance(SessionPhase::Authenticated);
    }

    pub fn advance(&mut self, next: SessionPhase) {
        debug_assert!(next > self.phase, "session phase moved backwards");
        tracing::trace!(
            connection_id = %self.connection_id,
            from = ?self.phase,
            to = ?next,
            "Session phase change"
        );
        self.phase = next;
    }
}

/// Presence registration held for the lifetime of a session.
///
/// Dropping it without [`Registration::release`] still unregisters the
/// connection, and announces the disconnect on the ambient runtime if the user
/// went offline.
struct Registration {
    gateway: Arc<Gateway>,
    user_id: String,
    connection_id: String,
    released: bool,
}

impl Registration {
    fn new(gateway: Arc<Gateway>, connection: Arc<dyn Connection>) -> Self {
        let user_id = connection.user_id().to_string();
        let connection_id = connection.id().to_string();
        gateway.register(connection);
        Self {
            gateway,
            user_id,
            connection_id,
            released: false,
        }
    }

    /// Unregister and announce the disconnect if this was the last connection.
    async fn release(mut self) {
        self.released = true;
        if self.gateway.unregister(&self.user_id, &self.connection_id) {
            if let Err(e) = self.gateway.announce(PresenceChange::Disconnect).await {
                tracing::warn!(user_id = %self.user_id, error = %e, "Disconnect announcement skipped");
            }
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        tracing::warn!(
            user_id = %self.user_id,
            connection_id = %self.connection_id,
            "Session ended without cleanup, unregistering"
        );
        if !self.gateway.unregister(&self.user_id, &self.connection_id) {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let gateway = self.gateway.clone();
            handle.spawn(async move {
                let _ = gateway.announce(PresenceChange::Disconnect).await;
            });
        }
    }
}

/// Drive one upgraded connection to completion.
///
/// `state` must already be authenticated. `inbound` is the read half of the
/// connection; `connection` is its write half. Cleanup (unregister, disconnect
/// announcement, close frame) runs whatever way the read loop ends.
pub async fn run_session<S>(
    gateway: Arc<Gateway>,
    mut state: SessionState,
    connection: Arc<dyn Connection>,
    mut inbound: S,
) -> SessionOutcome
where
    S: Stream<Item = Result<WsMessage, axum::Error>> + Unpin,
{
    state.advance(SessionPhase::Upgraded);
    let registration = Registration::new(gateway.clone(), connection.clone());
    if let Err(e) = gateway.announce(PresenceChange::Connect).await {
        tracing::warn!(user_id = %state.user_id, error = %e, "Connect announcement skipped");
    }

    state.advance(SessionPhase::Reading);
    let outcome = read_loop(&gateway, &mut state, &mut inbound).await;

    state.advance(SessionPhase::Closed);
    registration.release().await;
    if let Err(e) = connection.close().await {
        tracing::debug!(connection_id = %state.connection_id, error = %e, "Close frame not sent");
    }

    tracing::info!(
        user_id = %state.user_id,
        connection_id = %state.connection_id,
        messages = state.messages_received,
        outcome = ?outcome,
        "Session closed"
    );
    outcome
}

async fn read_loop<S>(gateway: &Gateway, state: &mut SessionState, inbound: &mut S) -> SessionOutcome
where
    S: Stream<Item = Result<WsMessage, axum::Error>> + Unpin,
{
    while let Some(frame) = inbound.next().await {
        let decoded = match frame {
            Ok(WsMessage::Text(text)) => serde_json::from_str::<InboundMessage>(text.as_str()),
            Ok(WsMessage::Binary(bytes)) => serde_json::from_slice::<InboundMessage>(&bytes),
            Ok(WsMessage::Close(_)) => return SessionOutcome::PeerClosed,
            Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) => continue,
            Err(e) => {
                tracing::debug!(connection_id = %state.connection_id, error = %e, "Read error");
                return SessionOutcome::TransportError;
            }
        };

        let inbound = match decoded {
            Ok(inbound) => inbound,
            Err(e) => {
                let error = GatewayError::from(e);
                tracing::warn!(
                    user_id = %state.user_id,
                    connection_id = %state.connection_id,
                    error = %error,
                    "Terminating connection"
                );
                return SessionOutcome::MalformedPayload;
            }
        };

        state.messages_received += 1;
        let message = NewMessage::stamp(
            inbound.chat_id,
            inbound.content,
            state.user_id.clone(),
            Utc::now(),
        );

        match gateway.deliver(message).await {
            Ok(_) => {}
            Err(e) if e.is_policy_violation() => {
                tracing::debug!(user_id = %state.user_id, error = %e, "Message dropped");
            }
            Err(e) => {
                tracing::warn!(user_id = %state.user_id, error = %e, "Message not delivered");
            }
        }
    }

    SessionOutcome::PeerClosed
}

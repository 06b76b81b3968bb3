//! Connection Abstraction
//!
//! One live duplex channel (a browser tab or device). The read half is owned
//! by the session's read loop; the write half sits behind this trait so the
//! presence registry and dispatcher workers can push frames to it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures::stream::SplitSink;
use futures::SinkExt;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use super::messages::OutboundFrame;

/// Errors raised while writing to a connection
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Failed to serialize frame: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Send timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection closed")]
    Closed,
}

/// Write side of one duplex channel.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Per-connection unique id.
    fn id(&self) -> &str;

    /// Identity the connection was authenticated as.
    fn user_id(&self) -> &str;

    /// Send one framed payload.
    async fn send(&self, frame: &OutboundFrame) -> Result<(), ConnectionError>;

    /// Send a close frame and release the channel.
    async fn close(&self) -> Result<(), ConnectionError>;
}

/// Generate a connection id from 128 bits of OS randomness.
pub fn new_connection_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// WebSocket-backed connection.
///
/// Sends are serialized through a mutex over the sink half and bounded by a
/// timeout so one stalled peer cannot hold a dispatcher worker indefinitely.
pub struct WsConnection {
    id: String,
    user_id: String,
    sink: Mutex<SplitSink<WebSocket, Message>>,
    send_timeout: Duration,
}

impl WsConnection {
    pub fn new(
        id: String,
        user_id: String,
        sink: SplitSink<WebSocket, Message>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            id,
            user_id,
            sink: Mutex::new(sink),
            send_timeout,
        }
    }

    async fn send_message(&self, message: Message) -> Result<(), ConnectionError> {
        let send = async move {
            let mut sink = self.sink.lock().await;
            sink.send(message).await
        };

        match tokio::time::timeout(self.send_timeout, send).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ConnectionError::Transport(e.to_string())),
            Err(_) => Err(ConnectionError::Timeout(self.send_timeout)),
        }
    }
}

#[async_trait]
impl Connection for WsConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn send(&self, frame: &OutboundFrame) -> Result<(), ConnectionError> {
        let text = frame.to_text()?;
        self.send_message(Message::Text(text.into())).await
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        let frame = CloseFrame {
            code: close_code::NORMAL,
            reason: "".into(),
        };
        let sent = self.send_message(Message::Close(Some(frame))).await;

        let mut sink = self.sink.lock().await;
        let closed = sink
            .close()
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()));

        sent.and(closed)
    }
}

/// Connection backed by an in-process channel.
///
/// Each sent frame arrives on the paired receiver as serialized JSON text.
/// Useful for in-process consumers and for exercising the gateway without a
/// network socket.
pub struct ChannelConnection {
    id: String,
    user_id: String,
    tx: mpsc::UnboundedSender<String>,
    closed: AtomicBool,
}

impl ChannelConnection {
    pub fn new(user_id: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = Self {
            id: new_connection_id(),
            user_id: user_id.into(),
            tx,
            closed: AtomicBool::new(false),
        };
        (connection, rx)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Connection for ChannelConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn send(&self, frame: &OutboundFrame) -> Result<(), ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }
        let text = frame.to_text()?;
        self.tx.send(text).map_err(|_| ConnectionError::Closed)
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(ConnectionError::Closed);
        }
        Ok(())
    }
}

//! WebSocket Message Types
//!
//! Wire formats exchanged with clients. Every outbound frame carries a `type`
//! field: `connect` / `disconnect` for presence updates, `message` for chat
//! messages.

use serde::{Deserialize, Serialize};

use crate::domain::{Message, UserDisplay};

/// Chat message as sent by a client.
///
/// Server-owned fields (`id`, `sender`, `sent_at`, `type`) are ignored if a
/// client supplies them; they are stamped on receipt.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub chat_id: String,
    pub content: String,
}

/// Kind of presence change being announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceChange {
    Connect,
    Disconnect,
}

impl PresenceChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
        }
    }
}

/// Presence update listing everyone currently online.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatusMessage {
    #[serde(rename = "type")]
    pub change: PresenceChange,
    pub online_users: Vec<UserDisplay>,
}

/// A payload headed for one or more connections.
///
/// Both variants serialize their own `type` discriminant, so the wire shape is
/// flat: `{"type":"connect","online_users":[..]}` or
/// `{"type":"message","id":..,"chat_id":..,..}`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OutboundFrame {
    ConnectionStatus(ConnectionStatusMessage),
    Chat(Message),
}

impl OutboundFrame {
    /// The discriminant written to the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionStatus(status) => status.change.as_str(),
            Self::Chat(message) => message.kind.as_str(),
        }
    }

    /// Serialize for a text frame.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

//! Message entity.
//!
//! Maps to the `messages` table in the database schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a persisted message.
///
/// Serialized as the `type` field so chat frames carry the same discriminant
/// as presence frames on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// A regular user message
    #[default]
    Message,
}

impl MessageKind {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "message" => Self::Message,
            other => {
                tracing::warn!(kind = other, "Unknown message kind, reading as message");
                Self::Message
            }
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A message that has been stamped by the server but not yet persisted.
///
/// The store assigns the id when it saves one of these.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub chat_id: String,
    pub sender: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub kind: MessageKind,
}

impl NewMessage {
    /// Apply the server-side fields to client-supplied content.
    pub fn stamp(
        chat_id: impl Into<String>,
        content: impl Into<String>,
        sender: impl Into<String>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            chat_id: chat_id.into(),
            sender: sender.into(),
            content: content.into(),
            sent_at,
            kind: MessageKind::Message,
        }
    }

    /// Attach the store-assigned id.
    pub fn into_message(self, id: String) -> Message {
        Message {
            id,
            chat_id: self.chat_id,
            sender: self.sender,
            content: self.content,
            sent_at: self.sent_at,
            kind: self.kind,
        }
    }
}

/// A persisted message. Immutable once stored.
///
/// Maps to the `messages` table:
/// - id: TEXT PRIMARY KEY (store-assigned)
/// - chat_id: TEXT NOT NULL REFERENCES chats(id)
/// - sender: TEXT NOT NULL
/// - content: TEXT NOT NULL
/// - sent_at: TIMESTAMPTZ NOT NULL
/// - kind: TEXT NOT NULL DEFAULT 'message'
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub sender: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

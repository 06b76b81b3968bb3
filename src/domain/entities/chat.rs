//! Chat entity.
//!
//! Maps to the `chats` table in the database schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::Message;

/// Represents a direct chat between two users.
///
/// Maps to the `chats` table:
/// - id: TEXT PRIMARY KEY
/// - users: TEXT[] NOT NULL (participants, fixed at creation)
/// - created_by: TEXT NOT NULL
/// - created_at: TIMESTAMPTZ NOT NULL
/// - count_messages: BIGINT NOT NULL DEFAULT 0
/// - last_message / last_message_id / last_message_by / last_message_at: nullable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,

    /// Participant ids. Never modified after creation.
    pub users: Vec<String>,

    pub created_by: String,

    pub created_at: DateTime<Utc>,

    /// Number of messages persisted in this chat. Only ever grows.
    pub count_messages: i64,

    pub last_message: Option<String>,

    pub last_message_id: Option<String>,

    pub last_message_by: Option<String>,

    pub last_message_at: Option<DateTime<Utc>>,
}

impl Chat {
    /// Check whether a user takes part in this chat.
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.users.iter().any(|u| u == user_id)
    }

    /// Participants other than `sender`.
    pub fn recipients_excluding(&self, sender: &str) -> Vec<String> {
        self.users
            .iter()
            .filter(|u| u.as_str() != sender)
            .cloned()
            .collect()
    }

    /// The participant who is not `user_id`, if any.
    pub fn counterpart(&self, user_id: &str) -> Option<&str> {
        self.users
            .iter()
            .map(String::as_str)
            .find(|u| *u != user_id)
    }

    /// Point the last-message fields at `message` and bump the counter.
    pub fn record_message(&mut self, message: &Message) {
        self.last_message = Some(message.content.clone());
        self.last_message_id = Some(message.id.clone());
        self.last_message_by = Some(message.sender.clone());
        self.last_message_at = Some(message.sent_at);
        self.count_messages += 1;
    }
}

/// A chat that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChat {
    pub users: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl NewChat {
    /// A two-party chat opened by `creator` with `other`.
    pub fn direct(creator: impl Into<String>, other: impl Into<String>) -> Self {
        let creator = creator.into();
        Self {
            users: vec![creator.clone(), other.into()],
            created_by: creator,
            created_at: Utc::now(),
        }
    }

    /// Attach the store-assigned id.
    pub fn into_chat(self, id: String) -> Chat {
        Chat {
            id,
            users: self.users,
            created_by: self.created_by,
            created_at: self.created_at,
            count_messages: 0,
            last_message: None,
            last_message_id: None,
            last_message_by: None,
            last_message_at: None,
        }
    }
}

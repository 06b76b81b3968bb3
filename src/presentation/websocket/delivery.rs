//! Chat Delivery Pipeline
//!
//! Takes a stamped message from a session and runs it through
//! lookup, participant check, persistence, chat metadata update and fan-out
//! to the other participants' connections.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tokio::sync::{Mutex, MutexGuard};

use super::gateway::{Delivery, Gateway};
use super::messages::OutboundFrame;
use crate::domain::{Chat, Message, NewMessage};
use crate::infrastructure::metrics;
use crate::shared::error::GatewayError;

const CHAT_LOCK_STRIPES: usize = 64;

/// Striped locks keyed by chat id.
///
/// Serializes the read-modify-write of a chat's last-message fields and
/// counter so concurrent senders in the same chat cannot lose updates.
pub struct ChatLocks {
    stripes: Vec<Mutex<()>>,
}

impl ChatLocks {
    pub fn new() -> Self {
        Self {
            stripes: (0..CHAT_LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    pub async fn lock(&self, chat_id: &str) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        chat_id.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.stripes.len();
        self.stripes[index].lock().await
    }
}

impl Default for ChatLocks {
    fn default() -> Self {
        Self::new()
    }
}

impl Gateway {
    /// Persist a stamped message and fan it out to the other participants.
    ///
    /// Nothing is broadcast unless both the message and the chat update were
    /// persisted. The sender's own connections never receive the message.
    pub async fn deliver(&self, message: NewMessage) -> Result<Delivery, GatewayError> {
        let persisted = self.persist(message).await;

        let (chat, message) = match persisted {
            Ok(persisted) => persisted,
            Err(e) => {
                metrics::record_message(if e.is_policy_violation() {
                    "rejected"
                } else {
                    "failed"
                });
                return Err(e);
            }
        };

        let targets = chat
            .recipients_excluding(&message.sender)
            .iter()
            .flat_map(|recipient| self.registry().connections_for(recipient))
            .collect();
        let fan_out = self.fan_out(OutboundFrame::Chat(message.clone()), targets);

        metrics::record_message("delivered");
        tracing::debug!(
            chat_id = %message.chat_id,
            message_id = %message.id,
            sender = %message.sender,
            enqueued = fan_out.enqueued,
            dropped = fan_out.dropped,
            "Message delivered"
        );

        Ok(Delivery { message, fan_out })
    }

    async fn persist(&self, message: NewMessage) -> Result<(Chat, Message), GatewayError> {
        let _guard = self.chat_locks.lock(&message.chat_id).await;

        let mut chat = self
            .store()
            .find_chat(&message.chat_id)
            .await
            .map_err(GatewayError::Persistence)?
            .ok_or_else(|| GatewayError::ChatNotFound(message.chat_id.clone()))?;

        if !chat.is_participant(&message.sender) {
            return Err(GatewayError::NotParticipant {
                chat_id: chat.id,
                user_id: message.sender,
            });
        }

        let saved = self
            .store()
            .save_message(&message)
            .await
            .map_err(GatewayError::Persistence)?;

        chat.record_message(&saved);
        if let Err(e) = self.store().update_chat(&chat).await {
            tracing::error!(
                chat_id = %chat.id,
                message_id = %saved.id,
                error = %e,
                "Message persisted but chat metadata update failed"
            );
            return Err(GatewayError::Persistence(e));
        }

        Ok((chat, saved))
    }
}

//! In-Memory Chat Store
//!
//! Process-local store with the same semantics as the PostgreSQL one. Backs
//! `store.backend = "memory"` and the test suites.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::domain::store::total_pages;
use crate::domain::{Chat, ChatStore, Message, NewChat, NewMessage, UserDisplay};
use crate::shared::error::AppError;

/// In-memory chat store.
#[derive(Default)]
pub struct MemoryChatStore {
    users: DashMap<String, UserDisplay>,
    chats: DashMap<String, Chat>,
    messages: RwLock<Vec<Message>>,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with display records.
    pub fn with_users(users: impl IntoIterator<Item = UserDisplay>) -> Self {
        let store = Self::new();
        for user in users {
            store.insert_user(user);
        }
        store
    }

    /// Add or replace a user's display record.
    pub fn insert_user(&self, user: UserDisplay) {
        self.users.insert(user.id.clone(), user);
    }

    /// Insert a chat under a caller-chosen id.
    pub fn insert_chat(&self, chat: Chat) {
        self.chats.insert(chat.id.clone(), chat);
    }

    /// Number of stored messages for a chat.
    pub fn message_count(&self, chat_id: &str) -> usize {
        self.messages
            .read()
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .count()
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn find_chat(&self, id: &str) -> Result<Option<Chat>, AppError> {
        Ok(self.chats.get(id).map(|c| c.value().clone()))
    }

    async fn find_chat_by_participants(
        &self,
        participants: &[String],
    ) -> Result<Option<Chat>, AppError> {
        Ok(self
            .chats
            .iter()
            .find(|c| participants.iter().all(|p| c.is_participant(p)))
            .map(|c| c.value().clone()))
    }

    async fn list_chats_for(&self, user_id: &str) -> Result<Vec<Chat>, AppError> {
        let mut chats: Vec<Chat> = self
            .chats
            .iter()
            .filter(|c| c.is_participant(user_id))
            .map(|c| c.value().clone())
            .collect();
        chats.sort_by_key(|c| std::cmp::Reverse(c.last_message_at.unwrap_or(c.created_at)));
        Ok(chats)
    }

    async fn create_chat(&self, chat: &NewChat) -> Result<Chat, AppError> {
        let chat = chat.clone().into_chat(Uuid::now_v7().to_string());
        self.chats.insert(chat.id.clone(), chat.clone());
        Ok(chat)
    }

    async fn update_chat(&self, chat: &Chat) -> Result<(), AppError> {
        let mut stored = self
            .chats
            .get_mut(&chat.id)
            .ok_or_else(|| AppError::NotFound(format!("Chat {} not found", chat.id)))?;

        stored.last_message = chat.last_message.clone();
        stored.last_message_id = chat.last_message_id.clone();
        stored.last_message_by = chat.last_message_by.clone();
        stored.last_message_at = chat.last_message_at;
        stored.count_messages = chat.count_messages;
        Ok(())
    }

    async fn save_message(&self, message: &NewMessage) -> Result<Message, AppError> {
        let message = message.clone().into_message(Uuid::now_v7().to_string());
        self.messages.write().push(message.clone());
        Ok(message)
    }

    async fn list_messages(
        &self,
        chat_id: &str,
        limit: u32,
        page: u32,
    ) -> Result<(Vec<Message>, u64), AppError> {
        let limit = limit.max(1) as usize;
        let skip = (page.max(1) as usize - 1) * limit;

        let mut messages: Vec<Message> = self
            .messages
            .read()
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect();
        let total = messages.len() as u64;

        // Newest first; ids break ties between messages stamped in the same instant.
        messages.sort_by(|a, b| b.sent_at.cmp(&a.sent_at).then_with(|| b.id.cmp(&a.id)));
        let page = messages.into_iter().skip(skip).take(limit).collect();

        Ok((page, total_pages(total, limit as u32)))
    }

    async fn find_user(&self, id: &str) -> Result<Option<UserDisplay>, AppError> {
        Ok(self.users.get(id).map(|u| u.value().clone()))
    }

    async fn resolve_users(&self, ids: &[String]) -> Result<Vec<UserDisplay>, AppError> {
        let mut users: Vec<UserDisplay> = ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| u.value().clone()))
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

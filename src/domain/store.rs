//! Chat store contract.
//!
//! The store is a simple document store over users, chats and messages. It is
//! responsible for its own concurrent-write safety; callers never hold a
//! transaction across operations.

use async_trait::async_trait;

use super::entities::{Chat, Message, NewChat, NewMessage, UserDisplay};
use crate::shared::error::AppError;

/// Data access contract consumed by the gateway and the chat service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Find a chat by id.
    async fn find_chat(&self, id: &str) -> Result<Option<Chat>, AppError>;

    /// Find the chat whose participants include every id in `participants`.
    async fn find_chat_by_participants(
        &self,
        participants: &[String],
    ) -> Result<Option<Chat>, AppError>;

    /// All chats a user takes part in.
    async fn list_chats_for(&self, user_id: &str) -> Result<Vec<Chat>, AppError>;

    /// Persist a new chat and return it with its assigned id.
    async fn create_chat(&self, chat: &NewChat) -> Result<Chat, AppError>;

    /// Persist the last-message metadata and counter of a chat.
    async fn update_chat(&self, chat: &Chat) -> Result<(), AppError>;

    /// Persist a message and return it with its assigned id.
    async fn save_message(&self, message: &NewMessage) -> Result<Message, AppError>;

    /// One page of a chat's history, newest first, with the total page count.
    ///
    /// Pages are 1-based; `total_pages = ceil(total / limit)`.
    async fn list_messages(
        &self,
        chat_id: &str,
        limit: u32,
        page: u32,
    ) -> Result<(Vec<Message>, u64), AppError>;

    /// Find one user's display record.
    async fn find_user(&self, id: &str) -> Result<Option<UserDisplay>, AppError>;

    /// Resolve display records for a set of ids. Unknown ids are skipped.
    async fn resolve_users(&self, ids: &[String]) -> Result<Vec<UserDisplay>, AppError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), AppError>;
}

/// Number of pages needed for `total` items at `limit` per page.
pub fn total_pages(total: u64, limit: u32) -> u64 {
    let limit = u64::from(limit.max(1));
    total.div_ceil(limit)
}

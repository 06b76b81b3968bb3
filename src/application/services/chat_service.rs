//! Chat Service
//!
//! REST-side chat operations: listing and opening direct chats, paging
//! through history and listing who is online.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::dto::{ChatResponse, MessagePageResponse};
use crate::domain::{Chat, ChatStore, NewChat, UserDisplay};
use crate::shared::error::AppError;

/// Chat service trait
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Chats the caller takes part in
    async fn list_chats(&self, caller: &str) -> Result<Vec<ChatResponse>, ChatError>;

    /// One chat the caller takes part in
    async fn get_chat(&self, caller: &str, chat_id: &str) -> Result<ChatResponse, ChatError>;

    /// Open a direct chat with `other`. Returns the chat and whether it was newly created.
    async fn create_chat(&self, caller: &str, other: &str) -> Result<(ChatResponse, bool), ChatError>;

    /// One page of a chat's history, newest first
    async fn history(
        &self,
        caller: &str,
        chat_id: &str,
        limit: u32,
        page: u32,
    ) -> Result<MessagePageResponse, ChatError>;

    /// Display records for `online`, minus the caller
    async fn online_users(&self, caller: &str, online: Vec<String>) -> Result<Vec<UserDisplay>, ChatError>;
}

/// Chat service errors
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Chat not found")]
    NotFound,

    #[error("Not a participant of this chat")]
    NotParticipant,

    #[error("user_id cannot be empty")]
    EmptyUserId,

    #[error("Cannot create a chat with yourself")]
    SelfChat,

    #[error("Cannot find user to create chat with")]
    UserNotFound,

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::NotFound | ChatError::UserNotFound => AppError::NotFound(e.to_string()),
            ChatError::NotParticipant => AppError::Forbidden(e.to_string()),
            ChatError::EmptyUserId | ChatError::SelfChat => AppError::BadRequest(e.to_string()),
            ChatError::Store(inner) => inner,
        }
    }
}

/// Chat service backed by a chat store
pub struct ChatServiceImpl {
    store: Arc<dyn ChatStore>,
}

impl ChatServiceImpl {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    async fn with_user_data(&self, caller: &str, chat: Chat) -> Result<ChatResponse, ChatError> {
        let user_data = match chat.counterpart(caller) {
            Some(other) => self.store.find_user(other).await?,
            None => None,
        };
        Ok(ChatResponse { chat, user_data })
    }

    async fn participant_chat(&self, caller: &str, chat_id: &str) -> Result<Chat, ChatError> {
        let chat = self
            .store
            .find_chat(chat_id)
            .await?
            .ok_or(ChatError::NotFound)?;

        if !chat.is_participant(caller) {
            return Err(ChatError::NotParticipant);
        }
        Ok(chat)
    }
}

#[async_trait]
impl ChatService for ChatServiceImpl {
    async fn list_chats(&self, caller: &str) -> Result<Vec<ChatResponse>, ChatError> {
        let chats = self.store.list_chats_for(caller).await?;

        let counterparts: Vec<String> = chats
            .iter()
            .filter_map(|c| c.counterpart(caller).map(str::to_string))
            .collect();
        let users = self.store.resolve_users(&counterparts).await?;

        Ok(chats
            .into_iter()
            .map(|chat| {
                let user_data = chat
                    .counterpart(caller)
                    .and_then(|other| users.iter().find(|u| u.id == other).cloned());
                ChatResponse { chat, user_data }
            })
            .collect())
    }

    async fn get_chat(&self, caller: &str, chat_id: &str) -> Result<ChatResponse, ChatError> {
        let chat = self.participant_chat(caller, chat_id).await?;
        self.with_user_data(caller, chat).await
    }

    async fn create_chat(&self, caller: &str, other: &str) -> Result<(ChatResponse, bool), ChatError> {
        let other = other.trim();
        if other.is_empty() {
            return Err(ChatError::EmptyUserId);
        }
        if other == caller {
            return Err(ChatError::SelfChat);
        }
        if self.store.find_user(other).await?.is_none() {
            return Err(ChatError::UserNotFound);
        }

        let pair = [caller.to_string(), other.to_string()];
        if let Some(existing) = self.store.find_chat_by_participants(&pair).await? {
            return Ok((self.with_user_data(caller, existing).await?, false));
        }

        let chat = self.store.create_chat(&NewChat::direct(caller, other)).await?;
        tracing::info!(chat_id = %chat.id, created_by = %caller, "Chat created");

        Ok((self.with_user_data(caller, chat).await?, true))
    }

    async fn history(
        &self,
        caller: &str,
        chat_id: &str,
        limit: u32,
        page: u32,
    ) -> Result<MessagePageResponse, ChatError> {
        self.participant_chat(caller, chat_id).await?;

        let (messages, total_pages) = self.store.list_messages(chat_id, limit, page).await?;
        Ok(MessagePageResponse {
            messages,
            total_pages,
        })
    }

    async fn online_users(&self, caller: &str, online: Vec<String>) -> Result<Vec<UserDisplay>, ChatError> {
        let others: Vec<String> = online.into_iter().filter(|id| id != caller).collect();
        if others.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.store.resolve_users(&others).await?)
    }
}

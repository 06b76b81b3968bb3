//! Response DTOs
//!
//! Data structures for API response bodies.

use serde::Serialize;

use crate::domain::{Chat, Message, UserDisplay};

/// Chat as seen by one participant, with the other participant's display record
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    #[serde(flatten)]
    pub chat: Chat,
    pub user_data: Option<UserDisplay>,
}

/// One page of chat history
#[derive(Debug, Serialize)]
pub struct MessagePageResponse {
    pub messages: Vec<Message>,
    pub total_pages: u64,
}

/// Users currently online
#[derive(Debug, Serialize)]
pub struct OnlineUsersResponse {
    pub online_users: Vec<UserDisplay>,
}

//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **ChatService**: Direct chats, message history and online users

pub mod chat_service;

pub use chat_service::{ChatError, ChatService, ChatServiceImpl};

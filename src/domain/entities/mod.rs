//! # Domain Entities
//!
//! Core domain entities of the chat relay.
//!
//! - **Chat**: a two-party conversation with last-message metadata
//! - **Message**: a persisted chat message
//! - **UserDisplay**: the public view of a user used in presence updates

mod chat;
mod message;
mod user;

pub use chat::{Chat, NewChat};
pub use message::{Message, MessageKind, NewMessage};
pub use user::UserDisplay;

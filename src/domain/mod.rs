//! # Domain Layer
//!
//! Chat and message entities plus the store contract they are persisted
//! through. Independent of the transport and of any concrete database.

pub mod entities;
pub mod store;

// Re-export commonly used types
pub use entities::*;
pub use store::ChatStore;

#[cfg(test)]
pub use store::MockChatStore;

//! Repository Implementations
//!
//! Implementations of the domain `ChatStore` contract.
//!
//! - **PgChatStore** - PostgreSQL-backed store for production
//! - **MemoryChatStore** - process-local store for development and tests
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chat_relay::domain::ChatStore;
//! use chat_relay::infrastructure::repositories::PgChatStore;
//!
//! let store: Arc<dyn ChatStore> = Arc::new(PgChatStore::new(pool));
//! ```

pub mod chat_store;
pub mod memory_store;

pub use chat_store::PgChatStore;
pub use memory_store::MemoryChatStore;

//! # Chat Relay Library
//!
//! Real-time fan-out engine for one-to-one chats:
//! - WebSocket gateway delivering chat messages to every live connection of
//!   the recipients, plus online-presence announcements
//! - Bounded broadcast queue drained by a worker pool
//! - RESTful HTTP API for chats, history and online users
//! - PostgreSQL (or in-memory) chat store
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Chat and message entities, the chat store contract
//! - **Application Layer**: Chat service and DTOs
//! - **Infrastructure Layer**: Store implementations, database pool, metrics
//! - **Presentation Layer**: HTTP handlers, authentication and the WebSocket gateway
//!
//! ## Module Structure
//!
//! ```text
//! chat_relay/
//! +-- config/         Configuration management
//! +-- domain/         Entities and the ChatStore trait
//! +-- application/    Application services and DTOs
//! +-- infrastructure/ Store implementations and metrics
//! +-- presentation/   HTTP routes, auth and WebSocket gateway
//! +-- shared/         Error types
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;

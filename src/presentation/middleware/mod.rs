//! Middleware
//!
//! Authentication extractor and tower layers for request processing.

pub mod auth;
pub mod cors;
pub mod logging;

pub use auth::{resolve_token, AuthUser, Claims, JwtVerifier, TokenVerifier};

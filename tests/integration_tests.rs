//! Integration Tests Entry Point
//!
//! This file serves as the entry point for integration tests.
//! Tests are organized by module:
//! - `api/` - REST and gateway endpoint tests
//! - `common/` - Shared test utilities

mod api;
mod common;

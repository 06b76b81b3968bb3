//! REST and gateway endpoint tests

mod chat_tests;
mod gateway_tests;
mod health_tests;

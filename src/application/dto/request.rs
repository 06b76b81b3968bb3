//! Request DTOs
//!
//! Data structures for API request bodies and query strings.

use serde::Deserialize;
use validator::Validate;

/// Create direct chat request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateChatRequest {
    #[validate(length(min = 1, message = "user_id cannot be empty"))]
    pub user_id: String,
}

/// Message history query (`?limit=20&page=1`)
#[derive(Debug, Deserialize, Validate)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 99, message = "Limit should be > 0 and < 100"))]
    pub limit: u32,

    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "Page should be > 0"))]
    pub page: u32,
}

fn default_limit() -> u32 {
    20
}

fn default_page() -> u32 {
    1
}

//! User display record.
//!
//! Accounts, credentials and registration live outside this service; the
//! gateway only needs enough to show who is online.

use serde::{Deserialize, Serialize};

/// Public view of a user, as resolved from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDisplay {
    pub id: String,
    pub username: String,
}

impl UserDisplay {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

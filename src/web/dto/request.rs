//! Request DTOs for the REST API.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

/// Share a file with a user.
#[derive(Debug, Deserialize, Validate)]
pub struct ShareWithUserRequest {
    /// Recipient user ID.
    #[validate(range(min = 1))]
    pub user_id: i64,
    /// "read", "write" or "admin".
    #[validate(length(min = 1, max = 16))]
    pub permission: String,
    /// Optional expiry (RFC 3339).
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Create a public link.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLinkRequest {
    /// "read", "write" or "admin".
    #[validate(length(min = 1, max = 16))]
    pub permission: String,
    /// Optional expiry (RFC 3339).
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

//! Identity collaborator for Nimbus.
//!
//! The sharing core never parses credentials or reads request state itself.
//! Callers resolve a credential into a [`Principal`] through an
//! [`IdentityProvider`] and pass it explicitly into every authorization call.

mod jwt;

pub use jwt::{Claims, JwtIdentityProvider};

use async_trait::async_trait;
use serde::Serialize;

use crate::db::User;
use crate::Result;

/// The authenticated identity attempting an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Principal {
    /// Stable user identifier.
    pub user_id: i64,
}

impl Principal {
    /// Create a principal for the given user.
    pub fn new(user_id: i64) -> Self {
        Self { user_id }
    }
}

/// Display details of a user, as shown to a file owner listing its shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    /// User ID.
    pub id: i64,
    /// Username.
    pub username: String,
    /// Email address.
    pub email: Option<String>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

/// Resolves credentials and answers questions about user accounts.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a presented credential to a user identifier.
    ///
    /// Returns `None` for malformed, expired or unknown credentials.
    async fn resolve_principal(&self, credential: &str) -> Result<Option<Principal>>;

    /// Check whether a user account exists.
    async fn user_exists(&self, user_id: i64) -> Result<bool>;

    /// Display details for a user, if the account exists.
    async fn describe_user(&self, user_id: i64) -> Result<Option<UserSummary>>;
}

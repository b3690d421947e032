//! User model for Nimbus.
//!
//! Accounts are owned by the identity collaborator; the sharing core only
//! needs their ids and display details.

/// User entity representing a registered user.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Login username (unique, case-insensitive).
    pub username: String,
    /// Email address (optional).
    pub email: Option<String>,
    /// Account creation timestamp.
    pub created_at: String,
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login username.
    pub username: String,
    /// Email address (optional).
    pub email: Option<String>,
}

impl NewUser {
    /// Create a new user with minimal required fields.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: None,
        }
    }

    /// Set the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_builder() {
        let user = NewUser::new("alice").with_email("alice@example.com");

        assert_eq!(user.username, "alice");
        assert_eq!(user.email, Some("alice@example.com".to_string()));
    }

    #[test]
    fn test_new_user_without_email() {
        let user = NewUser::new("bob");
        assert!(user.email.is_none());
    }
}

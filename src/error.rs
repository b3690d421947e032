//! Error types for Nimbus.

use thiserror::Error;

/// Common error type for Nimbus.
///
/// The sharing kinds are returned as typed results to the route layer, which
/// picks an HTTP status from the variant. `FileNotFound` and `ShareNotFound`
/// deliberately cover "absent", "deleted" and "not yours" alike.
#[derive(Error, Debug)]
pub enum NimbusError {
    /// File missing, soft-deleted, or not owned by the caller.
    #[error("file not found")]
    FileNotFound,

    /// Share recipient does not exist.
    #[error("user not found")]
    UserNotFound,

    /// Permission string outside read / write / admin.
    #[error("invalid permission: {0}")]
    InvalidPermission(String),

    /// Token missing, expired or pointing at a deleted file; or a grant id that
    /// is missing or not created by the caller.
    #[error("share not found")]
    ShareNotFound,

    /// Every token attempt collided with an existing or retired token.
    #[error("could not generate a unique share token")]
    TokenGenerationFailed,

    /// Reserved for stricter checks on public-link resolution.
    #[error("unauthorized")]
    Unauthorized,

    /// The durable store could not be reached or failed internally.
    ///
    /// Errors from sqlx are automatically converted.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A stored row could not be decoded. Not transient, so never retried.
    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error (missing or malformed credential).
    #[error("authentication error: {0}")]
    Auth(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl NimbusError {
    /// Whether the caller may retry the failed operation once.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NimbusError::StorageUnavailable(_))
    }

    /// Whether the error is one of the not-found kinds that must look
    /// identical to an outside observer.
    pub fn is_concealed_not_found(&self) -> bool {
        matches!(
            self,
            NimbusError::FileNotFound | NimbusError::ShareNotFound | NimbusError::Unauthorized
        )
    }
}

// Conversion from sqlx errors
impl From<sqlx::Error> for NimbusError {
    fn from(e: sqlx::Error) -> Self {
        NimbusError::StorageUnavailable(e.to_string())
    }
}

/// Result type alias for Nimbus operations.
pub type Result<T> = std::result::Result<T, NimbusError>;

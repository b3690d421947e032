//! API error handling for the Nimbus REST API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::NimbusError;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad request (400).
    BadRequest,
    /// Unauthorized (401).
    Unauthorized,
    /// Not found (404).
    NotFound,
    /// Unprocessable entity (422).
    UnprocessableEntity,
    /// Internal server error (500).
    InternalError,
    /// Service unavailable (503).
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error details.
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create an unprocessable entity error.
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnprocessableEntity, message)
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Create a service unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Create a 422 naming every field that failed validation.
    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors.field_errors().keys().map(|f| f.to_string()).collect();
        fields.sort_unstable();

        Self::unprocessable(format!("invalid fields: {}", fields.join(", ")))
    }

    /// The error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The client-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<NimbusError> for ApiError {
    fn from(err: NimbusError) -> Self {
        match &err {
            // Absent, deleted and forbidden must be indistinguishable.
            e if e.is_concealed_not_found() => ApiError::not_found("not found"),
            NimbusError::UserNotFound => ApiError::not_found("user not found"),
            NimbusError::InvalidPermission(p) => {
                ApiError::unprocessable(format!("invalid permission: {p}"))
            }
            NimbusError::Validation(msg) => ApiError::unprocessable(msg.clone()),
            NimbusError::Auth(msg) => ApiError::unauthorized(msg.clone()),
            NimbusError::StorageUnavailable(_) => {
                tracing::error!("Storage unavailable: {}", err);
                ApiError::unavailable("storage unavailable")
            }
            _ => {
                tracing::error!("Internal error: {}", err);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status() {
        assert_eq!(ErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::UnprocessableEntity.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::ServiceUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_concealed_kinds_look_identical() {
        let a = ApiError::from(NimbusError::FileNotFound);
        let b = ApiError::from(NimbusError::ShareNotFound);
        let c = ApiError::from(NimbusError::Unauthorized);

        for err in [&a, &b, &c] {
            assert_eq!(err.code(), ErrorCode::NotFound);
            assert_eq!(err.message(), "not found");
        }
    }

    #[test]
    fn test_domain_error_mapping() {
        let err = ApiError::from(NimbusError::UserNotFound);
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.message(), "user not found");

        let err = ApiError::from(NimbusError::InvalidPermission("owner".into()));
        assert_eq!(err.code(), ErrorCode::UnprocessableEntity);

        let err = ApiError::from(NimbusError::StorageUnavailable("locked".into()));
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
        assert!(!err.message().contains("locked"));

        let err = ApiError::from(NimbusError::TokenGenerationFailed);
        assert_eq!(err.code(), ErrorCode::InternalError);

        let err = ApiError::from(NimbusError::CorruptRecord("grant 7".into()));
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert!(!err.message().contains("grant 7"));
    }
}

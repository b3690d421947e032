//! Bearer token authentication extractors.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::identity::Principal;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Pull the bearer credential out of the Authorization header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Extractor for authenticated users.
///
/// Rejects the request with 401 when the credential is missing or does not
/// resolve to a user.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Principal);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token =
            bearer_token(parts).ok_or_else(|| ApiError::unauthorized("Missing authorization"))?;

        match state.identity.resolve_principal(token).await? {
            Some(principal) => Ok(AuthUser(principal)),
            None => {
                tracing::debug!("Bearer credential did not resolve");
                Err(ApiError::unauthorized("Invalid or expired token"))
            }
        }
    }
}

/// Optional authentication extractor.
///
/// Similar to AuthUser but yields `None` instead of rejecting.
#[derive(Debug, Clone, Copy)]
pub struct OptionalAuthUser(pub Option<Principal>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for OptionalAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(OptionalAuthUser(None));
        };

        match state.identity.resolve_principal(token).await {
            Ok(principal) => Ok(OptionalAuthUser(principal)),
            Err(e) => {
                tracing::warn!("Failed to resolve optional credential: {}", e);
                Ok(OptionalAuthUser(None))
            }
        }
    }
}

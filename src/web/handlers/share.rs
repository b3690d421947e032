//! Share handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::web::dto::{
    ApiResponse, CreateLinkRequest, LinkResponse, PublicShareResponse, ShareResponse,
    ShareWithUserRequest, SharedFileResponse, UnshareAllResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{AuthUser, OptionalAuthUser};

/// POST /api/files/:file_id/shares - Share a file with a user.
pub async fn share_with_user(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(file_id): Path<String>,
    ValidatedJson(req): ValidatedJson<ShareWithUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ShareResponse>>), ApiError> {
    let grant = state
        .shares
        .share_with_user(
            &file_id,
            &principal,
            req.user_id,
            &req.permission,
            req.expires_at,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(ShareResponse::from(grant))),
    ))
}

/// GET /api/files/:file_id/shares - List every share on a file.
pub async fn list_shares(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(file_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ShareResponse>>>, ApiError> {
    let entries = state
        .shares
        .list_shares_on_file(&file_id, &principal)
        .await?;

    let responses = entries.into_iter().map(ShareResponse::from).collect();
    Ok(Json(ApiResponse::new(responses)))
}

/// DELETE /api/files/:file_id/shares - Revoke every share on a file.
pub async fn unshare_all(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(file_id): Path<String>,
) -> Result<Json<ApiResponse<UnshareAllResponse>>, ApiError> {
    let revoked = state.shares.unshare_all(&file_id, &principal).await?;
    Ok(Json(ApiResponse::new(UnshareAllResponse { revoked })))
}

/// POST /api/files/:file_id/links - Create a public link.
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(file_id): Path<String>,
    ValidatedJson(req): ValidatedJson<CreateLinkRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LinkResponse>>), ApiError> {
    let link = state
        .shares
        .create_public_link(&file_id, &principal, &req.permission, req.expires_at)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(LinkResponse::from(link))),
    ))
}

/// DELETE /api/shares/:grant_id - Revoke a share.
pub async fn revoke_share(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(grant_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.shares.revoke(grant_id, &principal).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/shares/:grant_id/hide - Hide a share from "shared with me".
pub async fn hide_share(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(grant_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.shares.hide_share(grant_id, &principal).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/shared-with-me - Files shared with the caller.
pub async fn shared_with_me(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
) -> Result<Json<ApiResponse<Vec<SharedFileResponse>>>, ApiError> {
    let shared = state.shares.list_shared_with_me(&principal).await?;

    let responses = shared.into_iter().map(SharedFileResponse::from).collect();
    Ok(Json(ApiResponse::new(responses)))
}

/// GET /api/public/:token - Resolve a public link.
pub async fn resolve_public_link(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(principal): OptionalAuthUser,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<PublicShareResponse>>, ApiError> {
    let resolved = state
        .shares
        .get_by_token(&token, principal.as_ref())
        .await?;

    Ok(Json(ApiResponse::new(PublicShareResponse::from(resolved))))
}

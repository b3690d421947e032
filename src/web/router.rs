//! Router configuration for the REST API.

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    create_link, download_by_token, download_file, hide_share, list_shares,
    resolve_public_link, revoke_share, share_with_user, shared_with_me, unshare_all, AppState,
};
use super::middleware::{create_cors_layer, security_headers};

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    // Owner-side routes on a file
    let file_routes = Router::new()
        .route(
            "/:file_id/shares",
            post(share_with_user).get(list_shares).delete(unshare_all),
        )
        .route("/:file_id/links", post(create_link))
        .route("/:file_id/content", get(download_file));

    // Routes on an individual grant
    let share_routes = Router::new()
        .route("/:grant_id", delete(revoke_share))
        .route("/:grant_id/hide", post(hide_share));

    // Public link routes (authentication optional)
    let public_routes = Router::new()
        .route("/:token", get(resolve_public_link))
        .route("/:token/download", get(download_by_token));

    let api_routes = Router::new()
        .nest("/files", file_routes)
        .nest("/shares", share_routes)
        .nest("/public", public_routes)
        .route("/shared-with-me", get(shared_with_me));

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(security_headers)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn test_health_router() {
        let response = create_health_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}

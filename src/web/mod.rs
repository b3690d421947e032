//! REST API for Nimbus sharing.
//!
//! A thin axum layer over [`crate::share::ShareService`]. Handlers translate
//! HTTP to service calls and [`ApiError`] maps error kinds to status codes.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::{create_health_router, create_router};
pub use server::WebServer;

//! Middleware for the REST API.

pub mod auth;
pub mod cors;
pub mod security;

pub use auth::{AuthUser, OptionalAuthUser};
pub use cors::create_cors_layer;
pub use security::security_headers;

//! API handlers for the REST API.

pub mod download;
pub mod share;

pub use download::*;
pub use share::*;

use std::sync::Arc;

use crate::identity::IdentityProvider;
use crate::share::ShareService;

/// Application state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Sharing operations.
    pub shares: ShareService,
    /// Resolves bearer credentials.
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(shares: ShareService, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { shares, identity }
    }
}

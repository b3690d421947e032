//! File sharing for Nimbus.
//!
//! Three cooperating parts:
//!
//! - [`AccessGrantStore`]: durable grants, direct and public
//! - [`AuthorizationEngine`]: read-access decisions and token resolution
//! - [`LinkIssuer`]: unguessable public link tokens
//!
//! [`ShareService`] wraps them for the HTTP routes.

mod clock;
mod engine;
mod grant;
mod link;
mod repository;
mod service;
mod store;
mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::AuthorizationEngine;
pub use grant::{
    AccessGrant, GrantSubject, Permission, ResolvedShare, ShareEntry, SharedFileSummary,
};
pub use link::{LinkIssuer, OsRngTokenSource, TokenSource};
pub use service::{retry_once, Download, PublicLink, ShareService};
pub use store::AccessGrantStore;
pub use sweeper::spawn_expiry_sweeper;

//! Nimbus - file sharing for a cloud file store
//!
//! Access grants, read authorization and public link issuance, exposed over
//! a small REST API.

pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod file;
pub mod identity;
pub mod logging;
pub mod share;
pub mod web;

pub use config::Config;
pub use db::{Database, DbPool, NewUser, User, UserRepository};
pub use error::{NimbusError, Result};
pub use file::{FileDescriptor, FileDirectory, FileRepository, FileStorage, NewFile};
pub use identity::{IdentityProvider, JwtIdentityProvider, Principal, UserSummary};
pub use share::{
    AccessGrant, AccessGrantStore, AuthorizationEngine, GrantSubject, LinkIssuer, Permission,
    ShareService,
};

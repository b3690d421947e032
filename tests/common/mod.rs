//! Test helpers for sharing integration tests.
//!
//! Provides a [`TestEnv`] wiring an on-disk database, blob storage, a manual
//! clock and the sharing stack together.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use nimbus::db::{NewUser, UserRepository};
use nimbus::file::{FileRepository, NewFile, SqlFileDirectory};
use nimbus::share::{AccessGrantStore, ManualClock, ShareService};
use nimbus::web::{create_router, AppState};
use nimbus::{Database, FileDescriptor, FileStorage, JwtIdentityProvider, Principal};

/// Secret used to sign test bearer tokens.
pub const TEST_JWT_SECRET: &str = "test-secret-key-for-testing-only";

/// A fully wired sharing stack backed by a temporary directory.
pub struct TestEnv {
    pub db: Database,
    pub storage: FileStorage,
    pub clock: Arc<ManualClock>,
    pub identity: Arc<JwtIdentityProvider>,
    pub store: AccessGrantStore,
    pub service: ShareService,
    _temp: TempDir,
}

impl TestEnv {
    /// Create a fresh environment with the clock at 2024-01-01 00:00 UTC.
    pub async fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let db = Database::open(temp.path().join("nimbus.db"))
            .await
            .expect("Failed to create test database");
        let storage = FileStorage::new(temp.path().join("blobs")).expect("Failed to create storage");

        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let identity = Arc::new(JwtIdentityProvider::new(
            db.pool().clone(),
            TEST_JWT_SECRET,
            3600,
        ));
        let store = AccessGrantStore::new(
            db.pool().clone(),
            Arc::new(SqlFileDirectory::new(db.pool().clone())),
            identity.clone(),
        )
        .with_clock(clock.clone());
        let service = ShareService::new(store.clone(), storage.clone());

        Self {
            db,
            storage,
            clock,
            identity,
            store,
            service,
            _temp: temp,
        }
    }

    /// Register a user and return them as a principal.
    pub async fn create_user(&self, username: &str) -> Principal {
        let user = UserRepository::new(self.db.pool())
            .create(&NewUser::new(username).with_email(format!("{username}@example.com")))
            .await
            .expect("Failed to create user");
        Principal::new(user.id)
    }

    /// Store `content` and register it as file `id` owned by `owner`.
    pub async fn create_file(
        &self,
        owner: &Principal,
        id: &str,
        name: &str,
        content: &[u8],
    ) -> FileDescriptor {
        let key = self
            .storage
            .save(content, name)
            .await
            .expect("Failed to save blob");
        self.files()
            .create(&NewFile::new(owner.user_id, name, key, content.len() as i64).with_id(id))
            .await
            .expect("Failed to create file")
    }

    /// File record repository.
    pub fn files(&self) -> FileRepository<'_> {
        FileRepository::new(self.db.pool())
    }

    /// Bearer token for a principal.
    pub fn token_for(&self, principal: &Principal) -> String {
        self.identity
            .issue_token(principal.user_id)
            .expect("Failed to issue token")
    }

    /// Build the API router over this environment.
    pub fn router(&self) -> axum::Router {
        let state = AppState::new(self.service.clone(), self.identity.clone());
        create_router(Arc::new(state), &[])
    }
}

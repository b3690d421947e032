//! Share service: the operations HTTP routes call.
//!
//! Routes hand over raw input (permission strings, optional principals) and
//! get typed results back. Failures of the grant store are retried once.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use super::engine::AuthorizationEngine;
use super::grant::{AccessGrant, Permission, ResolvedShare, ShareEntry, SharedFileSummary};
use super::store::AccessGrantStore;
use crate::file::{FileDescriptor, FileStorage};
use crate::identity::Principal;
use crate::{NimbusError, Result};

/// File contents fetched through a share.
#[derive(Debug, Clone)]
pub struct Download {
    /// The file being downloaded.
    pub file: FileDescriptor,
    /// Raw bytes.
    pub content: Vec<u8>,
}

/// A freshly created public link.
#[derive(Debug, Clone, Serialize)]
pub struct PublicLink {
    /// The token to embed in the link.
    pub token: String,
    /// The grant backing the link.
    pub grant: AccessGrant,
}

/// Run `op`, retrying once if it fails with a retryable error.
pub async fn retry_once<T, F, Fut>(operation: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match op().await {
        Err(e) if e.is_retryable() => {
            warn!(operation, error = %e, "storage failure, retrying once");
            op().await
        }
        other => other,
    }
}

/// Route-facing sharing operations.
#[derive(Clone)]
pub struct ShareService {
    store: AccessGrantStore,
    engine: AuthorizationEngine,
    storage: FileStorage,
}

impl ShareService {
    /// Create a service over a grant store and blob storage.
    pub fn new(store: AccessGrantStore, storage: FileStorage) -> Self {
        Self {
            engine: AuthorizationEngine::new(store.clone()),
            store,
            storage,
        }
    }

    /// The grant store.
    pub fn store(&self) -> &AccessGrantStore {
        &self.store
    }

    /// The authorization engine.
    pub fn engine(&self) -> &AuthorizationEngine {
        &self.engine
    }

    /// Share a file with a user, or change the permission of an existing share.
    pub async fn share_with_user(
        &self,
        file_id: &str,
        granter: &Principal,
        subject_user_id: i64,
        permission: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<AccessGrant> {
        let permission: Permission = permission.parse()?;
        retry_once("share_with_user", || {
            self.store.upsert_direct_grant(
                file_id,
                granter.user_id,
                subject_user_id,
                permission,
                expires_at,
            )
        })
        .await
    }

    /// Create a public link to a file.
    pub async fn create_public_link(
        &self,
        file_id: &str,
        granter: &Principal,
        permission: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<PublicLink> {
        let permission: Permission = permission.parse()?;
        let grant = retry_once("create_public_link", || {
            self.store
                .create_public_grant(file_id, granter.user_id, permission, expires_at)
        })
        .await?;

        let token = grant
            .token()
            .map(str::to_string)
            .ok_or(NimbusError::TokenGenerationFailed)?;
        Ok(PublicLink { token, grant })
    }

    /// Resolve a public link.
    pub async fn get_by_token(
        &self,
        token: &str,
        principal: Option<&Principal>,
    ) -> Result<ResolvedShare> {
        retry_once("get_by_token", || {
            self.engine.resolve_by_token(token, principal)
        })
        .await
    }

    /// List every share on a file for its owner.
    pub async fn list_shares_on_file(
        &self,
        file_id: &str,
        owner: &Principal,
    ) -> Result<Vec<ShareEntry>> {
        retry_once("list_shares_on_file", || {
            self.store.list_grants_for_file(file_id, owner.user_id)
        })
        .await
    }

    /// The caller's "shared with me" listing.
    pub async fn list_shared_with_me(&self, user: &Principal) -> Result<Vec<SharedFileSummary>> {
        retry_once("list_shared_with_me", || {
            self.engine.list_visible_to_user(user.user_id)
        })
        .await
    }

    /// Revoke a share the caller created.
    pub async fn revoke(&self, grant_id: i64, caller: &Principal) -> Result<()> {
        retry_once("revoke", || self.store.revoke_grant(grant_id, caller.user_id)).await
    }

    /// Revoke every share on a file.
    pub async fn unshare_all(&self, file_id: &str, owner: &Principal) -> Result<u64> {
        retry_once("unshare_all", || {
            self.store.revoke_all_grants_for_file(file_id, owner.user_id)
        })
        .await
    }

    /// Hide a share from the caller's "shared with me" listing.
    pub async fn hide_share(&self, grant_id: i64, recipient: &Principal) -> Result<()> {
        retry_once("hide_share", || {
            self.store
                .hide_from_recipient_view(grant_id, recipient.user_id)
        })
        .await
    }

    /// Download a file through a public link.
    pub async fn download_by_token(
        &self,
        token: &str,
        principal: Option<&Principal>,
    ) -> Result<Download> {
        let resolved = self.get_by_token(token, principal).await?;
        let content = self.load_content(&resolved.file).await?;
        Ok(Download {
            file: resolved.file,
            content,
        })
    }

    /// Download a file the caller owns or has been shared.
    ///
    /// Denials report [`NimbusError::FileNotFound`] so they cannot be told
    /// apart from a missing file.
    pub async fn download_file(&self, principal: &Principal, file_id: &str) -> Result<Download> {
        let allowed = retry_once("download_file", || {
            self.engine.can_read(principal, file_id)
        })
        .await?;
        if !allowed {
            return Err(NimbusError::FileNotFound);
        }

        let file = self
            .store
            .live_file(file_id)
            .await?
            .ok_or(NimbusError::FileNotFound)?;
        let content = self.load_content(&file).await?;
        Ok(Download { file, content })
    }

    async fn load_content(&self, file: &FileDescriptor) -> Result<Vec<u8>> {
        self.storage.load(&file.storage_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retry_once_recovers_from_transient_failure() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = retry_once("op", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(NimbusError::StorageUnavailable("busy".to_string()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_once_gives_up_after_second_failure() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = retry_once("op", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(NimbusError::StorageUnavailable("down".to_string()))
        })
        .await;

        assert!(matches!(result, Err(NimbusError::StorageUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_once_skips_domain_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = retry_once("op", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(NimbusError::ShareNotFound)
        })
        .await;

        assert!(matches!(result, Err(NimbusError::ShareNotFound)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_once_skips_corrupt_records() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = retry_once("op", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(NimbusError::CorruptRecord("grant 3".to_string()))
        })
        .await;

        assert!(matches!(result, Err(NimbusError::CorruptRecord(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

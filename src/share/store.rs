//! Access Grant Store.
//!
//! Owns the lifecycle of grants: creation, update, lookup, revocation and the
//! recipient-side hide marker. Ownership preconditions are checked against the
//! file directory; a file that is missing, soft-deleted or owned by someone
//! else is reported as [`NimbusError::FileNotFound`] in every case.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::grant::{AccessGrant, Permission, ShareEntry};
use super::link::LinkIssuer;
use super::repository::{GrantParams, GrantRepository};
use crate::db::DbPool;
use crate::file::{FileDescriptor, FileDirectory};
use crate::identity::IdentityProvider;
use crate::logging::redact_token;
use crate::{NimbusError, Result};

/// Durable store of access grants.
///
/// Cheap to clone; clones share the same pool and collaborators.
#[derive(Clone)]
pub struct AccessGrantStore {
    pool: DbPool,
    files: Arc<dyn FileDirectory>,
    identity: Arc<dyn IdentityProvider>,
    issuer: LinkIssuer,
    clock: Arc<dyn Clock>,
}

impl AccessGrantStore {
    /// Create a store using the system clock and default link issuer.
    pub fn new(
        pool: DbPool,
        files: Arc<dyn FileDirectory>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            pool,
            files,
            identity,
            issuer: LinkIssuer::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the link issuer.
    pub fn with_issuer(mut self, issuer: LinkIssuer) -> Self {
        self.issuer = issuer;
        self
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The file directory collaborator.
    pub fn files(&self) -> &Arc<dyn FileDirectory> {
        &self.files
    }

    /// The identity collaborator.
    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    /// Current time according to the store's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Look up a live file owned by `owner_id`.
    async fn owned_live_file(&self, file_id: &str, owner_id: i64) -> Result<FileDescriptor> {
        match self.files.get_file_descriptor(file_id, Some(owner_id)).await? {
            Some(file) if !file.is_deleted => Ok(file),
            _ => Err(NimbusError::FileNotFound),
        }
    }

    /// Look up a live file regardless of owner.
    pub(crate) async fn live_file(&self, file_id: &str) -> Result<Option<FileDescriptor>> {
        Ok(self
            .files
            .get_file_descriptor(file_id, None)
            .await?
            .filter(|file| !file.is_deleted))
    }

    /// Create or update the direct grant from `granted_by` to `subject_user_id`.
    ///
    /// Re-sharing with the same recipient replaces the permission and expiry
    /// of the existing grant rather than adding a second one.
    pub async fn upsert_direct_grant(
        &self,
        file_id: &str,
        granted_by: i64,
        subject_user_id: i64,
        permission: Permission,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<AccessGrant> {
        self.owned_live_file(file_id, granted_by).await?;

        if subject_user_id == granted_by {
            return Err(NimbusError::Validation(
                "cannot share a file with its owner".to_string(),
            ));
        }
        if !self.identity.user_exists(subject_user_id).await? {
            return Err(NimbusError::UserNotFound);
        }

        let params = GrantParams {
            file_id,
            granted_by,
            permission,
            expires_at,
            now: self.now(),
        };
        let grant = GrantRepository::new(&self.pool)
            .upsert_direct(params, subject_user_id)
            .await?;

        info!(
            grant_id = grant.id,
            file_id,
            granted_by,
            subject_user_id,
            permission = %permission,
            "direct grant saved"
        );
        Ok(grant)
    }

    /// Create a public link grant with a freshly minted token.
    ///
    /// A colliding token is replaced and the insert retried, up to the
    /// issuer's attempt limit.
    pub async fn create_public_grant(
        &self,
        file_id: &str,
        granted_by: i64,
        permission: Permission,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<AccessGrant> {
        self.owned_live_file(file_id, granted_by).await?;

        let repo = GrantRepository::new(&self.pool);
        let params = GrantParams {
            file_id,
            granted_by,
            permission,
            expires_at,
            now: self.now(),
        };

        for attempt in 1..=self.issuer.max_attempts() {
            let token = self.issuer.mint();
            if let Some(grant) = repo.insert_public(params, &token).await? {
                info!(
                    grant_id = grant.id,
                    file_id,
                    granted_by,
                    token = %redact_token(&token),
                    "public link created"
                );
                return Ok(grant);
            }
            warn!(file_id, attempt, "share token collision, retrying");
        }

        Err(NimbusError::TokenGenerationFailed)
    }

    /// Resolve a token to its grant and file.
    ///
    /// `None` when the token is unknown or expired, or the file is gone.
    pub(crate) async fn resolve_public_share(
        &self,
        token: &str,
    ) -> Result<Option<(AccessGrant, FileDescriptor)>> {
        let grant = match GrantRepository::new(&self.pool)
            .get_active_public(token, self.now())
            .await?
        {
            Some(grant) => grant,
            None => {
                debug!(token = %redact_token(token), "no active public grant");
                return Ok(None);
            }
        };

        match self.live_file(&grant.file_id).await? {
            Some(file) => Ok(Some((grant, file))),
            None => {
                debug!(grant_id = grant.id, "public grant points at a missing file");
                Ok(None)
            }
        }
    }

    /// Resolve a token to its public grant.
    pub async fn resolve_public_grant(&self, token: &str) -> Result<Option<AccessGrant>> {
        Ok(self
            .resolve_public_share(token)
            .await?
            .map(|(grant, _)| grant))
    }

    /// List every grant on a file for its owner, newest first.
    ///
    /// Expired grants are included. Direct grants carry recipient details.
    pub async fn list_grants_for_file(
        &self,
        file_id: &str,
        owner_id: i64,
    ) -> Result<Vec<ShareEntry>> {
        self.owned_live_file(file_id, owner_id).await?;

        let grants = GrantRepository::new(&self.pool)
            .list_for_file(file_id)
            .await?;

        let mut entries = Vec::with_capacity(grants.len());
        for grant in grants {
            let recipient = match grant.recipient_id() {
                Some(user_id) => self.identity.describe_user(user_id).await?,
                None => None,
            };
            entries.push(ShareEntry { grant, recipient });
        }
        Ok(entries)
    }

    /// Revoke one grant created by `caller_id`.
    ///
    /// A revoked public token never resolves again.
    pub async fn revoke_grant(&self, grant_id: i64, caller_id: i64) -> Result<()> {
        let deleted = GrantRepository::new(&self.pool)
            .delete_by_granter(grant_id, caller_id)
            .await?;

        if !deleted {
            return Err(NimbusError::ShareNotFound);
        }

        info!(grant_id, caller_id, "grant revoked");
        Ok(())
    }

    /// Revoke every grant the owner created on a file. Returns the count.
    pub async fn revoke_all_grants_for_file(&self, file_id: &str, owner_id: i64) -> Result<u64> {
        self.owned_live_file(file_id, owner_id).await?;

        let count = GrantRepository::new(&self.pool)
            .delete_all_for_file(file_id, owner_id)
            .await?;

        info!(file_id, owner_id, count, "all grants revoked");
        Ok(count)
    }

    /// Hide a direct grant from its recipient's listing.
    ///
    /// The grant keeps authorizing. Only the named recipient may hide it.
    pub async fn hide_from_recipient_view(&self, grant_id: i64, recipient_id: i64) -> Result<()> {
        let hidden = GrantRepository::new(&self.pool)
            .hide(grant_id, recipient_id, self.now())
            .await?;

        if !hidden {
            return Err(NimbusError::ShareNotFound);
        }

        debug!(grant_id, recipient_id, "grant hidden from recipient view");
        Ok(())
    }

    /// Delete grants that have expired. Returns the count.
    pub async fn purge_expired(&self) -> Result<u64> {
        let count = GrantRepository::new(&self.pool)
            .purge_expired(self.now())
            .await?;

        if count > 0 {
            info!(count, "expired grants purged");
        }
        Ok(count)
    }

    /// Active direct grants naming `user_id` on `file_id`.
    pub(crate) async fn active_direct_grants(
        &self,
        file_id: &str,
        user_id: i64,
    ) -> Result<Vec<AccessGrant>> {
        GrantRepository::new(&self.pool)
            .find_active_direct(file_id, user_id, self.now())
            .await
    }

    /// Active, unhidden direct grants naming `user_id`.
    pub(crate) async fn visible_direct_grants(&self, user_id: i64) -> Result<Vec<AccessGrant>> {
        GrantRepository::new(&self.pool)
            .list_visible_direct(user_id, self.now())
            .await
    }
}

//! Authorization Engine.
//!
//! Answers "may this principal read this file?" and resolves public tokens.
//! Every decision takes the principal as an explicit argument.

use tracing::debug;

use super::grant::{Permission, ResolvedShare, SharedFileSummary};
use super::store::AccessGrantStore;
use crate::identity::Principal;
use crate::logging::redact_token;
use crate::{NimbusError, Result};

/// Read-side authorization decisions over the grant store.
#[derive(Clone)]
pub struct AuthorizationEngine {
    store: AccessGrantStore,
}

impl AuthorizationEngine {
    /// Create an engine over a grant store.
    pub fn new(store: AccessGrantStore) -> Self {
        Self { store }
    }

    /// The underlying grant store.
    pub fn store(&self) -> &AccessGrantStore {
        &self.store
    }

    /// The highest permission `principal` holds on a file.
    ///
    /// Owners hold [`Permission::Admin`]. Otherwise the best active direct
    /// grant counts. `None` when the file is missing, deleted or not shared.
    pub async fn effective_permission(
        &self,
        principal: &Principal,
        file_id: &str,
    ) -> Result<Option<Permission>> {
        let file = match self.store.live_file(file_id).await? {
            Some(file) => file,
            None => return Ok(None),
        };

        if file.owner_id == principal.user_id {
            return Ok(Some(Permission::Admin));
        }

        let best = self
            .store
            .active_direct_grants(file_id, principal.user_id)
            .await?
            .into_iter()
            .map(|grant| grant.permission)
            .max();

        Ok(best)
    }

    /// Whether `principal` may read a file.
    pub async fn can_read(&self, principal: &Principal, file_id: &str) -> Result<bool> {
        self.can_perform(principal, file_id, Permission::Read).await
    }

    /// Whether `principal` holds at least `required` on a file.
    pub async fn can_perform(
        &self,
        principal: &Principal,
        file_id: &str,
        required: Permission,
    ) -> Result<bool> {
        let allowed = self
            .effective_permission(principal, file_id)
            .await?
            .is_some_and(|held| held.allows(required));

        debug!(
            user_id = principal.user_id,
            file_id,
            required = %required,
            allowed,
            "authorization decision"
        );
        Ok(allowed)
    }

    /// Resolve a public token to its file.
    ///
    /// The principal, when present, does not affect the outcome: possession of
    /// the token is the credential. Unknown, expired and revoked tokens, and
    /// tokens whose file is gone, are indistinguishable.
    pub async fn resolve_by_token(
        &self,
        token: &str,
        principal: Option<&Principal>,
    ) -> Result<ResolvedShare> {
        match self.store.resolve_public_share(token).await? {
            Some((grant, file)) => {
                debug!(
                    token = %redact_token(token),
                    grant_id = grant.id,
                    user_id = principal.map(|p| p.user_id),
                    "public link resolved"
                );
                Ok(ResolvedShare {
                    permission: grant.permission,
                    file,
                    grant,
                })
            }
            None => Err(NimbusError::ShareNotFound),
        }
    }

    /// Files shared directly with `user_id` and not hidden, newest share first.
    ///
    /// Grants on deleted or vanished files are skipped.
    pub async fn list_visible_to_user(&self, user_id: i64) -> Result<Vec<SharedFileSummary>> {
        let grants = self.store.visible_direct_grants(user_id).await?;

        let mut summaries = Vec::with_capacity(grants.len());
        for grant in grants {
            let Some(file) = self.store.live_file(&grant.file_id).await? else {
                continue;
            };
            summaries.push(SharedFileSummary {
                grant_id: grant.id,
                file,
                permission: grant.permission,
                shared_by: grant.granted_by,
                shared_at: grant.created_at,
                expires_at: grant.expires_at,
            });
        }
        Ok(summaries)
    }
}

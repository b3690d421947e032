//! Grant repository for database operations.

use chrono::{DateTime, Utc};

use super::grant::{AccessGrant, GrantRow, Permission};
use crate::datetime;
use crate::db::DbPool;
use crate::Result;

const GRANT_COLUMNS: &str = "id, file_id, granted_by, subject_kind, subject_user_id, token, \
                             permission, expires_at, created_at, updated_at";

/// Parameters shared by both kinds of grant insert.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GrantParams<'p> {
    pub file_id: &'p str,
    pub granted_by: i64,
    pub permission: Permission,
    pub expires_at: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
}

/// Repository for access grant rows.
pub(crate) struct GrantRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> GrantRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create or update the direct grant for `(file, granter, recipient)`.
    ///
    /// An active grant is updated in place. An expired one is marked
    /// superseded and a new row with a fresh id takes its place, so the old
    /// row survives as history. Both steps share one write transaction and the
    /// insert is an `INSERT .. ON CONFLICT`, so concurrent callers never leave
    /// two current rows for the same triple. Any hide marker the recipient set
    /// on the grant is cleared in the same transaction.
    pub async fn upsert_direct(
        &self,
        params: GrantParams<'_>,
        subject_user_id: i64,
    ) -> Result<AccessGrant> {
        let now = datetime::to_db(&params.now);
        let expires_at = params.expires_at.as_ref().map(datetime::to_db);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE access_grants SET superseded_at = ?
             WHERE file_id = ? AND granted_by = ? AND subject_kind = 'user'
               AND subject_user_id = ? AND superseded_at IS NULL
               AND expires_at IS NOT NULL AND expires_at <= ?",
        )
        .bind(&now)
        .bind(params.file_id)
        .bind(params.granted_by)
        .bind(subject_user_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, GrantRow>(&format!(
            "INSERT INTO access_grants
                 (file_id, granted_by, subject_kind, subject_user_id, permission,
                  expires_at, created_at, updated_at)
             VALUES (?, ?, 'user', ?, ?, ?, ?, ?)
             ON CONFLICT (file_id, granted_by, subject_user_id)
                 WHERE subject_kind = 'user' AND superseded_at IS NULL
             DO UPDATE SET permission = excluded.permission,
                           expires_at = excluded.expires_at,
                           updated_at = excluded.updated_at
             RETURNING {GRANT_COLUMNS}"
        ))
        .bind(params.file_id)
        .bind(params.granted_by)
        .bind(subject_user_id)
        .bind(params.permission.as_str())
        .bind(&expires_at)
        .bind(&now)
        .bind(&now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM share_suppressions WHERE grant_id = ?")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        row.try_into()
    }

    /// Insert a public grant carrying `token`.
    ///
    /// Returns `None` when the token collides with a live or retired token,
    /// leaving the caller to try a fresh one.
    pub async fn insert_public(
        &self,
        params: GrantParams<'_>,
        token: &str,
    ) -> Result<Option<AccessGrant>> {
        let now = datetime::to_db(&params.now);
        let expires_at = params.expires_at.as_ref().map(datetime::to_db);

        let result = sqlx::query_as::<_, GrantRow>(&format!(
            "INSERT INTO access_grants
                 (file_id, granted_by, subject_kind, token, permission,
                  expires_at, created_at, updated_at)
             SELECT ?, ?, 'public', ?, ?, ?, ?, ?
             WHERE NOT EXISTS (SELECT 1 FROM retired_share_tokens WHERE token = ?)
             RETURNING {GRANT_COLUMNS}"
        ))
        .bind(params.file_id)
        .bind(params.granted_by)
        .bind(token)
        .bind(params.permission.as_str())
        .bind(&expires_at)
        .bind(&now)
        .bind(&now)
        .bind(token)
        .fetch_optional(self.pool)
        .await;

        match result {
            Ok(Some(row)) => Ok(Some(row.try_into()?)),
            Ok(None) => Ok(None),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a grant by ID regardless of expiry.
    #[cfg(test)]
    pub async fn get_by_id(&self, id: i64) -> Result<Option<AccessGrant>> {
        let row = sqlx::query_as::<_, GrantRow>(&format!(
            "SELECT {GRANT_COLUMNS} FROM access_grants WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(AccessGrant::try_from).transpose()
    }

    /// Get the public grant for a token if it has not expired at `now`.
    pub async fn get_active_public(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AccessGrant>> {
        let row = sqlx::query_as::<_, GrantRow>(&format!(
            "SELECT {GRANT_COLUMNS} FROM access_grants
             WHERE token = ? AND subject_kind = 'public'
               AND (expires_at IS NULL OR expires_at > ?)"
        ))
        .bind(token)
        .bind(datetime::to_db(&now))
        .fetch_optional(self.pool)
        .await?;

        row.map(AccessGrant::try_from).transpose()
    }

    /// Active direct grants naming `user_id` on `file_id`, from any granter.
    pub async fn find_active_direct(
        &self,
        file_id: &str,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<AccessGrant>> {
        let rows = sqlx::query_as::<_, GrantRow>(&format!(
            "SELECT {GRANT_COLUMNS} FROM access_grants
             WHERE file_id = ? AND subject_kind = 'user' AND subject_user_id = ?
               AND (expires_at IS NULL OR expires_at > ?)"
        ))
        .bind(file_id)
        .bind(user_id)
        .bind(datetime::to_db(&now))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(AccessGrant::try_from).collect()
    }

    /// All grants on a file, newest first, expired ones included.
    pub async fn list_for_file(&self, file_id: &str) -> Result<Vec<AccessGrant>> {
        let rows = sqlx::query_as::<_, GrantRow>(&format!(
            "SELECT {GRANT_COLUMNS} FROM access_grants
             WHERE file_id = ?
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(file_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(AccessGrant::try_from).collect()
    }

    /// Active direct grants naming `user_id` that the user has not hidden,
    /// newest first.
    pub async fn list_visible_direct(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<AccessGrant>> {
        let rows = sqlx::query_as::<_, GrantRow>(
            "SELECT g.id, g.file_id, g.granted_by, g.subject_kind, g.subject_user_id, g.token,
                    g.permission, g.expires_at, g.created_at, g.updated_at
             FROM access_grants g
             LEFT JOIN share_suppressions s ON s.grant_id = g.id
             WHERE g.subject_kind = 'user' AND g.subject_user_id = ?
               AND (g.expires_at IS NULL OR g.expires_at > ?)
               AND s.grant_id IS NULL
             ORDER BY g.created_at DESC, g.id DESC",
        )
        .bind(user_id)
        .bind(datetime::to_db(&now))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(AccessGrant::try_from).collect()
    }

    /// Delete a grant if it was created by `granted_by`.
    ///
    /// Returns false if no such grant exists.
    pub async fn delete_by_granter(&self, id: i64, granted_by: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM access_grants WHERE id = ? AND granted_by = ?")
            .bind(id)
            .bind(granted_by)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every grant `granted_by` created on a file. Returns the count.
    pub async fn delete_all_for_file(&self, file_id: &str, granted_by: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM access_grants WHERE file_id = ? AND granted_by = ?")
            .bind(file_id)
            .bind(granted_by)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Record that the recipient hid a direct grant.
    ///
    /// Returns false when the grant does not exist, is public, or names a
    /// different recipient. Hiding twice succeeds.
    pub async fn hide(&self, id: i64, recipient_id: i64, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO share_suppressions (grant_id, recipient_id, hidden_at)
             SELECT id, subject_user_id, ? FROM access_grants
             WHERE id = ? AND subject_kind = 'user' AND subject_user_id = ?
             ON CONFLICT (grant_id) DO NOTHING",
        )
        .bind(datetime::to_db(&now))
        .bind(id)
        .bind(recipient_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        let already: Option<i64> = sqlx::query_scalar(
            "SELECT grant_id FROM share_suppressions WHERE grant_id = ? AND recipient_id = ?",
        )
        .bind(id)
        .bind(recipient_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(already.is_some())
    }

    /// Whether the recipient has hidden a grant.
    #[cfg(test)]
    pub async fn is_hidden(&self, id: i64) -> Result<bool> {
        let hidden: Option<i64> =
            sqlx::query_scalar("SELECT grant_id FROM share_suppressions WHERE grant_id = ?")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(hidden.is_some())
    }

    /// Delete grants whose expiry is at or before `now`. Returns the count.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM access_grants WHERE expires_at IS NOT NULL AND expires_at <= ?")
                .bind(datetime::to_db(&now))
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    /// Number of grant rows on a file.
    #[cfg(test)]
    pub async fn count_for_file(&self, file_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM access_grants WHERE file_id = ?")
            .bind(file_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    /// Whether a token has ever been revoked or purged.
    #[cfg(test)]
    pub async fn is_token_retired(&self, token: &str) -> Result<bool> {
        let retired: Option<String> =
            sqlx::query_scalar("SELECT token FROM retired_share_tokens WHERE token = ?")
                .bind(token)
                .fetch_optional(self.pool)
                .await?;

        Ok(retired.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::GrantSubject;
    use crate::Database;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn params(file_id: &str, permission: Permission) -> GrantParams<'_> {
        GrantParams {
            file_id,
            granted_by: 1,
            permission,
            expires_at: None,
            now: t0(),
        }
    }

    #[tokio::test]
    async fn test_upsert_direct_inserts_then_updates() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = GrantRepository::new(db.pool());

        let first = repo
            .upsert_direct(params("f1", Permission::Read), 2)
            .await
            .unwrap();
        assert_eq!(first.subject, GrantSubject::DirectUser { user_id: 2 });
        assert_eq!(first.permission, Permission::Read);
        assert_eq!(first.created_at, t0());

        let mut p = params("f1", Permission::Admin);
        p.now = t0() + Duration::minutes(5);
        let second = repo.upsert_direct(p, 2).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.permission, Permission::Admin);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.updated_at, t0() + Duration::minutes(5));
        assert_eq!(repo.count_for_file("f1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_direct_replaces_expiry() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = GrantRepository::new(db.pool());

        let mut p = params("f1", Permission::Read);
        p.expires_at = Some(t0() + Duration::hours(1));
        let grant = repo.upsert_direct(p, 2).await.unwrap();
        assert_eq!(grant.expires_at, Some(t0() + Duration::hours(1)));

        let grant = repo
            .upsert_direct(params("f1", Permission::Read), 2)
            .await
            .unwrap();
        assert_eq!(grant.expires_at, None);
    }

    #[tokio::test]
    async fn test_upsert_direct_after_expiry_starts_new_grant() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = GrantRepository::new(db.pool());

        let mut p = params("f1", Permission::Read);
        p.expires_at = Some(t0() + Duration::hours(1));
        let lapsed = repo.upsert_direct(p, 2).await.unwrap();

        let mut p = params("f1", Permission::Write);
        p.now = t0() + Duration::hours(2);
        let fresh = repo.upsert_direct(p, 2).await.unwrap();

        assert_ne!(fresh.id, lapsed.id);
        assert_eq!(fresh.created_at, t0() + Duration::hours(2));
        assert_eq!(fresh.permission, Permission::Write);
        assert_eq!(fresh.expires_at, None);

        // The lapsed grant is kept untouched as history.
        let old = repo.get_by_id(lapsed.id).await.unwrap().unwrap();
        assert_eq!(old.permission, Permission::Read);
        assert_eq!(old.created_at, t0());
        assert_eq!(repo.count_for_file("f1").await.unwrap(), 2);

        // Later re-shares update the new grant in place.
        let mut p = params("f1", Permission::Admin);
        p.now = t0() + Duration::hours(3);
        let again = repo.upsert_direct(p, 2).await.unwrap();
        assert_eq!(again.id, fresh.id);
        assert_eq!(repo.count_for_file("f1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_public_and_lookup() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = GrantRepository::new(db.pool());

        let grant = repo
            .insert_public(params("f1", Permission::Read), "tok-a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(grant.token(), Some("tok-a"));

        let found = repo.get_active_public("tok-a", t0()).await.unwrap();
        assert_eq!(found.map(|g| g.id), Some(grant.id));
        assert!(repo.get_active_public("tok-b", t0()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_public_collision_returns_none() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = GrantRepository::new(db.pool());

        repo.insert_public(params("f1", Permission::Read), "dup")
            .await
            .unwrap()
            .unwrap();
        let again = repo
            .insert_public(params("f2", Permission::Read), "dup")
            .await
            .unwrap();
        assert!(again.is_none());
        assert_eq!(repo.count_for_file("f2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deleted_token_is_retired() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = GrantRepository::new(db.pool());

        let grant = repo
            .insert_public(params("f1", Permission::Read), "gone")
            .await
            .unwrap()
            .unwrap();
        assert!(repo.delete_by_granter(grant.id, 1).await.unwrap());
        assert!(repo.is_token_retired("gone").await.unwrap());

        let reused = repo
            .insert_public(params("f1", Permission::Read), "gone")
            .await
            .unwrap();
        assert!(reused.is_none());
    }

    #[tokio::test]
    async fn test_expired_public_not_returned() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = GrantRepository::new(db.pool());

        let mut p = params("f1", Permission::Read);
        p.expires_at = Some(t0() + Duration::seconds(10));
        repo.insert_public(p, "short").await.unwrap().unwrap();

        assert!(repo.get_active_public("short", t0()).await.unwrap().is_some());
        assert!(repo
            .get_active_public("short", t0() + Duration::seconds(10))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_by_granter_checks_owner() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = GrantRepository::new(db.pool());

        let grant = repo
            .upsert_direct(params("f1", Permission::Read), 2)
            .await
            .unwrap();

        assert!(!repo.delete_by_granter(grant.id, 99).await.unwrap());
        assert!(repo.delete_by_granter(grant.id, 1).await.unwrap());
        assert!(!repo.delete_by_granter(grant.id, 1).await.unwrap());
        assert!(repo.get_by_id(grant.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_for_file_newest_first() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = GrantRepository::new(db.pool());

        let a = repo
            .upsert_direct(params("f1", Permission::Read), 2)
            .await
            .unwrap();
        let mut p = params("f1", Permission::Read);
        p.now = t0() + Duration::seconds(1);
        let b = repo.insert_public(p, "tok").await.unwrap().unwrap();
        repo.upsert_direct(params("other", Permission::Read), 2)
            .await
            .unwrap();

        let ids: Vec<i64> = repo
            .list_for_file("f1")
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn test_hide_and_visibility() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = GrantRepository::new(db.pool());

        let grant = repo
            .upsert_direct(params("f1", Permission::Read), 2)
            .await
            .unwrap();
        assert_eq!(repo.list_visible_direct(2, t0()).await.unwrap().len(), 1);

        assert!(!repo.hide(grant.id, 3, t0()).await.unwrap());
        assert!(repo.hide(grant.id, 2, t0()).await.unwrap());
        assert!(repo.hide(grant.id, 2, t0()).await.unwrap());
        assert!(repo.is_hidden(grant.id).await.unwrap());
        assert!(repo.list_visible_direct(2, t0()).await.unwrap().is_empty());

        // Hidden grants still authorize.
        assert_eq!(repo.find_active_direct("f1", 2, t0()).await.unwrap().len(), 1);

        // Re-sharing clears the marker.
        repo.upsert_direct(params("f1", Permission::Write), 2)
            .await
            .unwrap();
        assert!(!repo.is_hidden(grant.id).await.unwrap());
        assert_eq!(repo.list_visible_direct(2, t0()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_hide_rejects_public_grants() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = GrantRepository::new(db.pool());

        let grant = repo
            .insert_public(params("f1", Permission::Read), "tok")
            .await
            .unwrap()
            .unwrap();
        assert!(!repo.hide(grant.id, 1, t0()).await.unwrap());
        assert!(!repo.hide(12345, 1, t0()).await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = GrantRepository::new(db.pool());

        let mut p = params("f1", Permission::Read);
        p.expires_at = Some(t0() + Duration::seconds(5));
        repo.upsert_direct(p, 2).await.unwrap();
        repo.insert_public(p, "lapsing").await.unwrap().unwrap();
        repo.upsert_direct(params("f1", Permission::Read), 3)
            .await
            .unwrap();

        assert_eq!(repo.purge_expired(t0()).await.unwrap(), 0);
        assert_eq!(
            repo.purge_expired(t0() + Duration::seconds(5)).await.unwrap(),
            2
        );
        assert_eq!(repo.count_for_file("f1").await.unwrap(), 1);
        assert!(repo.is_token_retired("lapsing").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_all_for_file() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = GrantRepository::new(db.pool());

        repo.upsert_direct(params("f1", Permission::Read), 2)
            .await
            .unwrap();
        repo.upsert_direct(params("f1", Permission::Read), 3)
            .await
            .unwrap();
        repo.insert_public(params("f1", Permission::Read), "t1")
            .await
            .unwrap()
            .unwrap();
        repo.upsert_direct(params("f2", Permission::Read), 2)
            .await
            .unwrap();

        assert_eq!(repo.delete_all_for_file("f1", 99).await.unwrap(), 0);
        assert_eq!(repo.delete_all_for_file("f1", 1).await.unwrap(), 3);
        assert_eq!(repo.count_for_file("f1").await.unwrap(), 0);
        assert_eq!(repo.count_for_file("f2").await.unwrap(), 1);
    }
}

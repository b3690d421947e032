//! Background purge of expired grants.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use super::store::AccessGrantStore;

/// Spawn a task that deletes expired grants every `interval`.
///
/// Expired grants already fail every check; purging only reclaims rows.
pub fn spawn_expiry_sweeper(store: AccessGrantStore, interval: Duration) -> JoinHandle<()> {
    info!(interval_secs = interval.as_secs(), "starting expired grant sweeper");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = store.purge_expired().await {
                error!("Failed to purge expired grants: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::file::{FileRepository, NewFile, SqlFileDirectory};
    use crate::identity::JwtIdentityProvider;
    use crate::share::{ManualClock, Permission};
    use crate::Database;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_sweeper_purges_expired_grants() {
        let db = Database::open_in_memory().await.unwrap();
        let users = UserRepository::new(db.pool());
        let owner = users.create(&NewUser::new("owner")).await.unwrap().id;
        let alice = users.create(&NewUser::new("alice")).await.unwrap().id;
        FileRepository::new(db.pool())
            .create(&NewFile::new(owner, "a.txt", "a.txt", 1).with_id("f1"))
            .await
            .unwrap();

        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let store = AccessGrantStore::new(
            db.pool().clone(),
            Arc::new(SqlFileDirectory::new(db.pool().clone())),
            Arc::new(JwtIdentityProvider::new(db.pool().clone(), "secret", 3600)),
        )
        .with_clock(clock.clone());

        store
            .upsert_direct_grant(
                "f1",
                owner,
                alice,
                Permission::Read,
                Some(store.now() + chrono::Duration::seconds(1)),
            )
            .await
            .unwrap();
        clock.advance(chrono::Duration::seconds(5));

        let handle = spawn_expiry_sweeper(store.clone(), Duration::from_millis(10));
        let mut remaining = 1;
        for _ in 0..100 {
            remaining = store.list_grants_for_file("f1", owner).await.unwrap().len();
            if remaining == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        assert_eq!(remaining, 0);
    }
}

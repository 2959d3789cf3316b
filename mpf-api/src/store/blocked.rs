//! Block store: tracks a user never wants recommended
//!
//! A block is active while `expires_at` is NULL (permanent) or in the
//! future. Expired rows are not purged; the active predicate is applied at
//! query time, and an expired row is replaced when the track is blocked
//! again.

use chrono::{DateTime, Utc};
use mpf_common::db::BlockedTrack;
use mpf_common::{time, BlockDuration, SpotifyTrackId};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use super::{is_unique_violation, ACTIVE_BLOCK_PREDICATE};
use crate::auth::UserId;
use crate::error::{ServiceError, ServiceResult, TrackCollection};
use crate::pagination::Page;

/// One page of blocks plus the total under the same filter
#[derive(Debug, Clone, Serialize)]
pub struct BlockedTrackList {
    pub blocked_tracks: Vec<BlockedTrack>,
    pub total_count: i64,
}

/// CRUD over `blocked_tracks`
#[derive(Clone)]
pub struct BlockStore {
    pool: SqlitePool,
}

impl BlockStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Block a track for `duration`
    ///
    /// Fails with `TrackInLibrary` if the track is saved in the library and
    /// with `DuplicateTrack` if an active block already exists.
    pub async fn block(
        &self,
        user: &UserId,
        track_id: &SpotifyTrackId,
        duration: BlockDuration,
    ) -> ServiceResult<BlockedTrack> {
        self.block_at(user, track_id, duration, time::now()).await
    }

    /// [`BlockStore::block`] with an explicit creation time
    pub async fn block_at(
        &self,
        user: &UserId,
        track_id: &SpotifyTrackId,
        duration: BlockDuration,
        now: DateTime<Utc>,
    ) -> ServiceResult<BlockedTrack> {
        self.block_inner(user, track_id, duration, now)
            .await
            .map_err(|e| {
                e.log("blocked.block", user.as_str(), Some(track_id.as_str()));
                e
            })
    }

    async fn block_inner(
        &self,
        user: &UserId,
        track_id: &SpotifyTrackId,
        duration: BlockDuration,
        now: DateTime<Utc>,
    ) -> ServiceResult<BlockedTrack> {
        let duplicate = || ServiceError::DuplicateTrack {
            collection: TrackCollection::Blocked,
            track_id: track_id.to_string(),
        };

        let in_library: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM library_tracks WHERE user_id = ? AND spotify_track_id = ?",
        )
        .bind(user.as_str())
        .bind(track_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if in_library.is_some() {
            return Err(ServiceError::TrackInLibrary(track_id.to_string()));
        }

        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, BlockedTrack>(
            "SELECT id, user_id, spotify_track_id, expires_at, created_at
             FROM blocked_tracks
             WHERE user_id = ? AND spotify_track_id = ?",
        )
        .bind(user.as_str())
        .bind(track_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(row) = existing {
            if row.is_active_at(now) {
                return Err(duplicate());
            }

            sqlx::query("DELETE FROM blocked_tracks WHERE id = ?")
                .bind(row.id)
                .execute(&mut *tx)
                .await?;
        }

        let expires_at = duration.expires_at(now);

        let blocked = Self::insert(&mut tx, user, track_id, expires_at, now).await?;

        tx.commit().await?;

        info!(
            user_id = %user,
            track_id = %track_id,
            duration = %duration,
            expires_at = ?expires_at,
            "Track blocked"
        );
        Ok(blocked)
    }

    /// Insert a block row; a unique violation (lost race with a concurrent
    /// block) maps to `DuplicateTrack`
    async fn insert(
        conn: &mut SqliteConnection,
        user: &UserId,
        track_id: &SpotifyTrackId,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> ServiceResult<BlockedTrack> {
        sqlx::query_as::<_, BlockedTrack>(
            "INSERT INTO blocked_tracks (user_id, spotify_track_id, expires_at, created_at)
             VALUES (?, ?, ?, ?)
             RETURNING id, user_id, spotify_track_id, expires_at, created_at",
        )
        .bind(user.as_str())
        .bind(track_id.as_str())
        .bind(expires_at)
        .bind(now)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::DuplicateTrack {
                    collection: TrackCollection::Blocked,
                    track_id: track_id.to_string(),
                }
            } else {
                e.into()
            }
        })
    }

    /// Remove a block; `TrackNotFound` if no row was deleted
    pub async fn unblock(&self, user: &UserId, track_id: &SpotifyTrackId) -> ServiceResult<()> {
        let result = sqlx::query(
            "DELETE FROM blocked_tracks WHERE user_id = ? AND spotify_track_id = ?",
        )
        .bind(user.as_str())
        .bind(track_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let err = ServiceError::from(e);
            err.log("blocked.unblock", user.as_str(), Some(track_id.as_str()));
            err
        })?;

        if result.rows_affected() == 0 {
            let err = ServiceError::TrackNotFound {
                collection: TrackCollection::Blocked,
                track_id: track_id.to_string(),
            };
            err.log("blocked.unblock", user.as_str(), Some(track_id.as_str()));
            return Err(err);
        }

        info!(user_id = %user, track_id = %track_id, "Track unblocked");
        Ok(())
    }

    /// Newest-first page of blocks
    pub async fn list(
        &self,
        user: &UserId,
        active_only: bool,
        page: Page,
    ) -> ServiceResult<BlockedTrackList> {
        self.list_at(user, active_only, page, time::now()).await
    }

    /// [`BlockStore::list`] evaluated at an explicit time
    pub async fn list_at(
        &self,
        user: &UserId,
        active_only: bool,
        page: Page,
        now: DateTime<Utc>,
    ) -> ServiceResult<BlockedTrackList> {
        self.list_inner(user, active_only, page, now)
            .await
            .map_err(|e| {
                let err = ServiceError::from(e);
                err.log("blocked.list", user.as_str(), None);
                err
            })
    }

    async fn list_inner(
        &self,
        user: &UserId,
        active_only: bool,
        page: Page,
        now: DateTime<Utc>,
    ) -> Result<BlockedTrackList, sqlx::Error> {
        let filter = if active_only {
            format!("user_id = ? AND {}", ACTIVE_BLOCK_PREDICATE)
        } else {
            "user_id = ?".to_string()
        };

        let count_sql = format!("SELECT COUNT(*) FROM blocked_tracks WHERE {}", filter);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(user.as_str());
        if active_only {
            count_query = count_query.bind(now);
        }
        let total_count = count_query.fetch_one(&self.pool).await?;

        let list_sql = format!(
            "SELECT id, user_id, spotify_track_id, expires_at, created_at
             FROM blocked_tracks
             WHERE {}
             ORDER BY created_at DESC, id DESC
             LIMIT ? OFFSET ?",
            filter
        );
        let mut list_query = sqlx::query_as::<_, BlockedTrack>(&list_sql).bind(user.as_str());
        if active_only {
            list_query = list_query.bind(now);
        }
        let blocked_tracks = list_query
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(BlockedTrackList {
            blocked_tracks,
            total_count,
        })
    }

    /// Whether an active block exists for the track
    pub async fn is_blocked(&self, user: &UserId, track_id: &SpotifyTrackId) -> ServiceResult<bool> {
        let sql = format!(
            "SELECT COUNT(*) FROM blocked_tracks
             WHERE user_id = ? AND spotify_track_id = ? AND {}",
            ACTIVE_BLOCK_PREDICATE
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(user.as_str())
            .bind(track_id.as_str())
            .bind(time::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                let err = ServiceError::from(e);
                err.log("blocked.is_blocked", user.as_str(), Some(track_id.as_str()));
                err
            })?;

        Ok(count > 0)
    }

    /// Track ids of every active block
    pub async fn active_track_ids(&self, user: &UserId) -> ServiceResult<Vec<String>> {
        let sql = format!(
            "SELECT spotify_track_id FROM blocked_tracks WHERE user_id = ? AND {}",
            ACTIVE_BLOCK_PREDICATE
        );
        sqlx::query_scalar(&sql)
            .bind(user.as_str())
            .bind(time::now())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                let err = ServiceError::from(e);
                err.log("blocked.active_track_ids", user.as_str(), None);
                err
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use mpf_common::db::init_memory_database;

    use crate::store::LibraryStore;

    const TRACK_A: &str = "AAAAAAAAAAAAAAAAAAAAAA";
    const TRACK_B: &str = "BBBBBBBBBBBBBBBBBBBBBB";
    const TRACK_C: &str = "CCCCCCCCCCCCCCCCCCCCCC";

    fn id(raw: &str) -> SpotifyTrackId {
        SpotifyTrackId::parse(raw).unwrap()
    }

    async fn stores() -> (LibraryStore, BlockStore) {
        let pool = init_memory_database().await.unwrap();
        (LibraryStore::new(pool.clone()), BlockStore::new(pool))
    }

    #[tokio::test]
    async fn test_expiry_per_duration() {
        let (_, store) = stores().await;
        let user = UserId::new("user-1");

        let day = store.block(&user, &id(TRACK_A), BlockDuration::OneDay).await.unwrap();
        let week = store.block(&user, &id(TRACK_B), BlockDuration::SevenDays).await.unwrap();
        let forever = store.block(&user, &id(TRACK_C), BlockDuration::Permanent).await.unwrap();

        assert_eq!(day.expires_at.unwrap() - day.created_at, Duration::hours(24));
        assert_eq!(week.expires_at.unwrap() - week.created_at, Duration::hours(168));
        assert!(forever.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_block_library_track_fails_for_every_duration() {
        let (library, store) = stores().await;
        let user = UserId::new("user-1");
        library.add(&user, &id(TRACK_A)).await.unwrap();

        for duration in [BlockDuration::OneDay, BlockDuration::SevenDays, BlockDuration::Permanent] {
            let err = store.block(&user, &id(TRACK_A), duration).await.unwrap_err();
            assert!(matches!(err, ServiceError::TrackInLibrary(_)), "{:?}", duration);
        }
    }

    #[tokio::test]
    async fn test_active_duplicate_fails() {
        let (_, store) = stores().await;
        let user = UserId::new("user-1");

        store.block(&user, &id(TRACK_A), BlockDuration::OneDay).await.unwrap();
        let err = store
            .block(&user, &id(TRACK_A), BlockDuration::Permanent)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::DuplicateTrack {
                collection: TrackCollection::Blocked,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_expired_block_is_replaced() {
        let (_, store) = stores().await;
        let user = UserId::new("user-1");
        let two_days_ago = time::now() - Duration::days(2);

        store
            .block_at(&user, &id(TRACK_A), BlockDuration::OneDay, two_days_ago)
            .await
            .unwrap();
        let renewed = store
            .block(&user, &id(TRACK_A), BlockDuration::Permanent)
            .await
            .unwrap();

        assert!(renewed.expires_at.is_none());
        let all = store.list(&user, false, Page::default()).await.unwrap();
        assert_eq!(all.total_count, 1);
    }

    #[tokio::test]
    async fn test_active_only_filters_expired() {
        let (_, store) = stores().await;
        let user = UserId::new("user-1");
        let two_days_ago = time::now() - Duration::days(2);

        store
            .block_at(&user, &id(TRACK_A), BlockDuration::OneDay, two_days_ago)
            .await
            .unwrap();
        store.block(&user, &id(TRACK_B), BlockDuration::SevenDays).await.unwrap();

        let active = store.list(&user, true, Page::default()).await.unwrap();
        assert_eq!(active.total_count, 1);
        assert_eq!(active.blocked_tracks[0].spotify_track_id, TRACK_B);

        let all = store.list(&user, false, Page::default()).await.unwrap();
        assert_eq!(all.total_count, 2);
        // Newest first
        assert_eq!(all.blocked_tracks[0].spotify_track_id, TRACK_B);
        assert_eq!(all.blocked_tracks[1].spotify_track_id, TRACK_A);

        assert_eq!(store.active_track_ids(&user).await.unwrap(), vec![TRACK_B.to_string()]);
        assert!(store.is_blocked(&user, &id(TRACK_B)).await.unwrap());
        assert!(!store.is_blocked(&user, &id(TRACK_A)).await.unwrap());
    }

    #[tokio::test]
    async fn test_unblock() {
        let (_, store) = stores().await;
        let user = UserId::new("user-1");

        store.block(&user, &id(TRACK_A), BlockDuration::Permanent).await.unwrap();
        store.unblock(&user, &id(TRACK_A)).await.unwrap();

        let err = store.unblock(&user, &id(TRACK_A)).await.unwrap_err();
        assert!(matches!(err, ServiceError::TrackNotFound { .. }));
    }

    #[tokio::test]
    async fn test_blocks_are_per_user() {
        let (_, store) = stores().await;
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        store.block(&alice, &id(TRACK_A), BlockDuration::Permanent).await.unwrap();
        store.block(&bob, &id(TRACK_A), BlockDuration::Permanent).await.unwrap();

        let err = store.unblock(&bob, &id(TRACK_B)).await.unwrap_err();
        assert!(matches!(err, ServiceError::TrackNotFound { .. }));
        assert_eq!(store.list(&alice, true, Page::default()).await.unwrap().total_count, 1);
    }

    #[tokio::test]
    async fn test_insert_race_maps_to_duplicate() {
        let (_, blocked) = stores().await;
        let user = UserId::new("user-1");
        let now = time::now();

        blocked.block(&user, &id(TRACK_A), BlockDuration::Permanent).await.unwrap();

        // Skips the existing-row check, as a concurrent block would
        let mut conn = blocked.pool.acquire().await.unwrap();
        let err = BlockStore::insert(&mut conn, &user, &id(TRACK_A), None, now)
            .await
            .unwrap_err();
        drop(conn);

        assert!(matches!(
            err,
            ServiceError::DuplicateTrack {
                collection: TrackCollection::Blocked,
                ..
            }
        ));
        assert_eq!(blocked.active_track_ids(&user).await.unwrap().len(), 1);
    }
}

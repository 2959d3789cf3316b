//! Library store: the tracks a user has saved
//!
//! The library may never be emptied: recommendations need a seed track, so
//! removing the only remaining track fails with [`ServiceError::LastTrack`].

use chrono::{DateTime, Utc};
use mpf_common::db::LibraryEntry;
use mpf_common::{time, SpotifyTrackId};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use super::{is_unique_violation, ACTIVE_BLOCK_PREDICATE};
use crate::auth::UserId;
use crate::error::{ServiceError, ServiceResult, TrackCollection};
use crate::pagination::Page;

/// One page of library entries plus the total
#[derive(Debug, Clone, Serialize)]
pub struct LibraryTrackList {
    pub tracks: Vec<LibraryEntry>,
    pub total_count: i64,
}

/// CRUD over `library_tracks`
#[derive(Clone)]
pub struct LibraryStore {
    pool: SqlitePool,
    reject_blocked_tracks: bool,
}

impl LibraryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            reject_blocked_tracks: false,
        }
    }

    /// Also refuse to add tracks that are actively blocked
    pub fn with_block_check(mut self, enabled: bool) -> Self {
        self.reject_blocked_tracks = enabled;
        self
    }

    pub async fn contains(&self, user: &UserId, track_id: &SpotifyTrackId) -> ServiceResult<bool> {
        self.exists(user, track_id)
            .await
            .map_err(|e| self.fail("library.contains", user, Some(track_id), e.into()))
    }

    /// Every track id in the user's library
    pub async fn track_ids(&self, user: &UserId) -> ServiceResult<Vec<String>> {
        sqlx::query_scalar("SELECT spotify_track_id FROM library_tracks WHERE user_id = ?")
            .bind(user.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| self.fail("library.track_ids", user, None, e.into()))
    }

    pub async fn count(&self, user: &UserId) -> ServiceResult<i64> {
        self.count_rows(user)
            .await
            .map_err(|e| self.fail("library.count", user, None, e.into()))
    }

    /// Newest-first page of the user's library
    pub async fn list(&self, user: &UserId, page: Page) -> ServiceResult<LibraryTrackList> {
        let total_count = self
            .count_rows(user)
            .await
            .map_err(|e| self.fail("library.list", user, None, e.into()))?;

        let tracks = sqlx::query_as::<_, LibraryEntry>(
            "SELECT id, user_id, spotify_track_id, created_at
             FROM library_tracks
             WHERE user_id = ?
             ORDER BY created_at DESC, id DESC
             LIMIT ? OFFSET ?",
        )
        .bind(user.as_str())
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| self.fail("library.list", user, None, e.into()))?;

        Ok(LibraryTrackList {
            tracks,
            total_count,
        })
    }

    /// Add a track; fails with `DuplicateTrack` if it is already saved
    pub async fn add(&self, user: &UserId, track_id: &SpotifyTrackId) -> ServiceResult<LibraryEntry> {
        self.add_inner(user, track_id)
            .await
            .map_err(|e| self.fail("library.add", user, Some(track_id), e))
    }

    async fn add_inner(&self, user: &UserId, track_id: &SpotifyTrackId) -> ServiceResult<LibraryEntry> {
        let duplicate = || ServiceError::DuplicateTrack {
            collection: TrackCollection::Library,
            track_id: track_id.to_string(),
        };

        if self.exists(user, track_id).await? {
            return Err(duplicate());
        }

        let now = time::now();

        if self.reject_blocked_tracks && self.is_actively_blocked(user, track_id, now).await? {
            return Err(ServiceError::TrackBlocked(track_id.to_string()));
        }

        let entry = self.insert(user, track_id, now).await?;

        info!(user_id = %user, track_id = %track_id, "Track added to library");
        Ok(entry)
    }

    /// Remove a track; refuses to remove the user's last track
    pub async fn remove(&self, user: &UserId, track_id: &SpotifyTrackId) -> ServiceResult<()> {
        self.remove_inner(user, track_id)
            .await
            .map_err(|e| self.fail("library.remove", user, Some(track_id), e))
    }

    async fn remove_inner(&self, user: &UserId, track_id: &SpotifyTrackId) -> ServiceResult<()> {
        let not_found = || ServiceError::TrackNotFound {
            collection: TrackCollection::Library,
            track_id: track_id.to_string(),
        };

        if !self.exists(user, track_id).await? {
            return Err(not_found());
        }

        if self.delete_unless_last(user, track_id).await? == 0 {
            // Either the only track or removed concurrently
            return Err(if self.exists(user, track_id).await? {
                ServiceError::LastTrack
            } else {
                not_found()
            });
        }

        info!(user_id = %user, track_id = %track_id, "Track removed from library");
        Ok(())
    }

    /// Insert a row; a unique violation (lost race with a concurrent add)
    /// maps to `DuplicateTrack`
    async fn insert(
        &self,
        user: &UserId,
        track_id: &SpotifyTrackId,
        now: DateTime<Utc>,
    ) -> ServiceResult<LibraryEntry> {
        sqlx::query_as::<_, LibraryEntry>(
            "INSERT INTO library_tracks (user_id, spotify_track_id, created_at)
             VALUES (?, ?, ?)
             RETURNING id, user_id, spotify_track_id, created_at",
        )
        .bind(user.as_str())
        .bind(track_id.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::DuplicateTrack {
                    collection: TrackCollection::Library,
                    track_id: track_id.to_string(),
                }
            } else {
                e.into()
            }
        })
    }

    /// Delete the track only while the user keeps at least one other;
    /// the count and the delete are one statement
    async fn delete_unless_last(
        &self,
        user: &UserId,
        track_id: &SpotifyTrackId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM library_tracks
             WHERE user_id = ? AND spotify_track_id = ?
               AND (SELECT COUNT(*) FROM library_tracks WHERE user_id = ?) > 1",
        )
        .bind(user.as_str())
        .bind(track_id.as_str())
        .bind(user.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn exists(&self, user: &UserId, track_id: &SpotifyTrackId) -> Result<bool, sqlx::Error> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM library_tracks WHERE user_id = ? AND spotify_track_id = ?",
        )
        .bind(user.as_str())
        .bind(track_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(found.is_some())
    }

    async fn count_rows(&self, user: &UserId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM library_tracks WHERE user_id = ?")
            .bind(user.as_str())
            .fetch_one(&self.pool)
            .await
    }

    async fn is_actively_blocked(
        &self,
        user: &UserId,
        track_id: &SpotifyTrackId,
        now: DateTime<Utc>,
    ) -> ServiceResult<bool> {
        let sql = format!(
            "SELECT COUNT(*) FROM blocked_tracks
             WHERE user_id = ? AND spotify_track_id = ? AND {}",
            ACTIVE_BLOCK_PREDICATE
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(user.as_str())
            .bind(track_id.as_str())
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    fn fail(
        &self,
        operation: &str,
        user: &UserId,
        track_id: Option<&SpotifyTrackId>,
        err: ServiceError,
    ) -> ServiceError {
        err.log(operation, user.as_str(), track_id.map(SpotifyTrackId::as_str));
        err
    }
}

//! Database row models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::is_block_active;

/// A track saved in a user's library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LibraryEntry {
    pub id: i64,
    pub user_id: String,
    pub spotify_track_id: String,
    pub created_at: DateTime<Utc>,
}

/// A track a user has blocked from recommendations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BlockedTrack {
    pub id: i64,
    pub user_id: String,
    pub spotify_track_id: String,
    /// `None` = permanent
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl BlockedTrack {
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        is_block_active(self.expires_at, at)
    }
}

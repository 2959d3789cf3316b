//! Per-user track collections backed by SQLite
//!
//! Duplicate prevention relies on the `UNIQUE (user_id, spotify_track_id)`
//! constraints. The existence pre-checks only produce friendlier errors;
//! a unique violation on insert is mapped to the same error.

pub mod blocked;
pub mod library;

pub use blocked::{BlockStore, BlockedTrackList};
pub use library::{LibraryStore, LibraryTrackList};

/// SQL predicate selecting active blocks; binds one timestamp (now)
pub(crate) const ACTIVE_BLOCK_PREDICATE: &str = "(expires_at IS NULL OR expires_at > ?)";

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

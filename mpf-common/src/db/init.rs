//! Database initialization
//!
//! Creates the database file on first run and applies the schema
//! idempotently (`CREATE TABLE IF NOT EXISTS`), so startup against an
//! existing database is safe.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (or create) the database file and apply the schema
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL lets request handlers read while another connection writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the schema applied
///
/// Each SQLite `:memory:` connection is its own database, so the pool is
/// capped at one connection.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables and indexes
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_library_tracks_table(pool).await?;
    create_blocked_tracks_table(pool).await?;
    Ok(())
}

async fn create_library_tracks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS library_tracks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            spotify_track_id TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL,
            UNIQUE (user_id, spotify_track_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_library_tracks_user_created
         ON library_tracks (user_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_blocked_tracks_table(pool: &SqlitePool) -> Result<()> {
    // expires_at NULL = permanent block
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blocked_tracks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            spotify_track_id TEXT NOT NULL,
            expires_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL,
            UNIQUE (user_id, spotify_track_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_blocked_tracks_user_created
         ON blocked_tracks (user_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

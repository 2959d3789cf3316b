//! Startup and value-parsing errors shared by the MetalPathfinder crates
//!
//! Request-level failures live in `mpf_api::error::ServiceError`; this enum
//! covers what can go wrong before a request is served.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable config file, bad TOML or missing credentials
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid Spotify track ID {0:?}: expected 22 alphanumeric characters")]
    InvalidTrackId(String),

    #[error("Invalid block duration {0:?}: expected \"1d\", \"7d\" or \"permanent\"")]
    InvalidDuration(String),
}

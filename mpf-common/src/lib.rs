//! # MetalPathfinder Common Library
//!
//! Shared code for the MetalPathfinder service crates:
//! - Configuration loading
//! - Database initialization and row models
//! - Spotify track ID validation
//! - Block duration / expiry computation

pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod track_id;

pub use error::{Error, Result};
pub use time::BlockDuration;
pub use track_id::SpotifyTrackId;

//! Spotify track identifiers
//!
//! Spotify IDs are base-62 strings of exactly 22 characters. Every ID that
//! crosses the HTTP boundary is validated through [`SpotifyTrackId::parse`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Length of a Spotify base-62 ID
pub const SPOTIFY_ID_LEN: usize = 22;

/// Validated Spotify track ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SpotifyTrackId(String);

impl SpotifyTrackId {
    /// Parse and validate a track ID (exactly 22 ASCII alphanumerics)
    pub fn parse(raw: &str) -> Result<Self> {
        if is_valid_spotify_id(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(Error::InvalidTrackId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Check the 22-alphanumeric shape without allocating
pub fn is_valid_spotify_id(raw: &str) -> bool {
    raw.len() == SPOTIFY_ID_LEN && raw.bytes().all(|b| b.is_ascii_alphanumeric())
}

impl fmt::Display for SpotifyTrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SpotifyTrackId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SpotifyTrackId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        if is_valid_spotify_id(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidTrackId(value))
        }
    }
}

impl From<SpotifyTrackId> for String {
    fn from(id: SpotifyTrackId) -> Self {
        id.0
    }
}

impl std::str::FromStr for SpotifyTrackId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

//! Timestamp utilities and block expiry computation

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Current UTC timestamp, truncated to millisecond precision
///
/// Stored timestamps are compared as text by SQLite, so every value written
/// goes through this function to keep the encoding uniform.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// How long a track stays blocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlockDuration {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
    #[default]
    #[serde(rename = "permanent")]
    Permanent,
}

impl BlockDuration {
    /// Wire label ("1d", "7d", "permanent")
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockDuration::OneDay => "1d",
            BlockDuration::SevenDays => "7d",
            BlockDuration::Permanent => "permanent",
        }
    }

    /// Expiry for a block created at `created_at`; `None` is permanent
    pub fn expires_at(&self, created_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            BlockDuration::OneDay => Some(created_at + Duration::hours(24)),
            BlockDuration::SevenDays => Some(created_at + Duration::hours(168)),
            BlockDuration::Permanent => None,
        }
    }
}

impl fmt::Display for BlockDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BlockDuration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1d" => Ok(BlockDuration::OneDay),
            "7d" => Ok(BlockDuration::SevenDays),
            "permanent" => Ok(BlockDuration::Permanent),
            other => Err(Error::InvalidDuration(other.to_string())),
        }
    }
}

/// Whether a block with the given expiry is active at `at`
pub fn is_block_active(expires_at: Option<DateTime<Utc>>, at: DateTime<Utc>) -> bool {
    match expires_at {
        None => true,
        Some(expiry) => expiry > at,
    }
}

//! Track Catalog Gateway
//!
//! [`CatalogGateway`] is the seam between the recommendation pipeline and
//! the music catalog. [`SpotifyClient`] is the production implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::upstream::UpstreamError;

mod spotify;
mod token;

pub use spotify::SpotifyClient;

/// Spotify caps batch track lookups at 50 ids per call
pub const MAX_BATCH_IDS: usize = 50;

/// Artist reference embedded in a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistRef {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

/// Album artwork
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

/// Album summary embedded in a track
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: Option<String>,
}

/// Full track metadata as returned by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub album: Album,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

impl CatalogTrack {
    pub fn primary_artist(&self) -> Option<&ArtistRef> {
        self.artists.first()
    }

    pub fn artist_names(&self) -> Vec<String> {
        self.artists.iter().map(|a| a.name.clone()).collect()
    }

    /// "Title by Artist, Artist"
    pub fn display_name(&self) -> String {
        if self.artists.is_empty() {
            self.name.clone()
        } else {
            format!("{} by {}", self.name, self.artist_names().join(", "))
        }
    }
}

/// Artist details (genres feed the generator prompt)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistDetails {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// Music catalog operations used by the service
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Free-text track search, most relevant first
    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<CatalogTrack>, UpstreamError>;

    /// Top match for an exact (title, artist) pair, if any
    async fn find_track(&self, title: &str, artist: &str) -> Result<Option<CatalogTrack>, UpstreamError>;

    async fn get_track(&self, id: &str) -> Result<CatalogTrack, UpstreamError>;

    /// Batch lookup; unknown ids are skipped, duplicates removed
    async fn get_tracks(&self, ids: &[String]) -> Result<Vec<CatalogTrack>, UpstreamError>;

    async fn get_artist(&self, id: &str) -> Result<ArtistDetails, UpstreamError>;
}

/// Drop repeated ids, keeping first occurrence order
pub(crate) fn dedup_ids(ids: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

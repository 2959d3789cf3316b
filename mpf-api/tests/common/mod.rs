//! In-process fakes for the catalog and generator seams

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use mpf_api::catalog::{Album, ArtistDetails, ArtistRef, CatalogGateway, CatalogTrack, ExternalUrls};
use mpf_api::generator::{
    GenerationRequest, GeneratorError, RecommendationCandidate, RecommendationGenerator,
};
use mpf_api::upstream::UpstreamError;

pub const USER: &str = "user-1";

/// Deterministic 22-character track id
pub fn tid(n: usize) -> String {
    format!("trk{:019}", n)
}

pub fn track(id: &str, name: &str, artist: &str) -> CatalogTrack {
    CatalogTrack {
        id: id.to_string(),
        name: name.to_string(),
        artists: vec![ArtistRef {
            id: Some(format!("artist-{}", artist.to_lowercase().replace(' ', "-"))),
            name: artist.to_string(),
        }],
        album: Album {
            name: format!("{} (Album)", name),
            ..Album::default()
        },
        duration_ms: 240_000,
        popularity: Some(42),
        preview_url: None,
        external_urls: ExternalUrls {
            spotify: Some(format!("https://open.spotify.com/track/{}", id)),
        },
    }
}

pub fn candidate(title: &str, artist: &str, confidence: f64) -> RecommendationCandidate {
    RecommendationCandidate {
        song_title: title.to_string(),
        artist_name: artist.to_string(),
        reasoning: format!("{} fits the mood", title),
        confidence,
    }
}

/// Catalog with a fixed set of tracks, searchable by exact (title, artist)
#[derive(Default)]
pub struct FakeCatalog {
    tracks: HashMap<String, CatalogTrack>,
    by_pair: HashMap<(String, String), String>,
    /// Titles whose lookup fails with an upstream error
    failing_titles: HashSet<String>,
    fail_batch: bool,
    fail_artist: bool,
    pub find_calls: AtomicUsize,
    /// Id count of each batch lookup
    pub batch_sizes: Mutex<Vec<usize>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_track(mut self, track: CatalogTrack) -> Self {
        let artist = track.primary_artist().map(|a| a.name.clone()).unwrap_or_default();
        self.by_pair
            .insert((track.name.to_lowercase(), artist.to_lowercase()), track.id.clone());
        self.tracks.insert(track.id.clone(), track);
        self
    }

    /// Resolve (title, artist) to an existing track id
    pub fn with_alias(mut self, title: &str, artist: &str, id: &str) -> Self {
        self.by_pair
            .insert((title.to_lowercase(), artist.to_lowercase()), id.to_string());
        self
    }

    pub fn failing_title(mut self, title: &str) -> Self {
        self.failing_titles.insert(title.to_string());
        self
    }

    pub fn failing_batch(mut self) -> Self {
        self.fail_batch = true;
        self
    }

    pub fn failing_artist(mut self) -> Self {
        self.fail_artist = true;
        self
    }

    fn unavailable() -> UpstreamError {
        UpstreamError::Unavailable {
            service: "spotify",
            message: "fake outage".into(),
        }
    }
}

#[async_trait]
impl CatalogGateway for FakeCatalog {
    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<CatalogTrack>, UpstreamError> {
        let q = query.to_lowercase();
        let mut hits: Vec<CatalogTrack> = self
            .tracks
            .values()
            .filter(|t| t.name.to_lowercase().contains(&q))
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.id.cmp(&b.id));
        hits.truncate(limit as usize);
        Ok(hits)
    }

    async fn find_track(&self, title: &str, artist: &str) -> Result<Option<CatalogTrack>, UpstreamError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_titles.contains(title) {
            return Err(Self::unavailable());
        }
        Ok(self
            .by_pair
            .get(&(title.to_lowercase(), artist.to_lowercase()))
            .and_then(|id| self.tracks.get(id))
            .cloned())
    }

    async fn get_track(&self, id: &str) -> Result<CatalogTrack, UpstreamError> {
        self.tracks.get(id).cloned().ok_or_else(|| UpstreamError::NotFound {
            service: "spotify",
            message: format!("non existing id: {}", id),
        })
    }

    async fn get_tracks(&self, ids: &[String]) -> Result<Vec<CatalogTrack>, UpstreamError> {
        self.batch_sizes.lock().unwrap().push(ids.len());
        if self.fail_batch {
            return Err(Self::unavailable());
        }
        let mut seen = HashSet::new();
        Ok(ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .filter_map(|id| self.tracks.get(id).cloned())
            .collect())
    }

    async fn get_artist(&self, id: &str) -> Result<ArtistDetails, UpstreamError> {
        if self.fail_artist {
            return Err(Self::unavailable());
        }
        Ok(ArtistDetails {
            id: id.to_string(),
            name: id.trim_start_matches("artist-").to_string(),
            genres: vec!["heavy metal".to_string()],
        })
    }
}

/// Generator returning a scripted candidate list
pub struct FakeGenerator {
    candidates: Result<Vec<RecommendationCandidate>, UpstreamError>,
    malformed: bool,
    failing_bios: HashSet<String>,
    pub last_request: Mutex<Option<GenerationRequest>>,
    pub bio_calls: AtomicUsize,
}

impl FakeGenerator {
    pub fn new(candidates: Vec<RecommendationCandidate>) -> Self {
        Self {
            candidates: Ok(candidates),
            malformed: false,
            failing_bios: HashSet::new(),
            last_request: Mutex::new(None),
            bio_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: UpstreamError) -> Self {
        Self {
            candidates: Err(err),
            ..Self::new(Vec::new())
        }
    }

    pub fn malformed() -> Self {
        Self {
            malformed: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn failing_bio(mut self, artist: &str) -> Self {
        self.failing_bios.insert(artist.to_string());
        self
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecommendationGenerator for FakeGenerator {
    fn model(&self) -> &str {
        "fake-model"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<RecommendationCandidate>, GeneratorError> {
        *self.last_request.lock().unwrap() = Some(request.clone());
        if self.malformed {
            return Err(GeneratorError::Malformed("expected value at line 1".into()));
        }
        self.candidates.clone().map_err(GeneratorError::from)
    }

    async fn artist_bio(&self, artist_name: &str) -> Result<String, GeneratorError> {
        self.bio_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_bios.contains(artist_name) {
            return Err(GeneratorError::Upstream(UpstreamError::Unavailable {
                service: "ai",
                message: "fake outage".into(),
            }));
        }
        Ok(format!("{} is a metal band.", artist_name))
    }
}

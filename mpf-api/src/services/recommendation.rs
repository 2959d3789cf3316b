//! Recommendation pipeline
//!
//! Turns a base track and a mood description into catalog tracks the user
//! has neither saved nor blocked:
//!
//! 1. base track must be in the caller's library
//! 2. fetch seed metadata (track, primary artist genres)
//! 3. exclusion set = library ids ∪ active block ids (fetched concurrently)
//! 4. best-effort "title by artist" names for the exclusion set
//! 5. ask the generator for `2 × count` candidates
//! 6. resolve every candidate to a catalog id concurrently
//! 7. drop unresolved, excluded and repeated ids
//! 8. batch-fetch full track details
//! 9. truncate to `count`, then fetch artist biographies concurrently
//!
//! Each resolved id carries the index of the candidate that produced it, so
//! reasoning and confidence are attached without re-matching by title.
//! Nothing is retried; a failed request must be resubmitted in full.

use futures::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use mpf_common::SpotifyTrackId;

use crate::auth::UserId;
use crate::catalog::{Album, ArtistRef, CatalogGateway, CatalogTrack, MAX_BATCH_IDS};
use crate::error::{ServiceError, ServiceResult};
use crate::generator::{
    GenerationRequest, GeneratorError, RecommendationCandidate, RecommendationGenerator, SeedTrack,
};
use crate::store::{BlockStore, LibraryStore};

/// Substituted when a biography cannot be generated
pub const BIO_FALLBACK: &str = "Artist biography not available.";

/// Confidence used when no originating candidate is known
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

const PREVIEW_CHARS: usize = 100;

/// Validated pipeline input
#[derive(Debug, Clone)]
pub struct RecommendationParams {
    pub base_track_id: SpotifyTrackId,
    /// Already trimmed
    pub description: String,
    pub temperature: f32,
    pub count: usize,
}

/// One recommended track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRecommendation {
    pub spotify_track_id: String,
    pub name: String,
    pub artists: Vec<ArtistRef>,
    pub album: Album,
    pub duration_ms: u64,
    pub preview_url: Option<String>,
    pub external_url: Option<String>,
    pub ai_reasoning: String,
    pub artist_bio: String,
    pub popularity_score: u32,
    pub recommendation_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationMetadata {
    pub model_used: String,
    pub temperature: f32,
    pub description_preview: String,
    pub excluded_tracks_count: usize,
    pub generation_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<ResolvedRecommendation>,
    pub base_track: CatalogTrack,
    pub generation_metadata: GenerationMetadata,
}

/// Orchestrates stores, catalog and generator for one request at a time
#[derive(Clone)]
pub struct RecommendationService {
    library: LibraryStore,
    blocked: BlockStore,
    catalog: Arc<dyn CatalogGateway>,
    generator: Arc<dyn RecommendationGenerator>,
}

impl RecommendationService {
    pub fn new(
        library: LibraryStore,
        blocked: BlockStore,
        catalog: Arc<dyn CatalogGateway>,
        generator: Arc<dyn RecommendationGenerator>,
    ) -> Self {
        Self {
            library,
            blocked,
            catalog,
            generator,
        }
    }

    pub async fn generate(
        &self,
        user: &UserId,
        params: RecommendationParams,
    ) -> ServiceResult<RecommendationResponse> {
        let base_id = params.base_track_id.to_string();
        self.run(user, params).await.map_err(|e| {
            e.log("recommendations.generate", user.as_str(), Some(&base_id));
            e
        })
    }

    async fn run(
        &self,
        user: &UserId,
        params: RecommendationParams,
    ) -> ServiceResult<RecommendationResponse> {
        let started = Instant::now();

        if !self.library.contains(user, &params.base_track_id).await? {
            return Err(ServiceError::NotFound(format!(
                "Base track {} is not in your library",
                params.base_track_id
            )));
        }

        let base_track = self.catalog.get_track(params.base_track_id.as_str()).await?;
        let seed = self.seed_metadata(&base_track).await;

        let excluded = self.exclusion_set(user).await?;
        let exclude_names = self.exclusion_names(&excluded).await;

        let request = GenerationRequest {
            seed,
            description: params.description.clone(),
            temperature: params.temperature,
            exclude: exclude_names,
            count: params.count * 2,
        };
        let candidates = self
            .generator
            .generate(&request)
            .await
            .map_err(generation_error)?;

        let resolutions = self.resolve_candidates(&candidates).await;
        let selected = select_candidate_ids(resolutions, &excluded);
        if selected.is_empty() {
            return Err(ServiceError::NoMatchingTracks);
        }

        let ids: Vec<String> = selected.iter().map(|(id, _)| id.clone()).collect();
        let origin: HashMap<String, usize> = selected.into_iter().collect();

        let mut tracks = self.catalog.get_tracks(&ids).await?;
        // The catalog may relink an id; keep the invariant on what it returned
        let mut returned = HashSet::new();
        tracks.retain(|t| !excluded.contains(&t.id) && returned.insert(t.id.clone()));
        tracks.truncate(params.count);

        let bios = self.artist_bios(&tracks).await;

        let recommendations: Vec<ResolvedRecommendation> = tracks
            .into_iter()
            .zip(bios)
            .map(|(track, bio)| {
                let candidate = origin.get(&track.id).and_then(|&idx| candidates.get(idx));
                assemble(track, candidate, bio)
            })
            .collect();

        let metadata = GenerationMetadata {
            model_used: self.generator.model().to_string(),
            temperature: params.temperature,
            description_preview: description_preview(&params.description),
            excluded_tracks_count: excluded.len(),
            generation_time_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            user_id = %user,
            base_track_id = %params.base_track_id,
            candidates = candidates.len(),
            returned = recommendations.len(),
            excluded = metadata.excluded_tracks_count,
            elapsed_ms = metadata.generation_time_ms,
            "Recommendations generated"
        );

        Ok(RecommendationResponse {
            recommendations,
            base_track,
            generation_metadata: metadata,
        })
    }

    /// Seed metadata; genres are best-effort
    async fn seed_metadata(&self, track: &CatalogTrack) -> SeedTrack {
        let mut genres = Vec::new();

        if let Some(artist_id) = track.primary_artist().and_then(|a| a.id.as_deref()) {
            match self.catalog.get_artist(artist_id).await {
                Ok(artist) => genres = artist.genres,
                Err(e) => warn!(artist_id, error = %e, "Could not fetch seed artist genres"),
            }
        }

        SeedTrack {
            name: track.name.clone(),
            artists: track.artist_names(),
            genres,
        }
    }

    /// Library ids ∪ active block ids; either failure aborts
    async fn exclusion_set(&self, user: &UserId) -> ServiceResult<HashSet<String>> {
        let (library_ids, blocked_ids) = tokio::try_join!(
            self.library.track_ids(user),
            self.blocked.active_track_ids(user)
        )?;

        Ok(library_ids.into_iter().chain(blocked_ids).collect())
    }

    /// Human-readable names for the generator, at most one catalog batch;
    /// empty on failure
    async fn exclusion_names(&self, excluded: &HashSet<String>) -> Vec<String> {
        if excluded.is_empty() {
            return Vec::new();
        }

        let mut ids: Vec<String> = excluded.iter().cloned().collect();
        ids.sort();
        ids.truncate(MAX_BATCH_IDS);

        match self.catalog.get_tracks(&ids).await {
            Ok(tracks) => tracks.iter().map(CatalogTrack::display_name).collect(),
            Err(e) => {
                warn!(excluded = ids.len(), error = %e, "Could not name excluded tracks, continuing without");
                Vec::new()
            }
        }
    }

    /// (candidate index, catalog id) per candidate; failures become `None`
    async fn resolve_candidates(
        &self,
        candidates: &[RecommendationCandidate],
    ) -> Vec<Option<(usize, String)>> {
        let lookups = candidates.iter().enumerate().map(|(idx, candidate)| async move {
            match self
                .catalog
                .find_track(&candidate.song_title, &candidate.artist_name)
                .await
            {
                Ok(Some(track)) => Some((idx, track.id)),
                Ok(None) => {
                    debug!(
                        title = %candidate.song_title,
                        artist = %candidate.artist_name,
                        "Candidate not found in catalog"
                    );
                    None
                }
                Err(e) => {
                    warn!(
                        title = %candidate.song_title,
                        artist = %candidate.artist_name,
                        error = %e,
                        "Candidate lookup failed"
                    );
                    None
                }
            }
        });

        join_all(lookups).await
    }

    /// Biography per track, in track order; failures use [`BIO_FALLBACK`]
    async fn artist_bios(&self, tracks: &[CatalogTrack]) -> Vec<String> {
        let lookups = tracks.iter().map(|track| async move {
            let Some(artist) = track.primary_artist() else {
                return BIO_FALLBACK.to_string();
            };
            match self.generator.artist_bio(&artist.name).await {
                Ok(bio) if !bio.trim().is_empty() => bio,
                Ok(_) => BIO_FALLBACK.to_string(),
                Err(e) => {
                    warn!(artist = %artist.name, error = %e, "Artist biography failed");
                    BIO_FALLBACK.to_string()
                }
            }
        });

        join_all(lookups).await
    }
}

/// Rate limits and outages stay upstream errors; anything else is a
/// generation failure
fn generation_error(err: GeneratorError) -> ServiceError {
    match err {
        GeneratorError::Upstream(upstream) if upstream.is_transient() => {
            ServiceError::Upstream(upstream)
        }
        other => ServiceError::AiGeneration(other.to_string()),
    }
}

/// Keep resolved, non-excluded ids, first occurrence wins
///
/// Returns `(catalog id, candidate index)` in candidate order.
pub fn select_candidate_ids(
    resolutions: Vec<Option<(usize, String)>>,
    excluded: &HashSet<String>,
) -> Vec<(String, usize)> {
    let mut seen = HashSet::new();
    resolutions
        .into_iter()
        .flatten()
        .filter(|(_, id)| !excluded.contains(id))
        .filter(|(_, id)| seen.insert(id.clone()))
        .map(|(idx, id)| (id, idx))
        .collect()
}

fn assemble(
    track: CatalogTrack,
    candidate: Option<&RecommendationCandidate>,
    artist_bio: String,
) -> ResolvedRecommendation {
    ResolvedRecommendation {
        spotify_track_id: track.id,
        name: track.name,
        artists: track.artists,
        album: track.album,
        duration_ms: track.duration_ms,
        preview_url: track.preview_url,
        external_url: track.external_urls.spotify,
        ai_reasoning: candidate.map(|c| c.reasoning.clone()).unwrap_or_default(),
        artist_bio,
        popularity_score: track.popularity.unwrap_or(0),
        recommendation_confidence: candidate.map_or(DEFAULT_CONFIDENCE, |c| c.confidence),
    }
}

/// First 100 characters, with an ellipsis when cut
pub fn description_preview(description: &str) -> String {
    if description.chars().count() <= PREVIEW_CHARS {
        description.to_string()
    } else {
        let cut: String = description.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    }
}

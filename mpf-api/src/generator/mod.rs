//! Recommendation Generator
//!
//! [`RecommendationGenerator`] wraps a text-generation API: it proposes
//! (song, artist) candidates for a seed track and mood, and writes short
//! artist biographies. [`OpenAiClient`] talks to any OpenAI-compatible
//! chat completions endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::upstream::UpstreamError;

mod openai;
pub mod prompt;

pub use openai::OpenAiClient;

/// Seed track metadata passed to the generator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedTrack {
    pub name: String,
    pub artists: Vec<String>,
    pub genres: Vec<String>,
}

/// Everything the generator needs for one candidate batch
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub seed: SeedTrack,
    pub description: String,
    pub temperature: f32,
    /// "Title by Artist" strings the generator should avoid
    pub exclude: Vec<String>,
    pub count: usize,
}

/// A proposed track before catalog resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationCandidate {
    pub song_title: String,
    pub artist_name: String,
    #[serde(default)]
    pub reasoning: String,
    /// Clamped to [0, 1]
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

pub(crate) fn default_confidence() -> f64 {
    0.5
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Malformed generator output: {0}")]
    Malformed(String),

    #[error("Generator returned no usable candidates")]
    Empty,
}

#[async_trait]
pub trait RecommendationGenerator: Send + Sync {
    /// Model identifier reported in response metadata
    fn model(&self) -> &str;

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<RecommendationCandidate>, GeneratorError>;

    async fn artist_bio(&self, artist_name: &str) -> Result<String, GeneratorError>;
}

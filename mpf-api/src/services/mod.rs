//! Multi-step operations spanning stores and upstream gateways

pub mod recommendation;

pub use recommendation::{
    GenerationMetadata, RecommendationParams, RecommendationResponse, RecommendationService,
    ResolvedRecommendation, BIO_FALLBACK,
};

//! mpf-api library - MetalPathfinder HTTP service
//!
//! AI-assisted metal track recommendations seeded from a user's library,
//! with per-user library and blocked-track management.

use axum::Router;
use mpf_common::config::LibraryConfig;
use sqlx::SqlitePool;
use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod catalog;
pub mod error;
pub mod generator;
pub mod pagination;
pub mod services;
pub mod store;
pub mod upstream;

use catalog::CatalogGateway;
use generator::RecommendationGenerator;
use services::RecommendationService;
use store::{BlockStore, LibraryStore};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub library: LibraryStore,
    pub blocked: BlockStore,
    pub catalog: Arc<dyn CatalogGateway>,
    pub recommendations: RecommendationService,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        catalog: Arc<dyn CatalogGateway>,
        generator: Arc<dyn RecommendationGenerator>,
        library_config: &LibraryConfig,
    ) -> Self {
        let library =
            LibraryStore::new(db.clone()).with_block_check(library_config.reject_blocked_tracks);
        let blocked = BlockStore::new(db);
        let recommendations = RecommendationService::new(
            library.clone(),
            blocked.clone(),
            Arc::clone(&catalog),
            generator,
        );

        Self {
            library,
            blocked,
            catalog,
            recommendations,
        }
    }
}

/// Build application router
///
/// Everything except `/health` requires the `X-User-Id` identity header.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{delete, get, post};
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    let protected = Router::new()
        .route("/recommendations", post(api::generate_recommendations))
        .route(
            "/library",
            get(api::list_library).post(api::add_to_library),
        )
        .route("/library/:id", delete(api::remove_from_library))
        .route(
            "/blocked-tracks",
            get(api::list_blocked).post(api::block_track),
        )
        .route("/blocked-tracks/:id", delete(api::unblock_track))
        .route("/tracks/search", get(api::search_tracks))
        .route("/tracks/:id", get(api::get_track))
        .layer(middleware::from_fn(auth::require_user));

    let public = Router::new().merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

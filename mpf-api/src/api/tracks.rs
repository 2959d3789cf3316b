//! Catalog lookup endpoints
//!
//! Thin pass-through to the catalog gateway so clients can find track ids
//! to add to their library.

use axum::{
    extract::rejection::QueryRejection,
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::validation::{query_params, track_id};
use crate::auth::UserId;
use crate::catalog::CatalogTrack;
use crate::error::{ServiceError, ServiceResult};
use crate::upstream::UpstreamError;
use crate::AppState;

const DEFAULT_SEARCH_LIMIT: u32 = 20;
const MAX_SEARCH_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub tracks: Vec<CatalogTrack>,
}

/// GET /tracks/search?q&limit
pub async fn search_tracks(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ServiceResult<Json<SearchResponse>> {
    let query = query_params(query)?;
    let q = query.q.trim();
    if q.is_empty() {
        return Err(ServiceError::validation("q", "q is required"));
    }
    let limit = query
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);

    let tracks = state.catalog.search_tracks(q, limit).await.map_err(|e| {
        let err = ServiceError::from(e);
        err.log("tracks.search", user.as_str(), None);
        err
    })?;

    Ok(Json(SearchResponse { tracks }))
}

/// GET /tracks/:id
pub async fn get_track(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    Path(raw_id): Path<String>,
) -> ServiceResult<Json<CatalogTrack>> {
    let id = track_id("id", &raw_id)?;

    let track = state.catalog.get_track(id.as_str()).await.map_err(|e| {
        // Unknown id is the resource this endpoint names, so it stays a 404
        let err = match e {
            UpstreamError::NotFound { .. } => {
                ServiceError::NotFound(format!("Track {} not found", id))
            }
            other => ServiceError::from(other),
        };
        err.log("tracks.get", user.as_str(), Some(id.as_str()));
        err
    })?;

    Ok(Json(track))
}

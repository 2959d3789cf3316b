//! Library endpoints

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use mpf_common::db::LibraryEntry;
use serde::{Deserialize, Serialize};

use super::validation::{json_body, query_params, track_id};
use crate::auth::UserId;
use crate::error::ServiceResult;
use crate::pagination::Page;
use crate::store::LibraryTrackList;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AddTrackRequest {
    #[serde(default)]
    pub spotify_track_id: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// GET /library?limit&offset
pub async fn list_library(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ServiceResult<Json<LibraryTrackList>> {
    let query = query_params(query)?;
    let page = Page::new(query.limit, query.offset);
    Ok(Json(state.library.list(&user, page).await?))
}

/// POST /library
pub async fn add_to_library(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    body: Result<Json<AddTrackRequest>, JsonRejection>,
) -> ServiceResult<(StatusCode, Json<LibraryEntry>)> {
    let body = json_body(body)?;
    let id = track_id("spotify_track_id", &body.spotify_track_id)?;

    let entry = state.library.add(&user, &id).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// DELETE /library/:id
pub async fn remove_from_library(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    Path(raw_id): Path<String>,
) -> ServiceResult<Json<MessageResponse>> {
    let id = track_id("spotify_track_id", &raw_id)?;
    state.library.remove(&user, &id).await?;

    Ok(Json(MessageResponse {
        message: format!("Track {} removed from library", id),
    }))
}

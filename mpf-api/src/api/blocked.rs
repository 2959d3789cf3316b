//! Blocked-track endpoints

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use mpf_common::db::BlockedTrack;
use mpf_common::{time, BlockDuration, SpotifyTrackId};
use serde::{Deserialize, Serialize};

use super::library::MessageResponse;
use super::validation::{check_track_id, json_body, query_params, track_id};
use crate::auth::UserId;
use crate::error::{FieldError, ServiceError, ServiceResult};
use crate::pagination::Page;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BlockRequest {
    #[serde(default)]
    pub spotify_track_id: String,
    /// "1d", "7d" or "permanent" (default)
    pub duration: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BlockResponse {
    pub spotify_track_id: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub duration: BlockDuration,
}

#[derive(Debug, Deserialize)]
pub struct BlockedListQuery {
    pub active_only: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Block row as listed, with activity evaluated at request time
#[derive(Debug, Serialize)]
pub struct BlockedTrackView {
    pub id: i64,
    pub spotify_track_id: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct BlockedListResponse {
    pub blocked_tracks: Vec<BlockedTrackView>,
    pub total_count: i64,
}

impl BlockRequest {
    fn validate(self) -> ServiceResult<(SpotifyTrackId, BlockDuration)> {
        let mut errors = Vec::new();

        let id = match check_track_id("spotify_track_id", &self.spotify_track_id) {
            Ok(id) => Some(id),
            Err(e) => {
                errors.push(e);
                None
            }
        };

        let duration = match self.duration.as_deref().map(str::parse::<BlockDuration>) {
            None => Some(BlockDuration::default()),
            Some(Ok(duration)) => Some(duration),
            Some(Err(_)) => {
                errors.push(FieldError::new(
                    "duration",
                    "must be one of \"1d\", \"7d\", \"permanent\"",
                ));
                None
            }
        };

        match (id, duration) {
            (Some(id), Some(duration)) => Ok((id, duration)),
            _ => Err(ServiceError::Validation(errors)),
        }
    }
}

/// POST /blocked-tracks
pub async fn block_track(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    body: Result<Json<BlockRequest>, JsonRejection>,
) -> ServiceResult<(StatusCode, Json<BlockResponse>)> {
    let (id, duration) = json_body(body)?.validate()?;

    let blocked = state.blocked.block(&user, &id, duration).await?;
    Ok((
        StatusCode::CREATED,
        Json(BlockResponse {
            spotify_track_id: blocked.spotify_track_id,
            expires_at: blocked.expires_at,
            created_at: blocked.created_at,
            duration,
        }),
    ))
}

/// DELETE /blocked-tracks/:id
pub async fn unblock_track(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    Path(raw_id): Path<String>,
) -> ServiceResult<Json<MessageResponse>> {
    let id = track_id("spotify_track_id", &raw_id)?;
    state.blocked.unblock(&user, &id).await?;

    Ok(Json(MessageResponse {
        message: format!("Track {} unblocked", id),
    }))
}

/// GET /blocked-tracks?active_only&limit&offset
pub async fn list_blocked(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    query: Result<Query<BlockedListQuery>, QueryRejection>,
) -> ServiceResult<Json<BlockedListResponse>> {
    let query = query_params(query)?;
    let page = Page::new(query.limit, query.offset);
    let now = time::now();

    let list = state
        .blocked
        .list_at(&user, query.active_only.unwrap_or(false), page, now)
        .await?;

    Ok(Json(BlockedListResponse {
        blocked_tracks: list
            .blocked_tracks
            .into_iter()
            .map(|row| view(row, now))
            .collect(),
        total_count: list.total_count,
    }))
}

fn view(row: BlockedTrack, now: DateTime<Utc>) -> BlockedTrackView {
    BlockedTrackView {
        is_active: row.is_active_at(now),
        id: row.id,
        spotify_track_id: row.spotify_track_id,
        expires_at: row.expires_at,
        created_at: row.created_at,
    }
}

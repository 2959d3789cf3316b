//! Request validation shared by handlers
//!
//! Malformed bodies, query strings and track ids all surface as
//! `ServiceError::Validation` (422) with per-field messages.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query};
use mpf_common::track_id::{is_valid_spotify_id, SPOTIFY_ID_LEN};
use mpf_common::SpotifyTrackId;

use crate::error::{FieldError, ServiceError, ServiceResult};

/// Unwrap a JSON body, mapping extractor rejections to a validation error
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ServiceResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ServiceError::validation("body", rejection.body_text()))
}

/// Unwrap query parameters, mapping extractor rejections to a validation error
pub fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> ServiceResult<T> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| ServiceError::validation("query", rejection.body_text()))
}

/// Validate a track id field, returning the field error on failure
pub fn check_track_id(field: &str, raw: &str) -> Result<SpotifyTrackId, FieldError> {
    if raw.is_empty() {
        return Err(FieldError::new(field, format!("{} is required", field)));
    }
    if !is_valid_spotify_id(raw) {
        return Err(FieldError::new(
            field,
            format!("must be exactly {} alphanumeric characters", SPOTIFY_ID_LEN),
        ));
    }
    SpotifyTrackId::parse(raw).map_err(|e| FieldError::new(field, e.to_string()))
}

/// [`check_track_id`] as a standalone validation error
pub fn track_id(field: &str, raw: &str) -> ServiceResult<SpotifyTrackId> {
    check_track_id(field, raw).map_err(|e| ServiceError::Validation(vec![e]))
}

//! Service error taxonomy and HTTP mapping
//!
//! Every store, gateway and pipeline failure that reaches a handler is one
//! of these kinds. Database detail is logged, never returned to the caller.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::upstream::UpstreamError;

/// Field-level validation message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Which per-user track collection an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackCollection {
    Library,
    Blocked,
}

impl fmt::Display for TrackCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackCollection::Library => f.write_str("library"),
            TrackCollection::Blocked => f.write_str("blocked tracks"),
        }
    }
}

/// Typed service error
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Track {track_id} is already in {collection}")]
    DuplicateTrack {
        collection: TrackCollection,
        track_id: String,
    },

    #[error("Track {0} is in your library; remove it from the library before blocking it")]
    TrackInLibrary(String),

    #[error("Track {0} is currently blocked; unblock it before adding it to the library")]
    TrackBlocked(String),

    #[error("Track {track_id} not found in {collection}")]
    TrackNotFound {
        collection: TrackCollection,
        track_id: String,
    },

    #[error("Cannot remove the last track from the library")]
    LastTrack,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("AI generation failed: {0}")]
    AiGeneration(String),

    #[error("No matching tracks found")]
    NoMatchingTracks,

    #[error("Missing or empty user identity")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Database(err.to_string())
    }
}

impl ServiceError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Validation(vec![FieldError::new(field, message)])
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::DuplicateTrack { collection, .. } => match collection {
                TrackCollection::Library => StatusCode::BAD_REQUEST,
                TrackCollection::Blocked => StatusCode::CONFLICT,
            },
            ServiceError::TrackInLibrary(_)
            | ServiceError::TrackBlocked(_)
            | ServiceError::LastTrack => StatusCode::BAD_REQUEST,
            ServiceError::TrackNotFound { .. } | ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Upstream(err) => match err {
                UpstreamError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                UpstreamError::Unavailable { .. } | UpstreamError::InvalidResponse { .. } => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                UpstreamError::NotFound { .. } | UpstreamError::Rejected { .. } => {
                    StatusCode::BAD_REQUEST
                }
            },
            ServiceError::AiGeneration(_) | ServiceError::NoMatchingTracks => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::DuplicateTrack { .. } => "DUPLICATE_TRACK",
            ServiceError::TrackInLibrary(_) => "TRACK_IN_LIBRARY",
            ServiceError::TrackBlocked(_) => "TRACK_BLOCKED",
            ServiceError::TrackNotFound { .. } => "TRACK_NOT_FOUND",
            ServiceError::LastTrack => "LAST_TRACK",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Upstream(UpstreamError::RateLimited { .. }) => "UPSTREAM_RATE_LIMITED",
            ServiceError::Upstream(UpstreamError::NotFound { .. }) => "UPSTREAM_NOT_FOUND",
            ServiceError::Upstream(UpstreamError::Rejected { .. }) => "UPSTREAM_REJECTED",
            ServiceError::Upstream(_) => "UPSTREAM_UNAVAILABLE",
            ServiceError::AiGeneration(_) => "AI_GENERATION_ERROR",
            ServiceError::NoMatchingTracks => "NO_MATCHING_TRACKS",
            ServiceError::Unauthorized => "UNAUTHORIZED",
            ServiceError::Database(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to the caller
    fn public_message(&self) -> String {
        match self {
            ServiceError::Database(_) => "An internal error occurred".to_string(),
            ServiceError::AiGeneration(_) => {
                "Failed to generate recommendations, please try again".to_string()
            }
            ServiceError::NoMatchingTracks => "no matching tracks found".to_string(),
            // Upstream bodies go to the log only
            ServiceError::Upstream(err) => {
                let service = err.service();
                match err {
                    UpstreamError::RateLimited { .. } => {
                        format!("{} is rate limiting requests, retry later", service)
                    }
                    UpstreamError::NotFound { .. } => format!("{} resource not found", service),
                    UpstreamError::Rejected { .. } => format!("{} rejected the request", service),
                    UpstreamError::Unavailable { .. } | UpstreamError::InvalidResponse { .. } => {
                        format!("{} is unavailable", service)
                    }
                }
            }
            other => other.to_string(),
        }
    }

    /// Log with operation context at a level matching the error's severity
    pub fn log(&self, operation: &str, user_id: &str, track_id: Option<&str>) {
        let track_id = track_id.unwrap_or("-");
        match self {
            ServiceError::Database(detail) => {
                error!(operation, user_id, track_id, error = %detail, "Database operation failed")
            }
            ServiceError::Upstream(err) => {
                warn!(operation, user_id, track_id, error = %err, "Upstream call failed")
            }
            ServiceError::AiGeneration(detail) => {
                warn!(operation, user_id, track_id, error = %detail, "AI generation failed")
            }
            other => debug!(operation, user_id, track_id, error = %other, "Request rejected"),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            ServiceError::Validation(fields) => json!({
                "error": {
                    "code": self.code(),
                    "message": self.public_message(),
                    "fields": fields,
                }
            }),
            _ => json!({
                "error": {
                    "code": self.code(),
                    "message": self.public_message(),
                }
            }),
        };

        let mut response = (status, Json(body)).into_response();

        if let ServiceError::Upstream(UpstreamError::RateLimited {
            retry_after_secs: Some(secs),
            ..
        }) = &self
        {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

/// Result type for service operations and handlers
pub type ServiceResult<T> = Result<T, ServiceError>;

//! Recommendation endpoint

use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use serde::Deserialize;

use super::validation::{check_track_id, json_body};
use crate::auth::UserId;
use crate::error::{FieldError, ServiceError, ServiceResult};
use crate::services::{RecommendationParams, RecommendationResponse};
use crate::AppState;

pub const MIN_DESCRIPTION_CHARS: usize = 30;
pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const MIN_TEMPERATURE: f32 = 0.1;
pub const MAX_TEMPERATURE: f32 = 1.0;
pub const DEFAULT_COUNT: i64 = 10;
pub const MAX_COUNT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub base_track_id: String,
    #[serde(default)]
    pub description: String,
    pub temperature: Option<f32>,
    pub count: Option<i64>,
}

impl RecommendationRequest {
    /// Check every field, reporting all failures at once
    pub fn validate(self) -> ServiceResult<RecommendationParams> {
        let mut errors = Vec::new();

        let base_track_id = match check_track_id("base_track_id", &self.base_track_id) {
            Ok(id) => Some(id),
            Err(e) => {
                errors.push(e);
                None
            }
        };

        let description = self.description.trim().to_string();
        let chars = description.chars().count();
        if !(MIN_DESCRIPTION_CHARS..=MAX_DESCRIPTION_CHARS).contains(&chars) {
            errors.push(FieldError::new(
                "description",
                format!(
                    "must be between {} and {} characters",
                    MIN_DESCRIPTION_CHARS, MAX_DESCRIPTION_CHARS
                ),
            ));
        }

        let temperature = match self.temperature {
            None => {
                errors.push(FieldError::new("temperature", "temperature is required"));
                MIN_TEMPERATURE
            }
            Some(t) if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&t) => {
                errors.push(FieldError::new(
                    "temperature",
                    format!("must be between {} and {}", MIN_TEMPERATURE, MAX_TEMPERATURE),
                ));
                t
            }
            Some(t) => t,
        };

        let count = self.count.unwrap_or(DEFAULT_COUNT);
        if !(1..=MAX_COUNT).contains(&count) {
            errors.push(FieldError::new(
                "count",
                format!("must be between 1 and {}", MAX_COUNT),
            ));
        }

        match base_track_id {
            Some(base_track_id) if errors.is_empty() => Ok(RecommendationParams {
                base_track_id,
                description,
                temperature,
                count: count as usize,
            }),
            _ => Err(ServiceError::Validation(errors)),
        }
    }
}

/// POST /recommendations
pub async fn generate_recommendations(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    body: Result<Json<RecommendationRequest>, JsonRejection>,
) -> ServiceResult<Json<RecommendationResponse>> {
    let params = json_body(body)?.validate()?;
    Ok(Json(state.recommendations.generate(&user, params).await?))
}

//! OpenAI-compatible chat completions client

use async_trait::async_trait;
use mpf_common::config::AiConfig;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use super::prompt::{
    bio_prompt, parse_candidates, recommendation_prompt, BIO_SYSTEM_PROMPT,
    RECOMMENDATION_SYSTEM_PROMPT,
};
use super::{GenerationRequest, GeneratorError, RecommendationCandidate, RecommendationGenerator};
use crate::upstream::{error_from_response, UpstreamError};

const SERVICE: &str = "ai";
const BIO_TEMPERATURE: f32 = 0.7;
const BIO_MAX_TOKENS: u32 = 200;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Generator backed by `POST {base_url}/chat/completions`
pub struct OpenAiClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::network(SERVICE, e))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Build from configuration; the API key must already be validated
    pub fn from_config(config: &AiConfig) -> Result<Self, UpstreamError> {
        Self::new(
            config.api_key.clone().unwrap_or_default(),
            config.base_url.clone(),
            config.model.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        json_mode: bool,
        max_tokens: Option<u32>,
    ) -> Result<String, GeneratorError> {
        let messages = [
            ChatMessage {
                role: "system",
                content: system,
            },
            ChatMessage {
                role: "user",
                content: user,
            },
        ];

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
        });
        if json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }
        if let Some(max_tokens) = max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::network(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(error_from_response(SERVICE, response).await.into());
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::invalid_response(SERVICE, e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GeneratorError::Empty)
    }
}

#[async_trait]
impl RecommendationGenerator for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<RecommendationCandidate>, GeneratorError> {
        debug!(
            model = %self.model,
            count = request.count,
            excluded = request.exclude.len(),
            "Requesting recommendation candidates"
        );

        let prompt = recommendation_prompt(request);
        let content = self
            .complete(
                RECOMMENDATION_SYSTEM_PROMPT,
                &prompt,
                request.temperature,
                true,
                None,
            )
            .await?;

        let candidates = parse_candidates(&content)?;
        info!(
            model = %self.model,
            requested = request.count,
            received = candidates.len(),
            "Generated recommendation candidates"
        );
        Ok(candidates)
    }

    async fn artist_bio(&self, artist_name: &str) -> Result<String, GeneratorError> {
        let content = self
            .complete(
                BIO_SYSTEM_PROMPT,
                &bio_prompt(artist_name),
                BIO_TEMPERATURE,
                false,
                Some(BIO_MAX_TOKENS),
            )
            .await?;
        Ok(content.trim().to_string())
    }
}

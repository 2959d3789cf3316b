//! Spotify Web API client
//!
//! Client-credentials flow only: the service needs catalog search and
//! lookup, never user-scoped endpoints.

use async_trait::async_trait;
use mpf_common::config::SpotifyConfig;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::token::TokenCache;
use super::{dedup_ids, ArtistDetails, CatalogGateway, CatalogTrack, MAX_BATCH_IDS};
use crate::upstream::{error_from_response, UpstreamError};

const SERVICE: &str = "spotify";
const USER_AGENT: &str = concat!("MetalPathfinder/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<TrackPage>,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<CatalogTrack>,
}

#[derive(Debug, Deserialize)]
struct TracksResponse {
    #[serde(default)]
    tracks: Vec<Option<CatalogTrack>>,
}

/// Spotify catalog gateway
pub struct SpotifyClient {
    http_client: reqwest::Client,
    api_base_url: String,
    accounts_url: String,
    client_id: String,
    client_secret: String,
    token: TokenCache,
}

impl SpotifyClient {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        api_base_url: impl Into<String>,
        accounts_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::network(SERVICE, e))?;

        Ok(Self {
            http_client,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            accounts_url: accounts_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token: TokenCache::new(),
        })
    }

    /// Build from configuration; credentials must already be validated
    pub fn from_config(config: &SpotifyConfig) -> Result<Self, UpstreamError> {
        Self::new(
            config.client_id.clone().unwrap_or_default(),
            config.client_secret.clone().unwrap_or_default(),
            config.api_base_url.clone(),
            config.accounts_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    async fn access_token(&self) -> Result<String, UpstreamError> {
        if let Some(token) = self.token.get().await {
            return Ok(token);
        }

        debug!("Requesting Spotify access token");

        let response = self
            .http_client
            .post(format!("{}/api/token", self.accounts_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| UpstreamError::network(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(error_from_response(SERVICE, response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::invalid_response(SERVICE, e.to_string()))?;

        self.token
            .store(token.access_token.clone(), Duration::from_secs(token.expires_in))
            .await;

        info!(expires_in = token.expires_in, "Obtained Spotify access token");
        Ok(token.access_token)
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, UpstreamError>
    where
        T: serde::de::DeserializeOwned,
    {
        let token = self.access_token().await?;

        let response = self
            .http_client
            .get(format!("{}{}", self.api_base_url, path))
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| UpstreamError::network(SERVICE, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            // Revoked early; the next call re-authenticates
            self.token.invalidate().await;
        }
        if !status.is_success() {
            return Err(error_from_response(SERVICE, response).await);
        }

        response
            .json()
            .await
            .map_err(|e| UpstreamError::invalid_response(SERVICE, e.to_string()))
    }
}

/// Field-filter query for an exact (title, artist) search
pub(crate) fn pair_query(title: &str, artist: &str) -> String {
    let clean = |s: &str| s.replace('"', "").trim().to_string();
    format!("track:\"{}\" artist:\"{}\"", clean(title), clean(artist))
}

#[async_trait]
impl CatalogGateway for SpotifyClient {
    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<CatalogTrack>, UpstreamError> {
        let limit = limit.clamp(1, 50);
        let response: SearchResponse = self
            .get_json(
                "/search",
                &[
                    ("q", query.to_string()),
                    ("type", "track".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        Ok(response.tracks.map(|page| page.items).unwrap_or_default())
    }

    async fn find_track(&self, title: &str, artist: &str) -> Result<Option<CatalogTrack>, UpstreamError> {
        let mut items = self.search_tracks(&pair_query(title, artist), 1).await?;
        if items.is_empty() {
            Ok(None)
        } else {
            Ok(Some(items.swap_remove(0)))
        }
    }

    async fn get_track(&self, id: &str) -> Result<CatalogTrack, UpstreamError> {
        self.get_json(&format!("/tracks/{}", id), &[]).await
    }

    async fn get_tracks(&self, ids: &[String]) -> Result<Vec<CatalogTrack>, UpstreamError> {
        let ids = dedup_ids(ids);
        let mut tracks = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_BATCH_IDS) {
            let response: TracksResponse = self
                .get_json("/tracks", &[("ids", chunk.join(","))])
                .await?;
            tracks.extend(response.tracks.into_iter().flatten());
        }

        Ok(tracks)
    }

    async fn get_artist(&self, id: &str) -> Result<ArtistDetails, UpstreamError> {
        self.get_json(&format!("/artists/{}", id), &[]).await
    }
}

//! Configuration loading
//!
//! Resolution priority (highest first):
//! 1. Command-line arguments (applied by the binary)
//! 2. Environment variables
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing config file is not fatal: a warning is logged and defaults are
//! used. Missing credentials are reported by [`ServiceConfig::validate`].

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "MPF_CONFIG";

const APP_DIR: &str = "metalpathfinder";

/// Top-level service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Socket address the HTTP server binds to
    pub bind: String,
    /// SQLite database file
    pub database_path: PathBuf,
    pub spotify: SpotifyConfig,
    pub ai: AiConfig,
    pub library: LibraryConfig,
}

/// Spotify Web API credentials and endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_base_url: String,
    pub accounts_url: String,
    pub request_timeout_secs: u64,
}

/// OpenAI-compatible completion API settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub request_timeout_secs: u64,
}

/// Library behaviour switches
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Reject adding a track to the library while it is actively blocked.
    /// Off by default: only blocking checks against the library.
    pub reject_blocked_tracks: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5780".to_string(),
            database_path: default_database_path(),
            spotify: SpotifyConfig::default(),
            ai: AiConfig::default(),
            library: LibraryConfig::default(),
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_base_url: "https://api.spotify.com/v1".to_string(),
            accounts_url: "https://accounts.spotify.com".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from TOML and the process environment
    ///
    /// `cli_path` wins over `MPF_CONFIG`, which wins over the platform
    /// config directory (`~/.config/metalpathfinder/config.toml` on Linux).
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let explicit = cli_path.map(Path::to_path_buf).or(env_path);

        let mut config = match explicit {
            // An explicitly named file must exist
            Some(path) => Self::from_toml_file(&path)?,
            None => match default_config_file().filter(|p| p.exists()) {
                Some(path) => Self::from_toml_file(&path)?,
                None => {
                    warn!("No config file found, using compiled defaults");
                    Self::default()
                }
            },
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse TOML config content
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Overlay environment variables using `lookup`
    ///
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("MPF_BIND") {
            self.bind = v;
        }
        if let Some(v) = get("MPF_DATABASE_PATH") {
            self.database_path = PathBuf::from(v);
        }
        if let Some(v) = get("SPOTIFY_CLIENT_ID") {
            self.spotify.client_id = Some(v);
        }
        if let Some(v) = get("SPOTIFY_CLIENT_SECRET") {
            self.spotify.client_secret = Some(v);
        }
        if let Some(v) = get("MPF_AI_API_KEY") {
            self.ai.api_key = Some(v);
        }
        if let Some(v) = get("MPF_AI_BASE_URL") {
            self.ai.base_url = v;
        }
        if let Some(v) = get("MPF_AI_MODEL") {
            self.ai.model = v;
        }
    }

    /// Check that every credential the service needs is present
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.spotify.client_id.as_deref().map_or(true, str::is_empty) {
            missing.push("spotify.client_id (SPOTIFY_CLIENT_ID)");
        }
        if self.spotify.client_secret.as_deref().map_or(true, str::is_empty) {
            missing.push("spotify.client_secret (SPOTIFY_CLIENT_SECRET)");
        }
        if self.ai.api_key.as_deref().map_or(true, str::is_empty) {
            missing.push("ai.api_key (MPF_AI_API_KEY)");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "Missing required settings: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Platform config file location
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./metalpathfinder_data"))
        .join("metalpathfinder.db")
}

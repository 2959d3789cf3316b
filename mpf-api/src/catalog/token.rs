//! Client-credentials token cache
//!
//! Owned by one [`super::SpotifyClient`]; never shared process-wide. A token
//! is considered stale [`EXPIRY_MARGIN`] before Spotify expires it.
//! Concurrent callers that all see a stale token may each re-authenticate;
//! the last write wins, which is harmless.

use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Refresh this long before the real expiry
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

#[derive(Debug, Default)]
pub(crate) struct TokenCache {
    inner: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Cached token if it is still fresh
    pub(crate) async fn get(&self) -> Option<String> {
        let guard = self.inner.read().await;
        guard
            .as_ref()
            .filter(|token| Instant::now() < token.refresh_at)
            .map(|token| token.value.clone())
    }

    pub(crate) async fn store(&self, value: String, expires_in: Duration) {
        let refresh_at = Instant::now() + expires_in.saturating_sub(EXPIRY_MARGIN);
        *self.inner.write().await = Some(CachedToken { value, refresh_at });
    }

    pub(crate) async fn invalidate(&self) {
        *self.inner.write().await = None;
    }
}

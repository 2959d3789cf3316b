//! Errors from the external HTTP services (Spotify, completion API)
//!
//! Both gateways classify failures the same way so the HTTP layer can map
//! them to one status code each.

use thiserror::Error;

/// Failure talking to an external service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("{service} rate limit exceeded")]
    RateLimited {
        service: &'static str,
        retry_after_secs: Option<u64>,
    },

    #[error("{service} unavailable: {message}")]
    Unavailable {
        service: &'static str,
        message: String,
    },

    #[error("{service} resource not found: {message}")]
    NotFound {
        service: &'static str,
        message: String,
    },

    #[error("{service} rejected request ({status}): {message}")]
    Rejected {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{service} returned an invalid response: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },
}

impl UpstreamError {
    /// Classify a non-success HTTP status
    pub fn from_status(
        service: &'static str,
        status: u16,
        retry_after_secs: Option<u64>,
        body: String,
    ) -> Self {
        match status {
            429 => UpstreamError::RateLimited {
                service,
                retry_after_secs,
            },
            404 => UpstreamError::NotFound {
                service,
                message: body,
            },
            // Expired or revoked credentials are an outage from the caller's view
            401 | 403 => UpstreamError::Unavailable {
                service,
                message: format!("authentication failed ({}): {}", status, body),
            },
            400..=499 => UpstreamError::Rejected {
                service,
                status,
                message: body,
            },
            _ => UpstreamError::Unavailable {
                service,
                message: format!("HTTP {}: {}", status, body),
            },
        }
    }

    /// Transport-level failure (connect, timeout, TLS)
    pub fn network(service: &'static str, err: reqwest::Error) -> Self {
        UpstreamError::Unavailable {
            service,
            message: err.to_string(),
        }
    }

    pub fn invalid_response(service: &'static str, message: impl Into<String>) -> Self {
        UpstreamError::InvalidResponse {
            service,
            message: message.into(),
        }
    }

    /// Rate limiting or outage, as opposed to a bad request or bad payload
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            UpstreamError::RateLimited { .. } | UpstreamError::Unavailable { .. }
        )
    }

    /// Name of the failing service, the only detail shown to callers
    pub fn service(&self) -> &'static str {
        match self {
            UpstreamError::RateLimited { service, .. }
            | UpstreamError::Unavailable { service, .. }
            | UpstreamError::NotFound { service, .. }
            | UpstreamError::Rejected { service, .. }
            | UpstreamError::InvalidResponse { service, .. } => service,
        }
    }
}

/// Read the `Retry-After` header as whole seconds
pub(crate) fn retry_after_secs(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Turn a non-success response into an [`UpstreamError`]
pub(crate) async fn error_from_response(
    service: &'static str,
    response: reqwest::Response,
) -> UpstreamError {
    let status = response.status().as_u16();
    let retry_after = retry_after_secs(&response);
    let body = response.text().await.unwrap_or_default();
    UpstreamError::from_status(service, status, retry_after, truncate_body(body))
}

fn truncate_body(mut body: String) -> String {
    const MAX: usize = 500;
    if body.len() > MAX {
        let mut cut = MAX;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

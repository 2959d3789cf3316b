//! Caller identity
//!
//! Authentication is performed by the auth provider's gateway in front of
//! this service; it forwards the authenticated user id in `X-User-Id`.
//! Protected routes run [`require_user`], which rejects requests without
//! the header and stores a [`UserId`] request extension for handlers.

use axum::{extract::Request, middleware::Next, response::Response};
use std::fmt;

use crate::error::ServiceError;

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated user id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Middleware: require a non-empty `X-User-Id` header
pub async fn require_user(mut request: Request, next: Next) -> Result<Response, ServiceError> {
    let user = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(UserId::new)
        .ok_or(ServiceError::Unauthorized)?;

    tracing::trace!(user_id = %user, path = %request.uri().path(), "Authenticated request");

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

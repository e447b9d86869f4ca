//! Terminal outcomes of the security pipeline.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::oidc::OidcError;

/// Why a request was denied or a login could not complete.
///
/// Responses carry the bare status only; internal detail stays in the logs.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// No valid session for a protected path.
    #[error("authentication required")]
    Unauthenticated,

    /// CSRF mismatch or an unauthorized logout attempt.
    #[error("forbidden")]
    Forbidden,

    /// The identity provider could not be reached; no session was created.
    #[error("identity provider unavailable")]
    UpstreamUnavailable,

    /// The ID token failed validation; forces a fresh login.
    #[error("invalid identity token")]
    InvalidToken,
}

impl IntoResponse for SecurityError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Unauthenticated | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
        };
        status.into_response()
    }
}

impl From<OidcError> for SecurityError {
    fn from(err: OidcError) -> Self {
        if err.is_upstream() {
            Self::UpstreamUnavailable
        } else {
            Self::InvalidToken
        }
    }
}

//! OpenID Connect plumbing against the external identity provider.
//!
//! # Data Flow
//! ```text
//! Login start (security::policy):
//!     → client.rs builds the authorization redirect
//! Provider callback:
//!     → callback.rs validates state
//!     → client.rs exchanges the code at the token endpoint
//!     → token.rs validates the ID token against jwks.rs keys
//!     → session store records the authenticated principal
//! Logout:
//!     → logout.rs invalidates locally, then redirects to the
//!       provider end-session endpoint
//! ```
//!
//! # Design Decisions
//! - The provider is opaque: endpoints come from configuration, no discovery
//! - A failed exchange or token validation never leaves a partial session
//! - The security pipeline never retries provider calls

pub mod callback;
pub mod client;
pub mod jwks;
pub mod logout;
pub mod token;

use thiserror::Error;

pub use client::OidcClient;

/// Errors from identity-provider interactions.
#[derive(Debug, Error)]
pub enum OidcError {
    /// A configured endpoint did not parse as a URL.
    #[error("invalid {field} endpoint: {source}")]
    Endpoint {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },

    /// The HTTP client for provider calls could not be built.
    #[error("identity-provider client setup failed: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The token endpoint was unreachable or returned garbage.
    #[error("token exchange failed: {0}")]
    Exchange(#[source] reqwest::Error),

    /// The token endpoint answered with a non-success status.
    #[error("token endpoint returned status {0}")]
    ExchangeStatus(reqwest::StatusCode),

    /// The JWKS endpoint was unreachable or returned garbage.
    #[error("JWKS retrieval failed: {0}")]
    Jwks(#[source] reqwest::Error),

    /// The ID token header carries no key id.
    #[error("ID token has no key id")]
    MissingKeyId,

    /// No published signing key matches the token's key id.
    #[error("no published key matches kid '{0}'")]
    UnknownKeyId(String),

    /// Signature, issuer, audience or expiry validation failed.
    #[error("ID token rejected: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    /// A published RSA key could not be turned into a decoding key.
    #[error("unusable JWKS key '{kid}': {source}")]
    UnusableKey {
        kid: String,
        #[source]
        source: jsonwebtoken::errors::Error,
    },
}

impl OidcError {
    /// True when the failure is the provider being unreachable rather than
    /// the token being bad.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::HttpClient(_) | Self::Exchange(_) | Self::ExchangeStatus(_) | Self::Jwks(_)
        )
    }
}

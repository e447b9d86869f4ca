//! Security subsystem: the request-level decision pipeline.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (writable header view for the rest of the chain)
//!     → policy.rs (classify public vs. authenticated, drive OIDC login)
//!     → csrf.rs (double-submit token on state-changing methods)
//!     → rate_key.rs (stable per-identity key for the limiter)
//!     → rate_limit.rs (token bucket per key)
//!     → Pass to local endpoints or upstream forwarding
//! ```
//!
//! # Design Decisions
//! - Filters are plain `(request, next) -> response` middleware functions
//!   composed in a fixed total order; no filter base type
//! - Fail closed: reject on any security check failure
//! - Each request carries its own context as an extension; nothing hides in
//!   global mutable state

pub mod csrf;
pub mod error;
pub mod headers;
pub mod policy;
pub mod rate_key;
pub mod rate_limit;

use axum::http::header::SET_COOKIE;
use axum::http::HeaderValue;
use axum::response::Response;
use axum_extra::extract::cookie::{Cookie, SameSite};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::session::{Principal, Session};

/// Entropy of generated secrets: 32 alphanumeric chars is ~190 bits.
const TOKEN_LEN: usize = 32;

/// Per-request security context attached by the policy filter and consumed
/// by every later stage.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Snapshot of the caller's session at request start, if any.
    pub session: Option<Session>,
}

impl RequestContext {
    pub fn principal(&self) -> Option<Principal> {
        self.session.as_ref()?.principal()
    }
}

/// Unpredictable token for CSRF values and login state parameters.
pub fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Session cookie: HTTP-only, the browser never reads it.
pub fn session_cookie(name: &str, id: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// CSRF cookie: readable by client script so it can be echoed into the
/// request header.
pub fn csrf_cookie(name: &str, token: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), token.to_string()))
        .path("/")
        .http_only(false)
        .same_site(SameSite::Lax)
        .build()
}

/// Expired variant of a cookie, clearing it from the browser.
pub fn removal_cookie(name: &str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name.to_string(), String::new()))
        .path("/")
        .build();
    cookie.make_removal();
    cookie
}

/// Append a Set-Cookie header to an outgoing response.
pub fn set_cookie(response: &mut Response, cookie: &Cookie<'static>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(_) => {
            tracing::error!(cookie = %cookie.name(), "Dropping unencodable cookie value");
        }
    }
}

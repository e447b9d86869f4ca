//! CSRF guard using the cookie-to-header double-submit pattern.
//!
//! # Responsibilities
//! - Mint one unpredictable token per session
//! - Require cookie, header and session token to agree on state-changing
//!   methods, before any handler runs
//! - Deliver the token via a readable cookie at response-commit time
//!
//! # Design Decisions
//! - Token comparison is constant-time
//! - The Set-Cookie decision reads the session again after the handler has
//!   run, so a token minted downstream, or a session destroyed by logout,
//!   is reflected in the very response being committed
//! - The degraded-response endpoint and the login callback are exempt

use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use subtle::ConstantTimeEq;

use crate::http::server::GatewayState;
use crate::observability::metrics;
use crate::security::{csrf_cookie, random_token, removal_cookie, set_cookie, RequestContext};
use crate::web::fallback::FALLBACK_PATH;

/// Methods that may change state and therefore need a token.
pub fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn tokens_match(expected: &str, presented: &str) -> bool {
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}

/// CSRF filter. Runs after authentication, before key resolution.
pub async fn guard(
    State(state): State<GatewayState>,
    jar: CookieJar,
    request: Request<Body>,
    next: Next,
) -> Response {
    let cfg = &state.config.csrf;
    let path = request.uri().path().to_string();
    let method = request.method().clone();
    let exempt = path == FALLBACK_PATH || path == state.config.oidc.callback_path;

    let ctx = request
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default();

    if is_state_changing(&method) && !exempt {
        let expected = ctx.session.as_ref().and_then(|s| s.csrf_token.as_deref());
        let header = request
            .headers()
            .get(cfg.header_name.as_str())
            .and_then(|value| value.to_str().ok());
        let cookie = jar.get(&cfg.cookie_name).map(|c| c.value());

        let valid = match (expected, header, cookie) {
            (Some(expected), Some(header), Some(cookie)) => {
                tokens_match(expected, header) && tokens_match(expected, cookie)
            }
            _ => false,
        };

        if !valid {
            metrics::record_csrf_rejection();
            tracing::warn!(
                method = %method,
                path = %path,
                "Rejected state-changing request without a valid CSRF pair"
            );
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    // Sessions own their token from the first request on; delivery waits
    // until the response commits below.
    if let Some(session) = ctx.session.as_ref() {
        if session.csrf_token.is_none() {
            state.sessions.update(&session.id, |s| {
                if s.csrf_token.is_none() {
                    s.csrf_token = Some(random_token());
                }
            });
        }
    }

    let session_id = ctx.session.map(|s| s.id);
    let presented_cookie = jar.get(&cfg.cookie_name).map(|c| c.value().to_string());

    let mut response = next.run(request).await;

    // Commit point: read the token as it is now, not as it was created.
    if let Some(id) = session_id {
        match state.sessions.get(&id).and_then(|s| s.csrf_token) {
            Some(token) => {
                if presented_cookie.as_deref() != Some(token.as_str()) {
                    set_cookie(&mut response, &csrf_cookie(&cfg.cookie_name, &token));
                }
            }
            None => {
                // Session vanished during handling (logout).
                if presented_cookie.is_some() {
                    set_cookie(&mut response, &removal_cookie(&cfg.cookie_name));
                }
            }
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_changing_methods() {
        assert!(is_state_changing(&Method::POST));
        assert!(is_state_changing(&Method::PUT));
        assert!(is_state_changing(&Method::PATCH));
        assert!(is_state_changing(&Method::DELETE));
        assert!(!is_state_changing(&Method::GET));
        assert!(!is_state_changing(&Method::HEAD));
        assert!(!is_state_changing(&Method::OPTIONS));
    }

    #[test]
    fn test_tokens_match_exact_only() {
        assert!(tokens_match("abc123", "abc123"));
        assert!(!tokens_match("abc123", "abc124"));
        assert!(!tokens_match("abc123", "abc12"));
        assert!(!tokens_match("", "abc"));
    }
}

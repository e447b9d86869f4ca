//! Degraded responses for unreachable backends.
//!
//! Reads degrade to an empty success so pages keep rendering; writes cannot
//! be faked and answer 503. The handlers touch no session, principal or
//! backend state, so this path works with every other dependency down.

use axum::body::Body;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};

/// Well-known path for the degraded catalog responses.
pub const FALLBACK_PATH: &str = "/catalog-fallback";

pub async fn fallback_get() -> impl IntoResponse {
    (StatusCode::OK, "")
}

pub async fn fallback_post() -> impl IntoResponse {
    StatusCode::SERVICE_UNAVAILABLE
}

/// Synthesize the degraded response for a forwarding failure on a route
/// that opted into fallback.
pub fn degraded(method: &Method) -> Response {
    match *method {
        Method::GET | Method::HEAD => (StatusCode::OK, Body::empty()).into_response(),
        _ => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

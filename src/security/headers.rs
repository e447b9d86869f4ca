//! Writable-header decorator, first in the chain.

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Rebuild the inbound request from its parts so the remainder of the chain
/// sees an owned, mutable header map.
///
/// Pure decorator with no state. Removing it must not change any business
/// outcome, only whether later filters may mutate request headers.
pub async fn writeable_headers(request: Request<Body>, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    next.run(Request::from_parts(parts, body)).await
}

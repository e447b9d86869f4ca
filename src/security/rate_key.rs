//! Rate-limit key resolution.

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::security::RequestContext;

/// Every request without an authenticated identity shares this key, and
/// therefore one bucket. That collapse is deliberate policy.
pub const ANONYMOUS_KEY: &str = "anonymous";

/// Key the limiter buckets by, attached as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateKey(pub String);

/// Map the security context to a bucket key. Pure and side-effect free:
/// the same authenticated subject always yields the same key, and nothing
/// beyond the subject claim leaks into it.
pub fn resolve(ctx: Option<&RequestContext>) -> String {
    ctx.and_then(RequestContext::principal)
        .map(|principal| principal.subject)
        .unwrap_or_else(|| ANONYMOUS_KEY.to_string())
}

/// Filter attaching the resolved key for the limiter and the access log.
pub async fn attach_key(mut request: Request<Body>, next: Next) -> Response {
    let key = resolve(request.extensions().get::<RequestContext>());
    tracing::trace!(rate_key = %key, "Resolved rate-limit key");
    request.extensions_mut().insert(RateKey(key));
    next.run(request).await
}

//! Token-bucket rate limiting keyed by resolved identity.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use crate::config::schema::RateLimitConfig;
use crate::http::server::GatewayState;
use crate::observability::metrics;
use crate::security::rate_key::{RateKey, ANONYMOUS_KEY};

/// A simple token bucket rate limiter.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// State for the per-identity rate limiter. One bucket per resolved key;
/// all anonymous traffic lands in one bucket.
pub struct RateLimiterState {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    enabled: bool,
    rps: f64,
    burst: f64,
}

impl RateLimiterState {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            enabled: config.enabled,
            rps: f64::from(config.requests_per_second),
            burst: f64::from(config.burst_size),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn check(&self, key: &str) -> bool {
        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.burst));

        bucket.try_acquire(self.burst, self.rps)
    }
}

/// Middleware function enforcing the per-key bucket.
pub async fn rate_limit_middleware(
    State(state): State<GatewayState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.limiter.enabled() {
        return next.run(request).await;
    }

    let key = request
        .extensions()
        .get::<RateKey>()
        .map(|key| key.0.clone())
        .unwrap_or_else(|| ANONYMOUS_KEY.to_string());

    if state.limiter.check(&key) {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, "Rate limit exceeded");
        metrics::record_rate_limited("rps_limit");
        let mut response = Response::new(Body::from("Rate limit exceeded"));
        *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
        response
    }
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): forwarded requests by method, status, route
//! - `gateway_request_duration_seconds` (histogram): forwarding latency
//! - `gateway_csrf_rejections_total` (counter): state-changing requests denied
//! - `gateway_rate_limited_total` (counter): requests shed by the limiter
//! - `gateway_logins_total` (counter): login completions by outcome
//! - `gateway_logouts_total` (counter): completed logouts

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => {
            describe_metrics();
            tracing::info!(address = %addr, "Metrics exporter listening");
        }
        Err(error) => {
            tracing::error!(error = %error, "Failed to install metrics exporter");
        }
    }
}

fn describe_metrics() {
    describe_counter!(
        "gateway_requests_total",
        "Requests forwarded to upstreams, by method, status and route"
    );
    describe_histogram!(
        "gateway_request_duration_seconds",
        "Latency of forwarded requests"
    );
    describe_counter!(
        "gateway_csrf_rejections_total",
        "State-changing requests rejected by the CSRF guard"
    );
    describe_counter!(
        "gateway_rate_limited_total",
        "Requests shed by the rate limiter"
    );
    describe_counter!("gateway_logins_total", "Login completions by outcome");
    describe_counter!("gateway_logouts_total", "Completed logouts");
}

/// Record one forwarded (or locally answered) request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string()
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "route" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_csrf_rejection() {
    counter!("gateway_csrf_rejections_total").increment(1);
}

pub fn record_rate_limited(reason: &str) {
    counter!("gateway_rate_limited_total", "reason" => reason.to_string()).increment(1);
}

pub fn record_login(outcome: &str) {
    counter!("gateway_logins_total", "outcome" => outcome.to_string()).increment(1);
}

pub fn record_logout() {
    counter!("gateway_logouts_total").increment(1);
}

//! Gateway-local HTTP endpoints.

pub mod fallback;
pub mod user;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// Plain 302 redirect. Browsers follow it with a GET, which both the login
/// and the end-session redirects rely on.
pub fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let mut response = StatusCode::FOUND.into_response();
            response.headers_mut().insert(header::LOCATION, value);
            response
        }
        Err(_) => {
            tracing::error!(location = %location, "Redirect target is not a valid header value");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

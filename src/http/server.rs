//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all local endpoints
//! - Wire the security filter chain in its fixed total order
//! - Forward everything else to the configured upstreams
//! - Serve with graceful shutdown
//!
//! Filter order per request: request-id/trace/timeout, writable headers,
//! authentication policy, CSRF guard, rate-limit key, token bucket. Layers
//! short-circuit by returning without calling the next one.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::uri::{Authority, Scheme};
use axum::http::{Request, StatusCode, Uri};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::observability::metrics;
use crate::oidc::{callback, logout, OidcClient, OidcError};
use crate::routing::RouteTable;
use crate::security::policy::{self, AccessRules};
use crate::security::rate_limit::{self, RateLimiterState};
use crate::security::{csrf, headers, rate_key};
use crate::session::SessionStore;
use crate::web::{fallback, user};

/// Application state injected into filters and handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<GatewayConfig>,
    pub rules: Arc<AccessRules>,
    pub routes: Arc<RouteTable>,
    pub sessions: Arc<SessionStore>,
    pub oidc: Arc<OidcClient>,
    pub limiter: Arc<RateLimiterState>,
    pub client: Client<HttpConnector, Body>,
}

impl GatewayState {
    pub fn new(config: GatewayConfig) -> Result<Self, OidcError> {
        let oidc = OidcClient::new(
            config.oidc.clone(),
            Duration::from_secs(config.timeouts.idp_secs),
        )?;
        let rules = AccessRules::from_config(&config.access);
        let routes = RouteTable::from_config(&config.routes);
        let sessions = SessionStore::new(Duration::from_secs(config.session.ttl_secs));
        let limiter = RateLimiterState::new(&config.rate_limit);
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            config: Arc::new(config),
            rules: Arc::new(rules),
            routes: Arc::new(routes),
            sessions: Arc::new(sessions),
            oidc: Arc::new(oidc),
            limiter: Arc::new(limiter),
            client,
        })
    }
}

/// HTTP server for the edge gateway.
pub struct HttpServer {
    router: Router,
    state: GatewayState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, OidcError> {
        let state = GatewayState::new(config)?;
        let router = Self::build_router(state.clone());
        Ok(Self { router, state })
    }

    /// Shared state, exposed so tests can reach the session store.
    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    /// Build the Axum router with the filter chain in its fixed order.
    fn build_router(state: GatewayState) -> Router {
        let callback_path = state.config.oidc.callback_path.clone();
        let request_timeout = Duration::from_secs(state.config.timeouts.request_secs);

        // Layers added later wrap the ones before, so the list below reads
        // bottom-up at runtime.
        Router::new()
            .route("/user", get(user::get_user))
            .route(logout::LOGOUT_PATH, post(logout::logout))
            .route(
                fallback::FALLBACK_PATH,
                get(fallback::fallback_get).post(fallback::fallback_post),
            )
            .route(&callback_path, get(callback::login_callback))
            .fallback(forward_handler)
            .layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit::rate_limit_middleware,
            ))
            .layer(middleware::from_fn(rate_key::attach_key))
            .layer(middleware::from_fn_with_state(state.clone(), csrf::guard))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                policy::authenticate,
            ))
            .layer(middleware::from_fn(headers::writeable_headers))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(request_timeout))
            .with_state(state)
    }

    /// Run the server until a shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forwarding handler for everything the gateway does not answer itself.
/// Requests arriving here have already passed the security pipeline.
async fn forward_handler(State(state): State<GatewayState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let method_str = method.to_string();
    let path = request.uri().path().to_string();

    // 1. Match a configured route
    let Some(route) = state.routes.match_path(&path).cloned() else {
        tracing::debug!(path = %path, "No route matched");
        metrics::record_request(&method_str, 404, "none", start);
        return StatusCode::NOT_FOUND.into_response();
    };

    // 2. Rewrite the URI toward the upstream authority
    let (mut parts, body) = request.into_parts();
    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = match Authority::from_str(&route.upstream) {
        Ok(authority) => Some(authority),
        Err(error) => {
            tracing::error!(route = %route.name, error = %error, "Unusable upstream authority");
            metrics::record_request(&method_str, 502, &route.name, start);
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };
    let original_uri = parts.uri.clone();
    parts.uri = Uri::from_parts(uri_parts).unwrap_or(original_uri);

    // 3. Forward
    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let status = response.status();
            metrics::record_request(&method_str, status.as_u16(), &route.name, start);
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body)).into_response()
        }
        Err(error) => {
            tracing::warn!(route = %route.name, error = %error, "Upstream unreachable");
            if route.fallback {
                let degraded = fallback::degraded(&method);
                metrics::record_request(&method_str, degraded.status().as_u16(), &route.name, start);
                degraded
            } else {
                metrics::record_request(&method_str, 502, &route.name, start);
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        }
    }
}

/// Resolve on ctrl-c or an in-process shutdown trigger.
async fn shutdown_signal(mut shutdown: broadcast::Receiver<()>) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = shutdown.recv() => {}
    }
    tracing::info!("Shutdown signal received");
}

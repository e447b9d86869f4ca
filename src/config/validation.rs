//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check identity-provider endpoints are well-formed URLs
//! - Check route and access-rule tables are coherent
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GatewayConfig -> Result<(), Vec<ValidationError>>
//! - Runs before the config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::uri::Authority;
use axum::http::Method;
use url::Url;

use crate::config::schema::GatewayConfig;
use crate::security::policy::PathPattern;

/// A single semantic problem found in a config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    InvalidBindAddress(String),
    InvalidMetricsAddress(String),
    InvalidEndpoint { field: &'static str, value: String },
    EmptyClientId,
    InvalidCallbackPath(String),
    ZeroSessionTtl,
    ZeroTimeout(&'static str),
    InvalidAccessPattern(String),
    InvalidAccessMethod(String),
    EmptyRouteName,
    DuplicateRouteName(String),
    InvalidRoutePrefix { route: String, prefix: String },
    InvalidUpstream { route: String, upstream: String },
    ZeroRateLimit(&'static str),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBindAddress(addr) => write!(f, "invalid listener bind address: {}", addr),
            Self::InvalidMetricsAddress(addr) => write!(f, "invalid metrics address: {}", addr),
            Self::InvalidEndpoint { field, value } => {
                write!(f, "oidc.{} is not a valid URL: {}", field, value)
            }
            Self::EmptyClientId => write!(f, "oidc.client_id must not be empty"),
            Self::InvalidCallbackPath(path) => {
                write!(f, "oidc.callback_path must start with '/': {}", path)
            }
            Self::ZeroSessionTtl => write!(f, "session.ttl_secs must be greater than zero"),
            Self::ZeroTimeout(field) => write!(f, "timeouts.{} must be greater than zero", field),
            Self::InvalidAccessPattern(p) => write!(f, "invalid access rule pattern: {}", p),
            Self::InvalidAccessMethod(m) => write!(f, "invalid access rule method: {}", m),
            Self::EmptyRouteName => write!(f, "route name must not be empty"),
            Self::DuplicateRouteName(name) => write!(f, "duplicate route name: {}", name),
            Self::InvalidRoutePrefix { route, prefix } => {
                write!(f, "route '{}' has invalid path prefix: {}", route, prefix)
            }
            Self::InvalidUpstream { route, upstream } => {
                write!(f, "route '{}' has invalid upstream authority: {}", route, upstream)
            }
            Self::ZeroRateLimit(field) => {
                write!(f, "rate_limit.{} must be greater than zero when enabled", field)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if SocketAddr::from_str(&config.listener.bind_address).is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && SocketAddr::from_str(&config.observability.metrics_address).is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    validate_oidc(config, &mut errors);

    if config.session.ttl_secs == 0 {
        errors.push(ValidationError::ZeroSessionTtl);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }
    if config.timeouts.idp_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("idp_secs"));
    }

    for rule in &config.access {
        if PathPattern::parse(&rule.pattern).is_none() {
            errors.push(ValidationError::InvalidAccessPattern(rule.pattern.clone()));
        }
        for method in &rule.methods {
            if Method::from_str(method).is_err() {
                errors.push(ValidationError::InvalidAccessMethod(method.clone()));
            }
        }
    }

    let mut seen = HashSet::new();
    for route in &config.routes {
        if route.name.is_empty() {
            errors.push(ValidationError::EmptyRouteName);
        } else if !seen.insert(route.name.clone()) {
            errors.push(ValidationError::DuplicateRouteName(route.name.clone()));
        }
        if !route.path_prefix.starts_with('/') {
            errors.push(ValidationError::InvalidRoutePrefix {
                route: route.name.clone(),
                prefix: route.path_prefix.clone(),
            });
        }
        if Authority::from_str(&route.upstream).is_err() {
            errors.push(ValidationError::InvalidUpstream {
                route: route.name.clone(),
                upstream: route.upstream.clone(),
            });
        }
    }

    if config.rate_limit.enabled {
        if config.rate_limit.requests_per_second == 0 {
            errors.push(ValidationError::ZeroRateLimit("requests_per_second"));
        }
        if config.rate_limit.burst_size == 0 {
            errors.push(ValidationError::ZeroRateLimit("burst_size"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_oidc(config: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    let oidc = &config.oidc;

    if oidc.client_id.is_empty() {
        errors.push(ValidationError::EmptyClientId);
    }
    if !oidc.callback_path.starts_with('/') {
        errors.push(ValidationError::InvalidCallbackPath(oidc.callback_path.clone()));
    }

    let endpoints = [
        ("authorization_uri", &oidc.authorization_uri),
        ("token_uri", &oidc.token_uri),
        ("jwks_uri", &oidc.jwks_uri),
        ("end_session_uri", &oidc.end_session_uri),
        ("public_base_url", &oidc.public_base_url),
        ("issuer", &oidc.issuer),
    ];
    for (field, value) in endpoints {
        if Url::parse(value).is_err() {
            errors.push(ValidationError::InvalidEndpoint {
                field,
                value: (*value).clone(),
            });
        }
    }
}

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// OIDC client registration for the external identity provider.
    pub oidc: OidcConfig,

    /// Session cookie and lifetime settings.
    pub session: SessionConfig,

    /// CSRF cookie/header naming.
    pub csrf: CsrfConfig,

    /// Ordered access rules deciding public vs. authenticated paths.
    /// First match wins; no match means authentication is required.
    pub access: Vec<AccessRuleConfig>,

    /// Route definitions mapping path prefixes to upstream services.
    pub routes: Vec<BackendRouteConfig>,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            oidc: OidcConfig::default(),
            session: SessionConfig::default(),
            csrf: CsrfConfig::default(),
            access: default_access_rules(),
            routes: default_backend_routes(),
            rate_limit: RateLimitConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9000".to_string(),
        }
    }
}

/// OIDC client registration.
///
/// All endpoint URIs are supplied by configuration; the gateway never runs
/// provider discovery at request time.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OidcConfig {
    /// Registration identifier, used in logging and the default callback path.
    pub registration_id: String,

    /// OAuth2 client id. Doubles as the expected ID-token audience.
    pub client_id: String,

    /// OAuth2 client secret for the confidential token exchange.
    pub client_secret: String,

    /// Scopes requested on the authorization redirect.
    pub scopes: Vec<String>,

    /// Expected ID-token issuer.
    pub issuer: String,

    /// Provider authorization endpoint (browser redirect target).
    pub authorization_uri: String,

    /// Provider token endpoint (authorization-code exchange).
    pub token_uri: String,

    /// Provider JWKS endpoint (ID-token signing keys).
    pub jwks_uri: String,

    /// Provider end-session endpoint (front-channel logout).
    pub end_session_uri: String,

    /// Local path receiving the provider callback.
    pub callback_path: String,

    /// Externally visible base URL of this gateway. Used to build the
    /// redirect URI and the post-logout redirect.
    pub public_base_url: String,
}

impl Default for OidcConfig {
    fn default() -> Self {
        let issuer = "http://localhost:8080/realms/bookshop".to_string();
        Self {
            registration_id: "keycloak".to_string(),
            client_id: "edge-gateway".to_string(),
            client_secret: String::new(),
            scopes: vec!["openid".to_string(), "roles".to_string()],
            authorization_uri: format!("{issuer}/protocol/openid-connect/auth"),
            token_uri: format!("{issuer}/protocol/openid-connect/token"),
            jwks_uri: format!("{issuer}/protocol/openid-connect/certs"),
            end_session_uri: format!("{issuer}/protocol/openid-connect/logout"),
            issuer,
            callback_path: "/login/oauth2/code/keycloak".to_string(),
            public_base_url: "http://localhost:9000".to_string(),
        }
    }
}

/// Session store settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the HTTP-only session cookie.
    pub cookie_name: String,

    /// Idle session lifetime in seconds.
    pub ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "SESSION".to_string(),
            ttl_secs: 1800,
        }
    }
}

/// CSRF token delivery naming.
///
/// The cookie stays readable by client script so its value can be echoed
/// back in the header on state-changing requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Cookie carrying the token to the browser.
    pub cookie_name: String,

    /// Header the browser must echo the token in.
    pub header_name: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            cookie_name: "XSRF-TOKEN".to_string(),
            header_name: "X-XSRF-TOKEN".to_string(),
        }
    }
}

/// Access classification for a matched rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    Public,
    Authenticated,
}

/// One entry of the ordered access rule table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessRuleConfig {
    /// Path pattern: exact (`/user`), single-segment extension wildcard
    /// (`/*.css`) or prefix wildcard (`/books/**`).
    pub pattern: String,

    /// Methods the rule applies to. Empty means all methods.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Classification when the rule matches.
    pub access: AccessKind,
}

fn rule(pattern: &str, methods: &[&str], access: AccessKind) -> AccessRuleConfig {
    AccessRuleConfig {
        pattern: pattern.to_string(),
        methods: methods.iter().map(|m| m.to_string()).collect(),
        access,
    }
}

/// Default rule table: root document, static assets and catalog reads are
/// anonymous; the degraded-response endpoint stays reachable with every
/// dependency down; everything else needs a login.
pub fn default_access_rules() -> Vec<AccessRuleConfig> {
    vec![
        rule("/", &[], AccessKind::Public),
        rule("/*.css", &[], AccessKind::Public),
        rule("/*.js", &[], AccessKind::Public),
        rule("/favicon.ico", &[], AccessKind::Public),
        rule("/books/**", &["GET"], AccessKind::Public),
        rule("/catalog-fallback", &[], AccessKind::Public),
    ]
}

/// Route configuration mapping a path prefix to one upstream service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendRouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path prefix to match (segment-aligned).
    pub path_prefix: String,

    /// Upstream authority (e.g., "127.0.0.1:9001").
    pub upstream: String,

    /// Synthesize a degraded response instead of 502 when the upstream is
    /// unreachable.
    #[serde(default)]
    pub fallback: bool,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,
}

/// Default routes for the bookshop deployment: catalog reads degrade via the
/// fallback endpoint, order writes never do, everything else reaches the UI.
pub fn default_backend_routes() -> Vec<BackendRouteConfig> {
    vec![
        BackendRouteConfig {
            name: "catalog".to_string(),
            path_prefix: "/books".to_string(),
            upstream: "127.0.0.1:9001".to_string(),
            fallback: true,
            priority: 10,
        },
        BackendRouteConfig {
            name: "order".to_string(),
            path_prefix: "/orders".to_string(),
            upstream: "127.0.0.1:9002".to_string(),
            fallback: false,
            priority: 10,
        },
        BackendRouteConfig {
            name: "ui".to_string(),
            path_prefix: "/".to_string(),
            upstream: "127.0.0.1:9004".to_string(),
            fallback: false,
            priority: 0,
        },
    ]
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Sustained requests per second per resolved key.
    pub requests_per_second: u32,

    /// Burst capacity per resolved key.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: 100,
            burst_size: 50,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Timeout for calls to the identity provider in seconds.
    pub idp_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            idp_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

//! Authentication/session policy.
//!
//! # Responsibilities
//! - Match requests against the ordered access rule table
//! - Resolve the session cookie into the request's security context
//! - Send unauthenticated browsers into the OIDC authorization-code flow
//! - Answer 401 for unauthenticated API-style requests
//!
//! # Design Decisions
//! - Path matching is case-sensitive, first match wins
//! - No match means authentication is required (fail closed)
//! - The logout and callback paths answer their own authorization
//! - No regex: exact, extension and prefix patterns only

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::config::schema::{AccessKind, AccessRuleConfig};
use crate::http::server::GatewayState;
use crate::oidc::logout::LOGOUT_PATH;
use crate::security::{random_token, session_cookie, set_cookie, RequestContext};
use crate::session::{LoginState, Session};
use crate::web;

/// A single path pattern from the rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// Matches one path exactly (`/favicon.ico`).
    Exact(String),
    /// Matches a root-level file by extension (`/*.css`).
    Extension(String),
    /// Matches a path and everything below it (`/books/**`).
    Prefix(String),
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Option<Self> {
        if let Some(ext) = pattern.strip_prefix("/*.") {
            if ext.is_empty() || ext.contains('/') {
                return None;
            }
            return Some(Self::Extension(ext.to_string()));
        }
        if let Some(prefix) = pattern.strip_suffix("/**") {
            if !prefix.is_empty() && !prefix.starts_with('/') {
                return None;
            }
            return Some(Self::Prefix(prefix.to_string()));
        }
        if pattern.starts_with('/') {
            return Some(Self::Exact(pattern.to_string()));
        }
        None
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(exact) => path == exact,
            Self::Extension(ext) => {
                let Some(file) = path.strip_prefix('/') else {
                    return false;
                };
                !file.contains('/')
                    && file.len() > ext.len() + 1
                    && file.ends_with(ext.as_str())
                    && file.as_bytes()[file.len() - ext.len() - 1] == b'.'
            }
            Self::Prefix(prefix) => {
                prefix.is_empty()
                    || path == prefix
                    || (path.starts_with(prefix.as_str())
                        && path.as_bytes().get(prefix.len()) == Some(&b'/'))
            }
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    pattern: PathPattern,
    methods: Vec<Method>,
    access: AccessKind,
}

/// Immutable, ordered access rule table compiled at startup.
#[derive(Debug, Clone, Default)]
pub struct AccessRules {
    rules: Vec<CompiledRule>,
}

impl AccessRules {
    /// Compile the configured rules. Entries that do not parse are dropped
    /// with a warning; a dropped rule can only make a path more protected.
    pub fn from_config(rules: &[AccessRuleConfig]) -> Self {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let Some(pattern) = PathPattern::parse(&rule.pattern) else {
                tracing::warn!(pattern = %rule.pattern, "Skipping unparsable access rule");
                continue;
            };
            let mut methods = Vec::with_capacity(rule.methods.len());
            for method in &rule.methods {
                match method.parse::<Method>() {
                    Ok(m) => methods.push(m),
                    Err(_) => {
                        tracing::warn!(method = %method, "Skipping invalid access rule method")
                    }
                }
            }
            compiled.push(CompiledRule {
                pattern,
                methods,
                access: rule.access,
            });
        }
        Self { rules: compiled }
    }

    /// Classify a request. First matching rule wins; no match means the
    /// caller must be authenticated.
    pub fn classify(&self, method: &Method, path: &str) -> AccessKind {
        for rule in &self.rules {
            if !rule.methods.is_empty() && !rule.methods.contains(method) {
                continue;
            }
            if rule.pattern.matches(path) {
                return rule.access;
            }
        }
        AccessKind::Authenticated
    }
}

/// Authentication filter: attaches the request context and enforces the
/// classification decided by the rule table.
pub async fn authenticate(
    State(state): State<GatewayState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let method = request.method().clone();

    let session = jar
        .get(&state.config.session.cookie_name)
        .and_then(|cookie| state.sessions.get(cookie.value()));
    let ctx = RequestContext { session };
    request.extensions_mut().insert(ctx.clone());

    // The logout orchestrator and the login callback answer their own
    // authorization (403 instead of 401/redirect).
    if path == LOGOUT_PATH || path == state.config.oidc.callback_path {
        return next.run(request).await;
    }

    if state.rules.classify(&method, &path) == AccessKind::Public {
        return next.run(request).await;
    }

    if ctx.session.as_ref().is_some_and(Session::is_authenticated) {
        return next.run(request).await;
    }

    if wants_html(request.headers()) {
        begin_login(&state, ctx.session, &path, request.uri().query())
    } else {
        tracing::debug!(method = %method, path = %path, "Unauthenticated request to protected path");
        StatusCode::UNAUTHORIZED.into_response()
    }
}

/// Browser navigation: redirect into the provider's authorization endpoint,
/// remembering where the user was headed.
fn begin_login(
    state: &GatewayState,
    session: Option<Session>,
    path: &str,
    query: Option<&str>,
) -> Response {
    let (session, fresh) = match session {
        Some(session) => (session, false),
        None => (state.sessions.create(), true),
    };

    let login_state = random_token();
    let redirect_to = match query {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    state.sessions.update(&session.id, |s| {
        s.login = Some(LoginState {
            state: login_state.clone(),
            redirect_to,
        });
    });

    tracing::debug!(
        path = %path,
        registration = %state.oidc.registration_id(),
        "Redirecting browser into OIDC login"
    );

    let mut response = web::found(&state.oidc.authorize_url(&login_state));
    if fresh {
        set_cookie(
            &mut response,
            &session_cookie(&state.config.session.cookie_name, &session.id),
        );
    }
    response
}

fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

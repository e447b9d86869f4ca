//! Provider callback completing the authorization-code flow.

use axum::extract::{Query, State};
use axum::response::Response;
use axum::Extension;
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::http::server::GatewayState;
use crate::observability::metrics;
use crate::security::error::SecurityError;
use crate::security::RequestContext;
use crate::session::Authentication;
use crate::web;

/// Query parameters the provider redirects back with.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Handler for the configured redirect URI.
///
/// The session only becomes authenticated in one atomic update after the
/// exchange and the token validation have both succeeded; an abort or a
/// failure anywhere leaves the session exactly as it was. The per-session
/// login lock keeps a second concurrent callback from running a duplicate
/// exchange.
pub async fn login_callback(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, SecurityError> {
    let session = ctx.session.ok_or(SecurityError::Unauthenticated)?;

    let lock = state.sessions.login_lock(&session.id);
    let _guard = lock.lock().await;

    // Re-read under the lock: a concurrent callback may have finished.
    let current = state
        .sessions
        .get(&session.id)
        .ok_or(SecurityError::Unauthenticated)?;
    if current.is_authenticated() {
        return Ok(web::found("/"));
    }
    let login = current.login.ok_or(SecurityError::Unauthenticated)?;

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "Identity provider reported a login failure");
        metrics::record_login("provider_error");
        return Err(SecurityError::Unauthenticated);
    }

    let (code, echoed_state) = match (params.code, params.state) {
        (Some(code), Some(state)) => (code, state),
        _ => return Err(SecurityError::Unauthenticated),
    };
    let state_matches: bool = login
        .state
        .as_bytes()
        .ct_eq(echoed_state.as_bytes())
        .into();
    if !state_matches {
        tracing::warn!("Login callback state parameter mismatch");
        metrics::record_login("state_mismatch");
        return Err(SecurityError::Unauthenticated);
    }

    let tokens = state.oidc.exchange_code(&code).await.map_err(|err| {
        tracing::error!(error = %err, "Authorization-code exchange failed");
        metrics::record_login("exchange_failed");
        SecurityError::from(err)
    })?;

    let claims = state
        .oidc
        .validate_id_token(&tokens.id_token)
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, "ID token rejected");
            metrics::record_login("invalid_token");
            SecurityError::from(err)
        })?;

    let subject = claims.sub.clone();
    state.sessions.update(&session.id, |s| {
        s.auth = Some(Authentication {
            id_token: tokens.id_token.clone(),
            claims: claims.clone(),
        });
        s.login = None;
    });

    tracing::info!(subject = %subject, "Login completed");
    metrics::record_login("success");

    Ok(web::found(&login.redirect_to))
}

//! Logout orchestration with front-channel propagation.

use axum::extract::State;
use axum::response::Response;
use axum::Extension;

use crate::http::server::GatewayState;
use crate::observability::metrics;
use crate::security::error::SecurityError;
use crate::security::{removal_cookie, set_cookie, RequestContext};
use crate::web;

/// Path intercepted by the orchestrator. The CSRF guard has already vetted
/// the request by the time the handler runs.
pub const LOGOUT_PATH: &str = "/logout";

/// Two-phase logout: the local session is destroyed first, then the browser
/// is sent to the provider's end-session endpoint so the provider-side
/// session dies too. Failing to reach the provider can never leave a locally
/// logged-in session behind.
///
/// Attempts without an authenticated session fail with 403, never silently.
pub async fn logout(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response, SecurityError> {
    let session = ctx.session.ok_or(SecurityError::Forbidden)?;
    let auth = session.auth.as_ref().ok_or(SecurityError::Forbidden)?;

    // Phase one: local invalidation.
    state.sessions.invalidate(&session.id);
    tracing::info!(
        subject = %auth.claims.sub,
        "Session invalidated, propagating logout to the identity provider"
    );
    metrics::record_logout();

    // Phase two: front-channel redirect.
    let mut response = web::found(&state.oidc.end_session_url(&auth.id_token));
    set_cookie(
        &mut response,
        &removal_cookie(&state.config.session.cookie_name),
    );
    Ok(response)
}

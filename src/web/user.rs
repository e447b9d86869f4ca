//! Identity endpoint exposing the session principal.

use axum::Extension;
use axum::Json;
use serde::Serialize;

use crate::security::error::SecurityError;
use crate::security::RequestContext;
use crate::session::Principal;

/// JSON shape returned to clients.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserResponse {
    pub username: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub roles: Vec<String>,
}

impl From<Principal> for UserResponse {
    fn from(principal: Principal) -> Self {
        Self {
            username: principal.preferred_username,
            first_name: principal.given_name,
            last_name: principal.family_name,
            roles: principal.roles,
        }
    }
}

/// `GET /user`: project the current ID-token claims. The projection is
/// computed per call, so a refreshed token shows up without bookkeeping.
pub async fn get_user(
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<UserResponse>, SecurityError> {
    let principal = ctx.principal().ok_or(SecurityError::Unauthenticated)?;
    Ok(Json(UserResponse::from(principal)))
}

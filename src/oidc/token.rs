//! ID-token validation and claims.

use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::{Deserialize, Serialize};

use crate::oidc::jwks::JwksCache;
use crate::oidc::OidcError;

/// Claims carried by the provider's ID token.
///
/// `aud` is kept as a raw value because the provider may emit a string or an
/// array; audience checking is done by the validator, not by deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub iss: String,
    #[serde(default)]
    pub aud: serde_json::Value,
    pub sub: String,
    pub exp: u64,
    #[serde(default)]
    pub iat: Option<u64>,

    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

/// Successful token-endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub id_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Validate a raw ID token: signature against the provider's published key
/// for the token's `kid`, plus issuer, audience and expiry.
///
/// Any failure means the caller must treat the user as unauthenticated; a
/// rejected token is never partially accepted.
pub async fn validate(
    raw: &str,
    jwks: &JwksCache,
    issuer: &str,
    client_id: &str,
) -> Result<IdTokenClaims, OidcError> {
    let header = decode_header(raw)?;
    let kid = header.kid.ok_or(OidcError::MissingKeyId)?;
    let key = jwks.decoding_key(&kid).await?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&[issuer]);
    validation.set_audience(&[client_id]);

    let data = decode::<IdTokenClaims>(raw, &key, &validation)?;
    Ok(data.claims)
}

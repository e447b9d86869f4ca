//! OAuth2/OIDC client for the configured registration.

use std::time::Duration;

use url::Url;

use crate::config::OidcConfig;
use crate::oidc::jwks::JwksCache;
use crate::oidc::token::{self, IdTokenClaims, TokenResponse};
use crate::oidc::OidcError;

/// Read-only client built from the registration in configuration.
pub struct OidcClient {
    config: OidcConfig,
    authorization_endpoint: Url,
    token_endpoint: Url,
    end_session_endpoint: Url,
    redirect_uri: String,
    http: reqwest::Client,
    jwks: JwksCache,
}

impl std::fmt::Debug for OidcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcClient")
            .field("config", &self.config)
            .field("authorization_endpoint", &self.authorization_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .field("end_session_endpoint", &self.end_session_endpoint)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

impl OidcClient {
    pub fn new(config: OidcConfig, idp_timeout: Duration) -> Result<Self, OidcError> {
        let parse = |field: &'static str, value: &str| {
            Url::parse(value).map_err(|source| OidcError::Endpoint { field, source })
        };
        let authorization_endpoint = parse("authorization_uri", &config.authorization_uri)?;
        let token_endpoint = parse("token_uri", &config.token_uri)?;
        let end_session_endpoint = parse("end_session_uri", &config.end_session_uri)?;
        let jwks_uri = parse("jwks_uri", &config.jwks_uri)?;

        let redirect_uri = format!(
            "{}{}",
            config.public_base_url.trim_end_matches('/'),
            config.callback_path
        );

        let http = reqwest::Client::builder()
            .timeout(idp_timeout)
            .build()
            .map_err(OidcError::HttpClient)?;

        let jwks = JwksCache::new(http.clone(), jwks_uri);

        Ok(Self {
            config,
            authorization_endpoint,
            token_endpoint,
            end_session_endpoint,
            redirect_uri,
            http,
            jwks,
        })
    }

    pub fn registration_id(&self) -> &str {
        &self.config.registration_id
    }

    /// Authorization-endpoint redirect for starting the code flow.
    pub fn authorize_url(&self, state: &str) -> String {
        let mut url = self.authorization_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state);
        url.to_string()
    }

    /// Exchange an authorization code for tokens at the token endpoint.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, OidcError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.redirect_uri),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
        ];

        let response = self
            .http
            .post(self.token_endpoint.clone())
            .form(&params)
            .send()
            .await
            .map_err(OidcError::Exchange)?;

        let status = response.status();
        if !status.is_success() {
            return Err(OidcError::ExchangeStatus(status));
        }

        response.json().await.map_err(OidcError::Exchange)
    }

    /// Validate a raw ID token against the registration's issuer, audience
    /// and the provider's published keys.
    pub async fn validate_id_token(&self, raw: &str) -> Result<IdTokenClaims, OidcError> {
        token::validate(raw, &self.jwks, &self.config.issuer, &self.config.client_id).await
    }

    /// End-session redirect propagating logout to the provider. The browser
    /// comes back to the gateway base URL afterwards.
    pub fn end_session_url(&self, id_token_hint: &str) -> String {
        let mut url = self.end_session_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("id_token_hint", id_token_hint)
            .append_pair("post_logout_redirect_uri", &self.config.public_base_url);
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OidcClient {
        OidcClient::new(OidcConfig::default(), Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_authorize_url_carries_code_flow_params() {
        let url = Url::parse(&client().authorize_url("state-123")).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(pairs.contains(&("response_type".into(), "code".into())));
        assert!(pairs.contains(&("client_id".into(), "edge-gateway".into())));
        assert!(pairs.contains(&("scope".into(), "openid roles".into())));
        assert!(pairs.contains(&("state".into(), "state-123".into())));
        assert!(pairs
            .iter()
            .any(|(k, v)| k == "redirect_uri" && v.ends_with("/login/oauth2/code/keycloak")));
    }

    #[test]
    fn test_end_session_url_carries_logout_params() {
        let url = Url::parse(&client().end_session_url("raw-id-token")).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(pairs.contains(&("id_token_hint".into(), "raw-id-token".into())));
        assert!(pairs.contains(&(
            "post_logout_redirect_uri".into(),
            "http://localhost:9000".into()
        )));
    }

    #[test]
    fn test_rejects_unparsable_endpoint() {
        let mut config = OidcConfig::default();
        config.token_uri = "not a url".into();
        let err = OidcClient::new(config, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, OidcError::Endpoint { field: "token_uri", .. }));
    }
}

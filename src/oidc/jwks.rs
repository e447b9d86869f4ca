//! Cache for the provider's published signing keys.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

use crate::oidc::OidcError;

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    #[serde(default)]
    kid: Option<String>,
    kty: String,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
    #[serde(rename = "use", default)]
    usage: Option<String>,
}

/// Process-wide, read-mostly map of key id to decoding key.
///
/// Lookups load an immutable snapshot; a key-id miss takes the refresh lock,
/// re-checks, and only the lock holder fetches the JWKS document. Waiters
/// observe the refreshed snapshot instead of issuing their own fetch.
pub struct JwksCache {
    keys: ArcSwap<HashMap<String, DecodingKey>>,
    refresh: Mutex<()>,
    http: reqwest::Client,
    jwks_uri: Url,
}

impl JwksCache {
    pub fn new(http: reqwest::Client, jwks_uri: Url) -> Self {
        Self {
            keys: ArcSwap::from_pointee(HashMap::new()),
            refresh: Mutex::new(()),
            http,
            jwks_uri,
        }
    }

    /// Resolve the decoding key for a key id, refreshing the cache once on a
    /// miss. A kid still unknown after a refresh is an invalid token, not a
    /// retryable condition.
    pub async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, OidcError> {
        if let Some(key) = self.keys.load().get(kid) {
            return Ok(key.clone());
        }

        let _guard = self.refresh.lock().await;

        // Another request may have refreshed while this one waited.
        if let Some(key) = self.keys.load().get(kid) {
            return Ok(key.clone());
        }

        self.refresh_locked().await?;

        self.keys
            .load()
            .get(kid)
            .cloned()
            .ok_or_else(|| OidcError::UnknownKeyId(kid.to_string()))
    }

    async fn refresh_locked(&self) -> Result<(), OidcError> {
        let set: JwkSet = self
            .http
            .get(self.jwks_uri.clone())
            .send()
            .await
            .map_err(OidcError::Jwks)?
            .error_for_status()
            .map_err(OidcError::Jwks)?
            .json()
            .await
            .map_err(OidcError::Jwks)?;

        let mut keys = HashMap::new();
        for jwk in set.keys {
            if jwk.kty != "RSA" {
                continue;
            }
            if matches!(jwk.usage.as_deref(), Some(usage) if usage != "sig") {
                continue;
            }
            let (Some(kid), Some(n), Some(e)) = (jwk.kid, jwk.n, jwk.e) else {
                continue;
            };
            let key = DecodingKey::from_rsa_components(&n, &e)
                .map_err(|source| OidcError::UnusableKey { kid: kid.clone(), source })?;
            keys.insert(kid, key);
        }

        tracing::debug!(keys = keys.len(), "JWKS cache refreshed");
        self.keys.store(Arc::new(keys));
        Ok(())
    }
}

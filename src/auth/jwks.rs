// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OIDC discovery and JWKS (JSON Web Key Set) fetching.
//!
//! ## Behaviour
//!
//! - Discovery runs at most once per [`OidcDiscovery`]. Its outcome, success
//!   or failure, is kept for the lifetime of the instance.
//! - Every JWKS fetch produces a complete new [`JwksIndex`]; indexes are
//!   swapped wholesale, never merged.
//! - Non-success responses keep the upstream status and body for operators.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::error::AuthError;

/// A single JSON Web Key as published in a key set.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonWebKey {
    /// Key ID
    pub kid: String,
    /// Key type (`RSA` for keys this crate can use)
    pub kty: Option<String>,
    /// Intended use (`sig` or `enc`); absent means unrestricted
    pub key_use: Option<String>,
    /// RSA modulus, base64url
    pub n: Option<String>,
    /// RSA exponent, base64url
    pub e: Option<String>,
    /// The key exactly as published
    pub raw: Value,
}

impl JsonWebKey {
    /// Read a key from its JSON object. Keys without a string `kid` are
    /// unaddressable and yield `None`.
    pub fn from_value(raw: Value) -> Option<Self> {
        let field = |name: &str| raw.get(name).and_then(Value::as_str).map(str::to_string);
        Some(Self {
            kid: field("kid")?,
            kty: field("kty"),
            key_use: field("use"),
            n: field("n"),
            e: field("e"),
            raw,
        })
    }

    /// Whether the key can verify RS256 signatures.
    pub fn is_rsa_signing_key(&self) -> bool {
        self.kty.as_deref() == Some("RSA") && self.key_use.as_deref().is_none_or(|u| u == "sig")
    }
}

/// JWKS document as served by the identity provider.
#[derive(Debug, Deserialize)]
struct JwksDocument {
    #[serde(default)]
    keys: Vec<Value>,
}

/// Snapshot of a key set, indexed by `kid`.
#[derive(Debug)]
pub struct JwksIndex {
    keys: HashMap<String, JsonWebKey>,
    fetched_at: Instant,
}

impl JwksIndex {
    /// Build an index from a list of keys.
    pub fn new(keys: impl IntoIterator<Item = JsonWebKey>) -> Self {
        Self {
            keys: keys.into_iter().map(|k| (k.kid.clone(), k)).collect(),
            fetched_at: Instant::now(),
        }
    }

    pub fn get(&self, kid: &str) -> Option<&JsonWebKey> {
        self.keys.get(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether the snapshot is still usable under an optional TTL.
    pub fn is_fresh(&self, ttl: Option<Duration>) -> bool {
        ttl.is_none_or(|ttl| self.fetched_at.elapsed() < ttl)
    }
}

/// OIDC metadata document (only the fields this crate reads).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OidcMetadata {
    pub jwks_uri: String,
}

/// Resolves the JWKS endpoint from a well-known metadata document.
pub struct OidcDiscovery {
    url: String,
    client: reqwest::Client,
    resolved: OnceCell<Result<OidcMetadata, AuthError>>,
}

impl OidcDiscovery {
    /// Discover lazily from `url`.
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
            resolved: OnceCell::new(),
        }
    }

    /// Use a known JWKS endpoint; no discovery request is ever made.
    pub fn known(jwks_uri: impl Into<String>, client: reqwest::Client) -> Self {
        let jwks_uri = jwks_uri.into();
        Self {
            url: jwks_uri.clone(),
            client,
            resolved: OnceCell::new_with(Some(Ok(OidcMetadata { jwks_uri }))),
        }
    }

    /// Whether a JWKS endpoint has been resolved successfully.
    pub fn is_resolved(&self) -> bool {
        matches!(self.resolved.get(), Some(Ok(_)))
    }

    /// The JWKS endpoint, discovering it on first use.
    ///
    /// Concurrent first callers share a single discovery request. A failed
    /// discovery is returned to every later caller as well.
    pub async fn jwks_uri(&self) -> Result<String, AuthError> {
        self.resolved
            .get_or_init(|| self.discover())
            .await
            .as_ref()
            .map(|metadata| metadata.jwks_uri.clone())
            .map_err(Clone::clone)
    }

    async fn discover(&self) -> Result<OidcMetadata, AuthError> {
        let failure = |status: Option<u16>, body: String| AuthError::DiscoveryFailure {
            url: self.url.clone(),
            status,
            body,
        };

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| failure(None, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| failure(Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            return Err(failure(Some(status.as_u16()), body));
        }

        let document: Value = serde_json::from_str(&body)
            .map_err(|_| failure(Some(status.as_u16()), body.clone()))?;

        let has_jwks_uri = document.get("jwks_uri").is_some_and(Value::is_string);
        if !has_jwks_uri {
            return Err(AuthError::MissingJwksUriField {
                url: self.url.clone(),
                body,
            });
        }

        let metadata: OidcMetadata = serde_json::from_value(document)
            .map_err(|_| failure(Some(status.as_u16()), body.clone()))?;

        info!(url = %self.url, jwks_uri = %metadata.jwks_uri, "OIDC discovery complete");
        Ok(metadata)
    }
}

/// Retrieves a key set and indexes it by `kid`.
#[derive(Clone)]
pub struct JwksFetcher {
    client: reqwest::Client,
}

impl JwksFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Fetch the JWKS at `url` into a fresh index.
    pub async fn fetch(&self, url: &str) -> Result<JwksIndex, AuthError> {
        let failure = |status: Option<u16>, body: String| AuthError::JwksFetchFailure {
            url: url.to_string(),
            status,
            body,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| failure(None, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| failure(Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            return Err(failure(Some(status.as_u16()), body));
        }

        let document: JwksDocument = serde_json::from_str(&body)
            .map_err(|_| failure(Some(status.as_u16()), body.clone()))?;

        // Only RSA signing keys are addressable; any other `kid` reads as unknown.
        let total = document.keys.len();
        let index = JwksIndex::new(
            document
                .keys
                .into_iter()
                .filter_map(JsonWebKey::from_value)
                .filter(JsonWebKey::is_rsa_signing_key),
        );
        if index.len() < total {
            warn!(
                url,
                skipped = total - index.len(),
                "Ignored JWKs without a 'kid' or not usable for RS256 signatures"
            );
        }
        if index.is_empty() {
            warn!(url, "JWKS contains no usable signing keys");
        }

        info!(url, key_count = index.len(), "JWKS fetched");
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwk_from_value_reads_rsa_fields() {
        let jwk = JsonWebKey::from_value(serde_json::json!({
            "kty": "RSA",
            "kid": "key-1",
            "n": "AQAB",
            "e": "AQAB",
            "use": "sig",
        }))
        .unwrap();

        assert_eq!(jwk.kid, "key-1");
        assert_eq!(jwk.kty.as_deref(), Some("RSA"));
        assert_eq!(jwk.raw["use"], "sig");
    }

    #[test]
    fn only_rsa_signing_keys_are_usable() {
        let usable = |value: Value| JsonWebKey::from_value(value).unwrap().is_rsa_signing_key();

        assert!(usable(serde_json::json!({"kid": "a", "kty": "RSA"})));
        assert!(usable(serde_json::json!({"kid": "a", "kty": "RSA", "use": "sig"})));
        assert!(!usable(serde_json::json!({"kid": "a", "kty": "RSA", "use": "enc"})));
        assert!(!usable(serde_json::json!({"kid": "a", "kty": "EC", "crv": "P-256"})));
        assert!(!usable(serde_json::json!({"kid": "a"})));
    }

    #[test]
    fn jwk_without_kid_is_ignored() {
        assert!(JsonWebKey::from_value(serde_json::json!({"kty": "RSA"})).is_none());
        assert!(JsonWebKey::from_value(serde_json::json!({"kid": 7})).is_none());
    }

    #[test]
    fn index_is_keyed_by_kid() {
        let keys = ["a", "b"].map(|kid| JsonWebKey::from_value(serde_json::json!({"kid": kid})).unwrap());
        let index = JwksIndex::new(keys);
        assert_eq!(index.len(), 2);
        assert!(index.get("a").is_some());
        assert!(index.get("c").is_none());
        assert!(!index.is_empty());
        assert!(index.is_fresh(None));
        assert!(index.is_fresh(Some(Duration::from_secs(60))));
    }

    #[test]
    fn known_endpoint_skips_discovery() {
        let discovery = OidcDiscovery::known("https://idp.example.com/jwks", reqwest::Client::new());
        assert!(discovery.is_resolved());
    }

    #[tokio::test]
    async fn known_endpoint_is_returned() {
        let discovery = OidcDiscovery::known("https://idp.example.com/jwks", reqwest::Client::new());
        assert_eq!(discovery.jwks_uri().await.unwrap(), "https://idp.example.com/jwks");
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer JWT verification against a discovered JWKS.
//!
//! ## Verification steps
//!
//! 1. Require an `Authorization: Bearer <token>` header.
//! 2. Require a three part token and decode its header; require a `kid`.
//! 3. Resolve the public key for `kid`: key cache, then the current JWKS
//!    index, then a single refresh of the index (discovering the JWKS
//!    endpoint first if needed).
//! 4. Verify the RS256 signature, `exp`, `aud` (the client ID) and `iss`
//!    (the OAuth authority).
//! 5. Map the claims into an [`AuthenticationContext`].
//!
//! Keys are only refreshed when a token names a `kid` that is not known yet,
//! so a provider rotating to a new `kid` triggers exactly one refresh.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, Algorithm, Validation};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use url::Url;

use super::chain::{AuthRequest, Authenticator};
use super::context::{default_claims_mapper, AuthenticationContext, ClaimsMapper, TokenClaims};
use super::error::AuthError;
use super::jwks::{JwksFetcher, JwksIndex, OidcDiscovery};
use super::keys::{jwk_to_public_key, KeyMaterialCache, PublicKeyMaterial, URL_SAFE_LENIENT};

/// Default timeout for discovery and JWKS requests.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default clock skew tolerance for `exp` (60 seconds).
pub const DEFAULT_LEEWAY_SECS: u64 = 60;

/// Path of the OIDC metadata document relative to the authority.
pub const WELL_KNOWN_OPENID_CONFIGURATION: &str = ".well-known/openid-configuration";

const BEARER_PREFIX: &str = "Bearer ";

/// Configuration of a [`JwtVerifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtVerifierConfig {
    /// Expected audience (`aud`)
    pub client_id: String,
    /// OAuth authority URL, also the expected issuer (`iss`)
    pub authority: String,
    /// OIDC metadata URL; derived from the authority when unset
    pub discovery_url: Option<String>,
    /// JWKS URL; when set, discovery is never performed
    pub jwks_uri: Option<String>,
    /// Per-request timeout for discovery and JWKS calls
    pub http_timeout: Duration,
    /// Clock skew tolerance in seconds
    pub leeway_secs: u64,
    /// Proactive expiry of cached keys; `None` keeps them until reset
    pub key_ttl: Option<Duration>,
}

impl JwtVerifierConfig {
    pub fn new(client_id: impl Into<String>, authority: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            authority: authority.into(),
            discovery_url: None,
            jwks_uri: None,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            leeway_secs: DEFAULT_LEEWAY_SECS,
            key_ttl: None,
        }
    }

    pub fn with_discovery_url(mut self, url: impl Into<String>) -> Self {
        self.discovery_url = Some(url.into());
        self
    }

    pub fn with_jwks_uri(mut self, url: impl Into<String>) -> Self {
        self.jwks_uri = Some(url.into());
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_leeway(mut self, secs: u64) -> Self {
        self.leeway_secs = secs;
        self
    }

    pub fn with_key_ttl(mut self, ttl: Duration) -> Self {
        self.key_ttl = Some(ttl);
        self
    }

    /// The OIDC metadata URL: explicit, or `<authority>/.well-known/openid-configuration`.
    pub fn resolved_discovery_url(&self) -> Result<String, AuthError> {
        if let Some(url) = &self.discovery_url {
            return Ok(url.clone());
        }

        let mut authority = Url::parse(&self.authority).map_err(|e| {
            AuthError::Misconfigured(format!("invalid authority URL '{}': {e}", self.authority))
        })?;
        if !authority.path().ends_with('/') {
            let path = format!("{}/", authority.path());
            authority.set_path(&path);
        }

        authority
            .join(WELL_KNOWN_OPENID_CONFIGURATION)
            .map(String::from)
            .map_err(|e| AuthError::Misconfigured(format!("invalid discovery URL: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct JoseHeader {
    #[serde(default)]
    kid: Option<String>,
}

/// Bearer token authenticator backed by OIDC discovery and a JWKS.
///
/// One instance is meant to be shared by all requests. Its key cache, JWKS
/// index and discovery result are safe for concurrent use; concurrent misses
/// share one JWKS fetch.
pub struct JwtVerifier {
    config: JwtVerifierConfig,
    discovery: OidcDiscovery,
    fetcher: JwksFetcher,
    keys: KeyMaterialCache,
    index: RwLock<Option<Arc<JwksIndex>>>,
    refresh_gate: Mutex<()>,
    refresh_generation: AtomicU64,
    claims_mapper: ClaimsMapper,
}

impl JwtVerifier {
    /// Create a verifier. No network call is made until the first token.
    pub fn new(config: JwtVerifierConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AuthError::Misconfigured(format!("failed to create HTTP client: {e}")))?;

        let discovery = match &config.jwks_uri {
            Some(jwks_uri) => OidcDiscovery::known(jwks_uri.clone(), client.clone()),
            None => OidcDiscovery::new(config.resolved_discovery_url()?, client.clone()),
        };

        Ok(Self {
            keys: KeyMaterialCache::new(config.key_ttl),
            fetcher: JwksFetcher::new(client),
            discovery,
            config,
            index: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            refresh_generation: AtomicU64::new(0),
            claims_mapper: default_claims_mapper(),
        })
    }

    /// Replace the claims-to-context mapping.
    pub fn with_claims_mapper(mut self, mapper: ClaimsMapper) -> Self {
        self.claims_mapper = mapper;
        self
    }

    pub fn config(&self) -> &JwtVerifierConfig {
        &self.config
    }

    /// Whether the JWKS endpoint has been resolved.
    pub fn is_discovered(&self) -> bool {
        self.discovery.is_resolved()
    }

    /// Resolve the JWKS endpoint now rather than on the first token.
    pub async fn discover(&self) -> Result<String, AuthError> {
        self.discovery.jwks_uri().await
    }

    /// Number of JWKS refreshes performed so far.
    pub fn refresh_count(&self) -> u64 {
        self.refresh_generation.load(Ordering::Acquire)
    }

    /// Drop cached keys and the JWKS index. Discovery is kept.
    pub async fn reset_keys(&self) {
        let _gate = self.refresh_gate.lock().await;
        self.keys.reset().await;
        *self.index.write().await = None;
    }

    /// Verify a raw `Authorization` header value.
    pub async fn verify(&self, authorization: &str) -> Result<AuthenticationContext, AuthError> {
        let token = authorization
            .strip_prefix(BEARER_PREFIX)
            .ok_or(AuthError::UnexpectedAuthorizationType { expected: "Bearer" })?;

        let segments: Vec<&str> = token.split('.').collect();
        let [header_segment, body_segment, _signature] = segments.as_slice() else {
            return Err(AuthError::MalformedToken);
        };

        let kid = decode_header(header_segment)?
            .kid
            .ok_or(AuthError::MissingKeyId)?;

        let key = self.resolve_key(&kid).await?;
        let claims = self.validate(token, body_segment, &key)?;

        let mut context = AuthenticationContext::default();
        (self.claims_mapper)(&claims, &mut context);
        Ok(context)
    }

    /// Resolve the public key for `kid`, refreshing the JWKS at most once.
    async fn resolve_key(&self, kid: &str) -> Result<PublicKeyMaterial, AuthError> {
        if let Some(key) = self.keys.get(kid).await {
            debug!(kid, "Key cache hit");
            return Ok(key);
        }

        // Read before the index so a refresh finishing in between is noticed.
        let generation = self.refresh_generation.load(Ordering::Acquire);
        if let Some(key) = self.key_from_index(kid).await? {
            return Ok(key);
        }

        let _gate = self.refresh_gate.lock().await;
        if self.refresh_generation.load(Ordering::Acquire) == generation {
            self.refresh_index().await?;
        } else {
            debug!(kid, "JWKS refreshed by a concurrent request");
        }

        match self.key_from_index(kid).await? {
            Some(key) => Ok(key),
            None => {
                warn!(kid, "Key not found in JWKS after refresh");
                Err(AuthError::KeyNotFound {
                    kid: kid.to_string(),
                })
            }
        }
    }

    /// Convert and cache `kid` from the current index, if present and fresh.
    async fn key_from_index(&self, kid: &str) -> Result<Option<PublicKeyMaterial>, AuthError> {
        let index = self.index.read().await.clone();
        let Some(index) = index.filter(|index| index.is_fresh(self.config.key_ttl)) else {
            return Ok(None);
        };
        let Some(jwk) = index.get(kid) else {
            return Ok(None);
        };

        let key = jwk_to_public_key(jwk)?;
        self.keys.insert(kid, key.clone()).await;
        Ok(Some(key))
    }

    async fn refresh_index(&self) -> Result<(), AuthError> {
        let jwks_uri = self.discovery.jwks_uri().await?;
        let index = self.fetcher.fetch(&jwks_uri).await?;
        info!(jwks_uri = %jwks_uri, key_count = index.len(), "JWKS index rebuilt");

        *self.index.write().await = Some(Arc::new(index));
        self.refresh_generation.fetch_add(1, Ordering::Release);
        Ok(())
    }

    fn validate(
        &self,
        token: &str,
        body_segment: &str,
        key: &PublicKeyMaterial,
    ) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = self.config.leeway_secs;
        validation.set_audience(&[&self.config.client_id]);
        validation.set_issuer(&[&self.config.authority]);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);

        decode::<TokenClaims>(token, key.decoding_key(), &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => AuthError::ExpiredSignature,
                JwtErrorKind::InvalidSignature
                | JwtErrorKind::InvalidAlgorithm
                | JwtErrorKind::InvalidKeyFormat
                | JwtErrorKind::InvalidRsaKey(_) => AuthError::InvalidSignature,
                JwtErrorKind::InvalidAudience => self.invalid_audience(body_segment),
                JwtErrorKind::MissingRequiredClaim(claim) if claim == "aud" => {
                    self.invalid_audience(body_segment)
                }
                JwtErrorKind::InvalidIssuer => self.invalid_issuer(body_segment),
                JwtErrorKind::MissingRequiredClaim(claim) if claim == "iss" => {
                    self.invalid_issuer(body_segment)
                }
                _ => AuthError::MalformedToken,
            })
    }

    fn invalid_audience(&self, body_segment: &str) -> AuthError {
        AuthError::InvalidAudience {
            expected: self.config.client_id.clone(),
            observed: body_claim(body_segment, "aud"),
        }
    }

    fn invalid_issuer(&self, body_segment: &str) -> AuthError {
        AuthError::InvalidIssuer {
            expected: self.config.authority.clone(),
            observed: body_claim(body_segment, "iss"),
        }
    }
}

#[async_trait]
impl Authenticator for JwtVerifier {
    fn name(&self) -> &str {
        "jwt"
    }

    async fn authenticate(
        &self,
        request: &AuthRequest<'_>,
    ) -> Result<AuthenticationContext, AuthError> {
        let authorization = request
            .authorization()
            .ok_or(AuthError::MissingAuthorizationHeader)?
            .to_str()
            .map_err(|_| AuthError::UnexpectedAuthorizationType { expected: "Bearer" })?;

        self.verify(authorization).await
    }
}

fn decode_header(segment: &str) -> Result<JoseHeader, AuthError> {
    let bytes = URL_SAFE_LENIENT
        .decode(segment)
        .map_err(|_| AuthError::MalformedHeader)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::MalformedHeader)
}

/// Best-effort read of a claim for error messages; only used after the
/// signature has been verified.
fn body_claim(segment: &str, name: &str) -> Option<String> {
    let bytes = URL_SAFE_LENIENT.decode(segment).ok()?;
    let body: Value = serde_json::from_slice(&bytes).ok()?;
    match body.get(name)? {
        Value::String(value) => Some(value.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    // Never contacted: every test here fails before key resolution.
    const UNREACHABLE_JWKS: &str = "http://127.0.0.1:9/jwks";

    fn verifier() -> JwtVerifier {
        JwtVerifier::new(
            JwtVerifierConfig::new("my-app", "https://idp.example.com/")
                .with_jwks_uri(UNREACHABLE_JWKS),
        )
        .unwrap()
    }

    fn segment(json: &str) -> String {
        URL_SAFE_NO_PAD.encode(json.as_bytes())
    }

    #[test]
    fn discovery_url_is_derived_from_authority() {
        let config = JwtVerifierConfig::new("my-app", "https://idp.example.com/");
        assert_eq!(
            config.resolved_discovery_url().unwrap(),
            "https://idp.example.com/.well-known/openid-configuration"
        );

        let config = JwtVerifierConfig::new("my-app", "https://login.example.com/tenant/v2.0");
        assert_eq!(
            config.resolved_discovery_url().unwrap(),
            "https://login.example.com/tenant/v2.0/.well-known/openid-configuration"
        );
    }

    #[test]
    fn explicit_discovery_url_wins() {
        let config = JwtVerifierConfig::new("my-app", "https://idp.example.com/")
            .with_discovery_url("https://meta.example.com/oidc.json");
        assert_eq!(
            config.resolved_discovery_url().unwrap(),
            "https://meta.example.com/oidc.json"
        );
    }

    #[test]
    fn invalid_authority_is_a_configuration_error() {
        let result = JwtVerifier::new(JwtVerifierConfig::new("my-app", "not a url"));
        assert!(matches!(result, Err(AuthError::Misconfigured(_))));
    }

    #[tokio::test]
    async fn rejects_other_authorization_types() {
        let err = verifier().verify("Basic YWxpY2U6c2VjcmV0").await.unwrap_err();
        assert_eq!(err, AuthError::UnexpectedAuthorizationType { expected: "Bearer" });
    }

    #[tokio::test]
    async fn rejects_tokens_without_three_segments() {
        for token in ["Bearer abc", "Bearer a.b", "Bearer a.b.c.d"] {
            assert_eq!(verifier().verify(token).await.unwrap_err(), AuthError::MalformedToken);
        }
    }

    #[tokio::test]
    async fn rejects_undecodable_header() {
        let err = verifier().verify("Bearer %%%.e30.sig").await.unwrap_err();
        assert_eq!(err, AuthError::MalformedHeader);

        let token = format!("Bearer {}.e30.sig", segment("not json"));
        assert_eq!(verifier().verify(&token).await.unwrap_err(), AuthError::MalformedHeader);
    }

    #[tokio::test]
    async fn rejects_header_without_kid() {
        let token = format!("Bearer {}.e30.sig", segment(r#"{"alg":"RS256","typ":"JWT"}"#));
        assert_eq!(verifier().verify(&token).await.unwrap_err(), AuthError::MissingKeyId);
    }

    #[test]
    fn body_claim_reads_strings_and_lists() {
        let body = segment(r#"{"aud":["a","b"],"iss":"https://idp.example.com/"}"#);
        assert_eq!(body_claim(&body, "iss").as_deref(), Some("https://idp.example.com/"));
        assert_eq!(body_claim(&body, "aud").as_deref(), Some(r#"["a","b"]"#));
        assert_eq!(body_claim(&body, "sub"), None);
        assert_eq!(body_claim("%%%", "iss"), None);
    }
}

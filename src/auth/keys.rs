// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Public-key material derived from JWKs, and its per-`kid` cache.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use jsonwebtoken::DecodingKey;
use tokio::sync::RwLock;

use super::error::AuthError;
use super::jwks::JsonWebKey;

/// base64url that accepts input with or without `=` padding.
pub(crate) const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// RSA public key usable for RS256 verification.
#[derive(Clone)]
pub struct PublicKeyMaterial(Arc<DecodingKey>);

impl PublicKeyMaterial {
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.0
    }
}

impl fmt::Debug for PublicKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PublicKeyMaterial(..)")
    }
}

/// Decode a base64url big-endian unsigned integer (JWK `n` / `e`).
///
/// Empty input is refused: it would otherwise read as zero.
pub fn decode_uint(value: &str) -> Result<Vec<u8>, String> {
    let bytes = URL_SAFE_LENIENT
        .decode(value.trim())
        .map_err(|e| e.to_string())?;
    if bytes.is_empty() {
        return Err("empty integer".to_string());
    }
    Ok(bytes)
}

/// Convert a JWK's modulus and exponent into an RSA public key.
pub fn jwk_to_public_key(jwk: &JsonWebKey) -> Result<PublicKeyMaterial, AuthError> {
    let invalid = |reason: String| AuthError::InvalidKeyMaterial {
        kid: jwk.kid.clone(),
        reason,
    };

    let modulus = jwk
        .n
        .as_deref()
        .ok_or_else(|| invalid("missing modulus 'n'".to_string()))?;
    let exponent = jwk
        .e
        .as_deref()
        .ok_or_else(|| invalid("missing exponent 'e'".to_string()))?;

    let modulus = decode_uint(modulus).map_err(|e| invalid(format!("modulus: {e}")))?;
    let exponent = decode_uint(exponent).map_err(|e| invalid(format!("exponent: {e}")))?;

    Ok(PublicKeyMaterial(Arc::new(
        DecodingKey::from_rsa_raw_components(&modulus, &exponent),
    )))
}

struct CachedKey {
    key: PublicKeyMaterial,
    inserted_at: Instant,
}

/// `kid` → public key cache.
///
/// Entries live until [`KeyMaterialCache::reset`], or until `ttl` elapses when
/// one is configured. Inserting an existing `kid` replaces its entry.
pub struct KeyMaterialCache {
    entries: RwLock<HashMap<String, CachedKey>>,
    ttl: Option<Duration>,
}

impl KeyMaterialCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn get(&self, kid: &str) -> Option<PublicKeyMaterial> {
        let entries = self.entries.read().await;
        let entry = entries.get(kid)?;
        match self.ttl {
            Some(ttl) if entry.inserted_at.elapsed() >= ttl => None,
            _ => Some(entry.key.clone()),
        }
    }

    pub async fn insert(&self, kid: impl Into<String>, key: PublicKeyMaterial) {
        self.entries.write().await.insert(
            kid.into(),
            CachedKey {
                key,
                inserted_at: Instant::now(),
            },
        );
    }

    pub async fn reset(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

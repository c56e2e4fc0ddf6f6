// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared helpers: a mocked identity provider and RS256 token minting.

#![allow(dead_code)]

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLIENT_ID: &str = "my-app";
pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";
pub const JWKS_PATH: &str = "/discovery/keys";

pub const PRIMARY_KID: &str = "primary";
pub const PRIMARY_PEM: &str = include_str!("../fixtures/primary_rsa.pem");
pub const PRIMARY_N: &str = "yprSntiTWA00HCGgC6a0VvstO4mIhPDyzEroyjo7z2V6kteFyhyhLZ0wgwYInjjM8bR_b_fcp3Xs2s3PMiKFymn6zLdh1WD3V66v2W8aRd3MdFL1biRU1nLmFAowbbkRXB3n9CzOjkplm1Edzm7YXo_zx0HoaAgCQxaI3-2-zRGaju5b5wAtDW8BCz50FkU_SACK9El3b8ey2fgDFxpAu3SmOSxqhHzm4m_0P3kTf62EYPIgMkVdVXGiZq0zqXT0BPeGpG58XHHiDmdICXkwcMDVYYEf6AGBYw89v8Azif33CMQmC4DBOWLw6JFLiu1qJvBT1sxaYbQ41zU69saSyw";

pub const ROTATED_KID: &str = "rotated";
pub const ROTATED_PEM: &str = include_str!("../fixtures/rotated_rsa.pem");
pub const ROTATED_N: &str = "jZGFkkamaGd_CifBSB9dqemKzap69o2uWMGvOklJ1A-1vTlvNpSag7qx4rboPi-MkH8KNSfseq_0mr2Q9vHD7aPPvWrX7tUhbwKqj3dSofPEY3fm8uZUlctTC1lp-dhzZ5P5dJ5xTLEllduGCYGxgsYKgyOWrNKbj_iyR9jpTnQBI5ND9tkn_wuZ6FA0xZNYWR5_y-uTyPPBQXy6UKpTAo3RNqE1MJIcJn5HJp942B5rLV8T24ExU8hxYrce7bV1p84wcvNU6OIQpwOA5OixKRQWiJUq9puOUs_WjOCxxex65xns3cZAXaYw-ocrfS7qhCzrphg1ibc5p3d7jDO7pw";

pub const EXPONENT: &str = "AQAB";

/// Public JWK for an RSA key.
pub fn rsa_jwk(kid: &str, n: &str) -> Value {
    json!({
        "kty": "RSA",
        "use": "sig",
        "alg": "RS256",
        "kid": kid,
        "n": n,
        "e": EXPONENT,
    })
}

pub fn jwks(keys: &[Value]) -> Value {
    json!({ "keys": keys })
}

/// Mocked OIDC provider.
pub struct TestProvider {
    pub server: MockServer,
}

impl TestProvider {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Authority URL, also the issuer of minted tokens.
    pub fn authority(&self) -> String {
        format!("{}/", self.server.uri())
    }

    pub fn discovery_url(&self) -> String {
        format!("{}{DISCOVERY_PATH}", self.server.uri())
    }

    pub fn jwks_url(&self) -> String {
        format!("{}{JWKS_PATH}", self.server.uri())
    }

    pub fn discovery_document(&self) -> Value {
        json!({
            "issuer": self.authority(),
            "jwks_uri": self.jwks_url(),
            "id_token_signing_alg_values_supported": ["RS256"],
        })
    }

    /// Serve the discovery document, expecting `calls` requests.
    pub async fn mount_discovery(&self, calls: u64) {
        Mock::given(method("GET"))
            .and(path(DISCOVERY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(self.discovery_document()))
            .expect(calls)
            .mount(&self.server)
            .await;
    }

    /// Serve a key set, expecting `calls` requests.
    pub async fn mount_jwks(&self, keys: &[Value], calls: u64) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks(keys)))
            .expect(calls)
            .mount(&self.server)
            .await;
    }

    /// Claims accepted by a verifier configured for this provider.
    pub fn claims(&self, sub: &str) -> Value {
        json!({
            "sub": sub,
            "iss": self.authority(),
            "aud": CLIENT_ID,
            "iat": Utc::now().timestamp(),
            "exp": (Utc::now() + ChronoDuration::minutes(10)).timestamp(),
        })
    }
}

/// Sign `claims` with RS256 under `kid`.
pub fn sign(pem: &str, kid: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("fixture key");
    encode(&header, claims, &key).expect("Failed to sign token")
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Replace one character in the middle of the signature segment.
pub fn tamper_signature(token: &str) -> String {
    let (signed, signature) = token.rsplit_once('.').expect("three segments");
    let mut signature: Vec<char> = signature.chars().collect();
    let mid = signature.len() / 2;
    signature[mid] = if signature[mid] == 'A' { 'B' } else { 'A' };
    format!("{signed}.{}", signature.into_iter().collect::<String>())
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP Basic authentication against a single configured credential pair.

use async_trait::async_trait;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use ring::constant_time::verify_slices_are_equal;
use tracing::debug;

use super::chain::{AuthRequest, Authenticator};
use super::context::AuthenticationContext;
use super::error::AuthError;

const BASIC_SCHEME: &[u8] = b"Basic";

/// Standard base64 accepting payloads with or without `=` padding.
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Accepts `Authorization: Basic base64(username:password)` for one user.
pub struct StaticBasicAuthenticator {
    username: String,
    password: String,
}

impl StaticBasicAuthenticator {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Check a raw `Authorization` header value.
    pub fn verify(&self, authorization: &[u8]) -> Result<AuthenticationContext, AuthError> {
        let unexpected = AuthError::UnexpectedAuthorizationType { expected: "Basic" };

        let rest = authorization
            .strip_prefix(BASIC_SCHEME)
            .ok_or(unexpected.clone())?;
        let payload = match rest {
            [] => rest,
            [b' ', payload @ ..] => payload.trim_ascii(),
            _ => return Err(unexpected),
        };
        if payload.is_empty() {
            return Err(AuthError::BadCredentialsEncoding);
        }

        let decoded = STANDARD_LENIENT
            .decode(payload)
            .map_err(|_| AuthError::BadCredentialsEncoding)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthError::BadCredentialsEncoding)?;

        let parts: Vec<&str> = decoded.split(':').collect();
        let [username, password] = parts.as_slice() else {
            return Err(AuthError::BadCredentialsEncoding);
        };

        let username_ok =
            verify_slices_are_equal(username.as_bytes(), self.username.as_bytes()).is_ok();
        let password_ok =
            verify_slices_are_equal(password.as_bytes(), self.password.as_bytes()).is_ok();
        if !(username_ok & password_ok) {
            debug!(username, "Basic credentials rejected");
            return Err(AuthError::WrongCredentials);
        }

        Ok(AuthenticationContext::for_user(*username))
    }
}

#[async_trait]
impl Authenticator for StaticBasicAuthenticator {
    fn name(&self) -> &str {
        "static_basic"
    }

    async fn authenticate(
        &self,
        request: &AuthRequest<'_>,
    ) -> Result<AuthenticationContext, AuthError> {
        let authorization = request
            .authorization()
            .ok_or(AuthError::MissingAuthorizationHeader)?;
        self.verify(authorization.as_bytes())
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Every failure carries a stable machine-readable code, a short title and a
//! human-readable description, and is classified by [`ErrorKind`] so that the
//! authenticator chain and the HTTP layer can each read the kind explicitly.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

/// Classification of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The client presented missing, malformed or invalid credentials.
    Unauthorized,
    /// The client is authenticated but not allowed through.
    Forbidden,
    /// An upstream dependency (discovery, JWKS) failed.
    ServerFault,
    /// The authenticator or resource was wired up incorrectly.
    Configuration,
}

/// Authentication error type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization` header present
    #[error("Authorization header is required")]
    MissingAuthorizationHeader,

    /// `Authorization` header uses another scheme
    #[error("Authorization must be of type {expected}")]
    UnexpectedAuthorizationType { expected: &'static str },

    /// Bearer token is not a three part JWT
    #[error("Authorization Bearer must be a three part JWT token")]
    MalformedToken,

    /// JWT header segment could not be decoded
    #[error("Unable to parse JWT header. It must be a base64 encoded JSON dictionary")]
    MalformedHeader,

    /// JWT header has no `kid`
    #[error("Missing 'kid' in JWT header")]
    MissingKeyId,

    /// No key with the token's `kid` in the key set
    #[error("Could not find JWK with id '{kid}' within available JWKs")]
    KeyNotFound { kid: String },

    /// Token `exp` has passed
    #[error("Token expired (exp)")]
    ExpiredSignature,

    /// Token signature does not verify
    #[error("Bad token signature")]
    InvalidSignature,

    /// Token audience does not match the configured client
    #[error(
        "Token audience (aud) must be '{expected}' but found '{}' instead",
        .observed.as_deref().unwrap_or("none")
    )]
    InvalidAudience {
        expected: String,
        observed: Option<String>,
    },

    /// Token issuer does not match the configured authority
    #[error(
        "Token issuer (iss) must be '{expected}' but found '{}' instead",
        .observed.as_deref().unwrap_or("none")
    )]
    InvalidIssuer {
        expected: String,
        observed: Option<String>,
    },

    /// Static credentials did not match
    #[error("Wrong username or password")]
    WrongCredentials,

    /// Static credentials were not `base64(username:password)`
    #[error("Authorization Basic must be encoded login:password")]
    BadCredentialsEncoding,

    /// Authenticated but denied by an authenticator
    #[error("Access denied: {reason}")]
    Forbidden { reason: String },

    /// OIDC metadata document could not be loaded
    #[error("Tried to load OIDC configuration from {url} but got {}: {body}", status_label(.status))]
    DiscoveryFailure {
        url: String,
        status: Option<u16>,
        body: String,
    },

    /// OIDC metadata document has no `jwks_uri`
    #[error("Loaded OIDC configuration from {url} but found no 'jwks_uri' in: {body}")]
    MissingJwksUriField { url: String, body: String },

    /// JWKS document could not be loaded
    #[error("Couldn't load JWKS from {url}. Got {}: {body}", status_label(.status))]
    JwksFetchFailure {
        url: String,
        status: Option<u16>,
        body: String,
    },

    /// A published JWK cannot be turned into an RSA public key
    #[error("JWK '{kid}' is not a usable RSA key: {reason}")]
    InvalidKeyMaterial { kid: String, reason: String },

    /// `skip_responders` used without a routing layer that names responders
    #[error(
        "Resource '{resource}' uses 'skip_responders' but the routing layer did not supply a responder name"
    )]
    RoutingCapabilityMissing { resource: String },

    /// Invalid authenticator or chain configuration
    #[error("Authentication is misconfigured: {0}")]
    Misconfigured(String),
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("{code} response"),
        None => "no response".to_string(),
    }
}

/// JSON body returned for authentication failures.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthErrorBody {
    /// Stable machine-readable code
    pub error_code: String,
    /// Short summary
    pub title: String,
    /// Human-readable explanation
    pub description: String,
}

impl AuthError {
    /// Get the error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::MissingAuthorizationHeader
            | AuthError::UnexpectedAuthorizationType { .. }
            | AuthError::MalformedToken
            | AuthError::MalformedHeader
            | AuthError::MissingKeyId
            | AuthError::KeyNotFound { .. }
            | AuthError::ExpiredSignature
            | AuthError::InvalidSignature
            | AuthError::InvalidAudience { .. }
            | AuthError::InvalidIssuer { .. }
            | AuthError::WrongCredentials
            | AuthError::BadCredentialsEncoding => ErrorKind::Unauthorized,
            AuthError::Forbidden { .. } => ErrorKind::Forbidden,
            AuthError::DiscoveryFailure { .. }
            | AuthError::MissingJwksUriField { .. }
            | AuthError::JwksFetchFailure { .. }
            | AuthError::InvalidKeyMaterial { .. } => ErrorKind::ServerFault,
            AuthError::RoutingCapabilityMissing { .. } | AuthError::Misconfigured(_) => {
                ErrorKind::Configuration
            }
        }
    }

    /// Whether the chain may try the next authenticator after this failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Unauthorized | ErrorKind::Forbidden)
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthorizationHeader => "missing_authorization_header",
            AuthError::UnexpectedAuthorizationType { .. } => "unexpected_authorization_type",
            AuthError::MalformedToken => "malformed_token",
            AuthError::MalformedHeader => "malformed_header",
            AuthError::MissingKeyId => "missing_key_id",
            AuthError::KeyNotFound { .. } => "key_not_found",
            AuthError::ExpiredSignature => "expired_signature",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::InvalidAudience { .. } => "invalid_audience",
            AuthError::InvalidIssuer { .. } => "invalid_issuer",
            AuthError::WrongCredentials => "wrong_credentials",
            AuthError::BadCredentialsEncoding => "bad_credentials_encoding",
            AuthError::Forbidden { .. } => "forbidden",
            AuthError::DiscoveryFailure { .. } => "discovery_failure",
            AuthError::MissingJwksUriField { .. } => "missing_jwks_uri_field",
            AuthError::JwksFetchFailure { .. } => "jwks_fetch_failure",
            AuthError::InvalidKeyMaterial { .. } => "invalid_key_material",
            AuthError::RoutingCapabilityMissing { .. } => "routing_capability_missing",
            AuthError::Misconfigured(_) => "misconfigured",
        }
    }

    /// Short human-readable title.
    pub fn title(&self) -> &'static str {
        match self {
            AuthError::MissingAuthorizationHeader => "Missing Authorization Header",
            AuthError::UnexpectedAuthorizationType { .. } => "Unexpected Authorization Type",
            AuthError::MalformedToken | AuthError::MalformedHeader => "Malformed Token",
            AuthError::MissingKeyId | AuthError::KeyNotFound { .. } => "Unknown Signing Key",
            AuthError::ExpiredSignature => "Token Expired",
            AuthError::InvalidSignature => "Invalid Signature",
            AuthError::InvalidAudience { .. } => "Invalid Audience",
            AuthError::InvalidIssuer { .. } => "Invalid Issuer",
            AuthError::WrongCredentials | AuthError::BadCredentialsEncoding => {
                "Invalid Credentials"
            }
            AuthError::Forbidden { .. } => "Forbidden",
            AuthError::DiscoveryFailure { .. } => {
                "Failed to discover JWK uri loading OIDC (OpenID Configuration)"
            }
            AuthError::MissingJwksUriField { .. } => {
                "Attribute 'jwks_uri' not found in OIDC (OpenID Configuration)"
            }
            AuthError::JwksFetchFailure { .. } => "Failed to load JWKS",
            AuthError::InvalidKeyMaterial { .. } => "Invalid JWK",
            AuthError::RoutingCapabilityMissing { .. } | AuthError::Misconfigured(_) => {
                "Authentication Misconfigured"
            }
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::ServerFault | ErrorKind::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render the JSON body for this error.
    pub fn body(&self) -> AuthErrorBody {
        AuthErrorBody {
            error_code: self.error_code().to_string(),
            title: self.title().to_string(),
            description: self.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and the per-request authentication context.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `aud` claim: a single audience or a list of audiences.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

/// Decoded JWT body.
///
/// `iss`, `aud` and `exp` are validated by the verifier before this value is
/// handed to a [`ClaimsMapper`]; it is never kept beyond that call.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Issuer (the OAuth authority URL)
    pub iss: String,

    /// Audience (the client ID)
    pub aud: Audience,

    /// Expiration timestamp
    pub exp: i64,

    /// Any other claim carried by the token
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Per-request record of who was authenticated, and how.
///
/// Written once by the authenticator chain when an authenticator succeeds,
/// then stored in the request extensions for handlers to read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuthenticationContext {
    /// Canonical user identifier (the `sub` claim for bearer tokens)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Name of the authenticator that accepted the request
    pub authenticator: String,

    /// Additional values a custom claims mapper chose to keep
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    #[schema(value_type = Object)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl AuthenticationContext {
    /// Create a context for the given user.
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }
}

/// Copies validated claims into an [`AuthenticationContext`].
pub type ClaimsMapper = Arc<dyn Fn(&TokenClaims, &mut AuthenticationContext) + Send + Sync>;

/// Default mapping: the `sub` claim becomes the user ID.
pub fn default_claims_mapper() -> ClaimsMapper {
    Arc::new(|claims: &TokenClaims, context: &mut AuthenticationContext| {
        context.user_id = Some(claims.sub.clone());
    })
}

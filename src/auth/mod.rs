// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Per-resource request authentication for Axum services.
//!
//! ## Auth Flow
//!
//! 1. Each route is bound to a [`Resource`] and its optional
//!    [`ResourceAuthPolicy`] through a [`ResourceGuard`].
//! 2. The [`middleware::require_authentication`] middleware evaluates the
//!    policy (`skip_uris`, `skip_methods`, `skip_responders`).
//! 3. If the request is not skipped, the [`AuthenticatorChain`] tries each
//!    [`Authenticator`] in order:
//!    - [`JwtVerifier`]: RS256 bearer tokens, keys from an OIDC-discovered JWKS
//!    - [`StaticBasicAuthenticator`]: one static username/password pair
//! 4. The first success stores an [`AuthenticationContext`] in the request
//!    extensions. Otherwise the first failure is returned as JSON.
//!
//! ## Security
//!
//! - Only RS256 is accepted
//! - `exp`, `aud` (client ID) and `iss` (authority) are always validated
//! - Clock skew tolerance defaults to 60 seconds
//! - Signing keys are fetched lazily and refreshed only for unknown `kid`s

pub mod basic;
pub mod chain;
pub mod context;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod jwt;
pub mod keys;
pub mod middleware;
pub mod policy;
pub mod resource;

pub use basic::StaticBasicAuthenticator;
pub use chain::{AuthOutcome, AuthRequest, Authenticator, AuthenticatorChain, ResourceGuard};
pub use context::{default_claims_mapper, AuthenticationContext, ClaimsMapper, TokenClaims};
pub use error::{AuthError, AuthErrorBody, ErrorKind};
pub use extractor::{Auth, OptionalAuth};
pub use jwt::{JwtVerifier, JwtVerifierConfig};
pub use middleware::require_authentication;
pub use policy::ResourceAuthPolicy;
pub use resource::{Resource, RouteMatch};

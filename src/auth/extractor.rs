// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the authentication context.
//!
//! The context is placed in the request extensions by
//! [`require_authentication`](super::middleware::require_authentication):
//!
//! ```rust,ignore
//! async fn me(Auth(context): Auth) -> impl IntoResponse {
//!     // context.user_id is the authenticated user
//! }
//! ```

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, AuthenticationContext};

/// Extractor requiring an authenticated request.
///
/// Rejects with `401` when the route is unguarded or its policy skipped
/// authentication for this request.
pub struct Auth(pub AuthenticationContext);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticationContext>()
            .cloned()
            .map(Auth)
            .ok_or(AuthError::MissingAuthorizationHeader)
    }
}

/// Optional authentication extractor.
///
/// `None` on skipped or unguarded routes.
pub struct OptionalAuth(pub Option<AuthenticationContext>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(
            parts.extensions.get::<AuthenticationContext>().cloned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts() -> Parts {
        Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[tokio::test]
    async fn auth_requires_context() {
        let result = Auth::from_request_parts(&mut parts(), &()).await;
        assert!(matches!(result, Err(AuthError::MissingAuthorizationHeader)));
    }

    #[tokio::test]
    async fn auth_reads_extensions() {
        let mut parts = parts();
        parts
            .extensions
            .insert(AuthenticationContext::for_user("user_from_middleware"));

        let Auth(context) = Auth::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(context.user_id.as_deref(), Some("user_from_middleware"));
    }

    #[tokio::test]
    async fn optional_auth_returns_none_without_context() {
        let OptionalAuth(context) = OptionalAuth::from_request_parts(&mut parts(), &())
            .await
            .unwrap();
        assert!(context.is_none());
    }
}

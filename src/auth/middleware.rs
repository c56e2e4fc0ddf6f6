// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! The middleware runs a [`ResourceGuard`] before the handler. The route
//! template comes from [`MatchedPath`], so policies name templates exactly as
//! they were passed to `Router::route`.
//!
//! ```rust,ignore
//! let guard = ResourceGuard::new(chain, Resource::new("users"))?;
//!
//! let app = Router::new().route(
//!     "/v1/users",
//!     get(list_users).route_layer(middleware::from_fn_with_state(guard, require_authentication)),
//! );
//! ```

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::error;

use super::chain::{AuthOutcome, ResourceGuard};
use super::error::AuthError;

/// Authenticate the request for the guarded resource.
///
/// On success the [`AuthenticationContext`](super::AuthenticationContext) is
/// added to the request extensions; a skipped request carries none. Failures
/// are rendered as JSON error responses.
///
/// The middleware must sit behind the router (`route_layer`): without a
/// [`MatchedPath`] there is no template to evaluate `skip_uris` against, and
/// the request is refused as misconfigured.
pub async fn require_authentication(
    State(guard): State<ResourceGuard>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(template) = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
    else {
        let err = AuthError::Misconfigured(format!(
            "no matched route template for resource '{}'",
            guard.resource().name()
        ));
        error!(
            path = %request.uri().path(),
            error = %err,
            "Authentication middleware applied outside a route"
        );
        return err.into_response();
    };

    match guard
        .check(request.method(), request.headers(), &template)
        .await
    {
        Ok(AuthOutcome::Authenticated(context)) => {
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Ok(AuthOutcome::Skipped) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        AuthenticatorChain, OptionalAuth, Resource, ResourceAuthPolicy, StaticBasicAuthenticator,
    };
    use axum::{
        body::Body,
        http::{header::AUTHORIZATION, Method, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use std::sync::Arc;
    use tower::{Layer, ServiceExt};

    async fn whoami(OptionalAuth(context): OptionalAuth) -> String {
        context
            .and_then(|c| c.user_id)
            .unwrap_or_else(|| "anonymous".to_string())
    }

    fn app(resource: Resource) -> Router {
        let chain = Arc::new(AuthenticatorChain::single(StaticBasicAuthenticator::new(
            "alice", "secret",
        )));
        let guard = ResourceGuard::new(chain, resource).unwrap();
        Router::new().route(
            "/items/{id}",
            get(whoami)
                .post(whoami)
                .route_layer(from_fn_with_state(guard, require_authentication)),
        )
    }

    async fn call(app: Router, method: Method, authorization: Option<&str>) -> (StatusCode, String) {
        let mut request = axum::http::Request::builder().method(method).uri("/items/7");
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn authenticated_context_reaches_handler() {
        // "alice:secret"
        let (status, body) = call(
            app(Resource::new("items")),
            Method::GET,
            Some("Basic YWxpY2U6c2VjcmV0"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice");
    }

    #[tokio::test]
    async fn failure_is_rendered_as_json() {
        let (status, body) = call(app(Resource::new("items")), Method::GET, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error_code"], "missing_authorization_header");
    }

    #[tokio::test]
    async fn policy_matches_route_template() {
        let resource = Resource::new("items")
            .with_policy(ResourceAuthPolicy::new().skip_uris(["/items/{id}"]));
        let (status, body) = call(app(resource), Method::GET, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[tokio::test]
    async fn missing_route_template_is_refused() {
        let chain = Arc::new(AuthenticatorChain::single(StaticBasicAuthenticator::new(
            "alice", "secret",
        )));
        let resource = Resource::new("items")
            .with_policy(ResourceAuthPolicy::new().skip_uris(["/items/{id}"]));
        let guard = ResourceGuard::new(chain, resource).unwrap();

        // Wrapping a bare service means no router ever sets `MatchedPath`.
        let inner = tower::service_fn(|_request: Request| async {
            Ok::<_, std::convert::Infallible>(StatusCode::OK.into_response())
        });
        let service = from_fn_with_state(guard, require_authentication).layer(inner);

        let request = axum::http::Request::builder()
            .uri("/items/7")
            .body(Body::empty())
            .unwrap();
        let response = service.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error_code"], "misconfigured");
    }

    #[tokio::test]
    async fn skipped_method_only() {
        let policy = ResourceAuthPolicy::new().skip_methods(["post"]);
        let resource = Resource::new("items").with_policy(policy);

        let (status, _) = call(app(resource.clone()), Method::POST, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(app(resource), Method::GET, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

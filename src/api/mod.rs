// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{HeaderName, Method},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    api::health::{HealthChecks, HealthResponse, ReadyResponse},
    api::users::HelloResponse,
    auth::{
        require_authentication, AuthError, AuthErrorBody, AuthenticationContext, Resource,
        ResourceGuard,
    },
    state::AppState,
};

pub mod health;
pub mod users;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the service router.
///
/// Fails when a resource's policy cannot be evaluated by the router.
pub fn router(state: AppState) -> Result<Router, AuthError> {
    let guard = |resource: Resource| ResourceGuard::new(state.chain.clone(), resource);

    let users = guard(
        Resource::new("users")
            .with_policy(users::users_policy())
            .responder(Method::GET, "on_get")
            .responder(Method::POST, "on_post"),
    )?;
    let users_not_skipped = guard(
        Resource::new("users")
            .with_policy(users::users_policy())
            .responder(Method::GET, "on_get_not_skipped"),
    )?;
    let users_skipped = guard(
        Resource::new("users")
            .with_policy(users::users_policy())
            .responder(Method::GET, "on_get_skipped"),
    )?;
    let current_user = guard(Resource::new("current_user"))?;

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let app = Router::new()
        .route(
            "/v1/users",
            get(users::on_get)
                .post(users::on_post)
                .route_layer(from_fn_with_state(users, require_authentication)),
        )
        .route(
            "/v1/users/not_skipped",
            get(users::on_get_not_skipped)
                .route_layer(from_fn_with_state(users_not_skipped, require_authentication)),
        )
        .route(
            "/v1/users/skipped",
            get(users::on_get_skipped)
                .route_layer(from_fn_with_state(users_skipped, require_authentication)),
        )
        .route(
            "/v1/users/me",
            get(users::get_current_user)
                .route_layer(from_fn_with_state(current_user, require_authentication)),
        )
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid));

    Ok(app)
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "basic",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Basic).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        users::on_get,
        users::on_post,
        users::on_get_not_skipped,
        users::on_get_skipped,
        users::get_current_user,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            AuthenticationContext,
            AuthErrorBody,
            HelloResponse,
            HealthChecks,
            HealthResponse,
            ReadyResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Users", description = "Demonstration resource with per-route authentication policy"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthenticatorChain, StaticBasicAuthenticator};
    use axum::{
        body::Body,
        http::{header::AUTHORIZATION, Request, StatusCode},
        response::Response,
    };
    use tower::ServiceExt;

    // "alice:secret"
    const ALICE: &str = "Basic YWxpY2U6c2VjcmV0";

    fn app() -> Router {
        let chain = AuthenticatorChain::single(StaticBasicAuthenticator::new("alice", "secret"));
        router(AppState::new(chain, None)).unwrap()
    }

    async fn send(method: Method, uri: &str, authorization: Option<&str>) -> Response {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        app()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn collection_is_public() {
        let response = send(Method::GET, "/v1/users", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(Method::POST, "/v1/users", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await, serde_json::json!({"hello": "world"}));
    }

    #[tokio::test]
    async fn skipped_responder_is_public() {
        let response = send(Method::GET, "/v1/users/skipped", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn not_skipped_requires_credentials() {
        let response = send(Method::GET, "/v1/users/not_skipped", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json(response).await["error_code"], "missing_authorization_header");

        let response = send(Method::GET, "/v1/users/not_skipped", Some(ALICE)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json(response).await,
            serde_json::json!({"hello": "world", "user_id": "alice"})
        );
    }

    #[tokio::test]
    async fn wrong_credentials_are_rejected() {
        // "alice:wrong"
        let response = send(Method::GET, "/v1/users/me", Some("Basic YWxpY2U6d3Jvbmc=")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json(response).await["error_code"], "wrong_credentials");
    }

    #[tokio::test]
    async fn me_returns_context() {
        let response = send(Method::GET, "/v1/users/me", Some(ALICE)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["user_id"], "alice");
        assert_eq!(body["authenticator"], "static_basic");
    }

    #[tokio::test]
    async fn request_id_is_propagated() {
        let response = send(Method::GET, "/health/live", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn health_without_verifier() {
        let response = send(Method::GET, "/health/ready", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["checks"]["authenticators"], serde_json::json!(["static_basic"]));
        assert!(body["checks"].get("jwks").is_none());
    }

    #[test]
    fn openapi_lists_security_schemes() {
        let doc = ApiDoc::openapi();
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer"));
        assert!(components.security_schemes.contains_key("basic"));
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.
//!
//! The `/v1/users` family shares one authentication policy; handler names
//! double as the responder names that policy refers to.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{Auth, AuthenticationContext, OptionalAuth, ResourceAuthPolicy};

/// Policy of the `/v1/users` resource:
/// `POST` is always public, the collection URI is public, and the
/// `on_post` / `on_get_skipped` responders are public.
pub fn users_policy() -> ResourceAuthPolicy {
    ResourceAuthPolicy::new()
        .skip_methods(["POST"])
        .skip_uris(["/v1/users"])
        .skip_responders(["on_post", "on_get_skipped"])
}

/// Greeting returned by the user resource responders.
#[derive(Debug, Serialize, ToSchema)]
pub struct HelloResponse {
    pub hello: String,
    /// Authenticated user, absent when authentication was skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

fn hello(context: Option<AuthenticationContext>) -> Json<HelloResponse> {
    Json(HelloResponse {
        hello: "world".to_string(),
        user_id: context.and_then(|c| c.user_id),
    })
}

/// Public: skipped by method, URI and responder.
#[utoipa::path(
    post,
    path = "/v1/users",
    tag = "Users",
    responses((status = 200, description = "Greeting", body = HelloResponse))
)]
pub async fn on_post(OptionalAuth(context): OptionalAuth) -> Json<HelloResponse> {
    hello(context)
}

/// Public: skipped by URI.
#[utoipa::path(
    get,
    path = "/v1/users",
    tag = "Users",
    responses((status = 200, description = "Greeting", body = HelloResponse))
)]
pub async fn on_get(OptionalAuth(context): OptionalAuth) -> Json<HelloResponse> {
    hello(context)
}

/// Authenticated.
#[utoipa::path(
    get,
    path = "/v1/users/not_skipped",
    tag = "Users",
    security(("bearer" = []), ("basic" = [])),
    responses(
        (status = 200, description = "Greeting", body = HelloResponse),
        (status = 401, description = "Unauthorized", body = crate::auth::AuthErrorBody),
    )
)]
pub async fn on_get_not_skipped(Auth(context): Auth) -> Json<HelloResponse> {
    hello(Some(context))
}

/// Public: skipped by responder.
#[utoipa::path(
    get,
    path = "/v1/users/skipped",
    tag = "Users",
    responses((status = 200, description = "Greeting", body = HelloResponse))
)]
pub async fn on_get_skipped(OptionalAuth(context): OptionalAuth) -> Json<HelloResponse> {
    hello(context)
}

/// Get the authentication context of the caller.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer" = []), ("basic" = [])),
    responses(
        (status = 200, description = "Authentication context", body = AuthenticationContext),
        (status = 401, description = "Unauthorized", body = crate::auth::AuthErrorBody),
        (status = 500, description = "Identity provider unavailable", body = crate::auth::AuthErrorBody),
    )
)]
pub async fn get_current_user(Auth(context): Auth) -> Json<AuthenticationContext> {
    Json(context)
}

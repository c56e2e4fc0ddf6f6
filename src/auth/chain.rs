// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The authenticator chain: request-time entry point of authentication.
//!
//! ## Flow
//!
//! 1. The resource's policy is evaluated; a skipped request succeeds without
//!    any authenticator running.
//! 2. Authenticators run in declared order. The first success wins.
//! 3. Client-credential failures (`Unauthorized`, `Forbidden`) are collected
//!    and, if every authenticator fails, the **first** one is returned. The
//!    earliest-declared authenticator's diagnostic takes priority over any
//!    later, possibly more specific, one.
//! 4. Server and configuration faults stop the chain immediately.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue, Method};
use tracing::{debug, error, warn};

use super::context::AuthenticationContext;
use super::error::AuthError;
use super::resource::{Resource, RouteMatch};

/// The parts of a request an authenticator may look at.
#[derive(Debug, Clone, Copy)]
pub struct AuthRequest<'a> {
    pub method: &'a Method,
    pub headers: &'a HeaderMap,
    pub route: RouteMatch<'a>,
}

impl<'a> AuthRequest<'a> {
    /// Raw `Authorization` header value, if present.
    pub fn authorization(&self) -> Option<&'a HeaderValue> {
        self.headers.get(AUTHORIZATION)
    }
}

/// A pluggable request authenticator.
///
/// On success an authenticator returns the context describing the caller; it
/// never writes to the request itself, so a failed attempt leaves no trace.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Short name recorded in the context and in logs.
    fn name(&self) -> &str;

    /// Authenticate one request.
    async fn authenticate(
        &self,
        request: &AuthRequest<'_>,
    ) -> Result<AuthenticationContext, AuthError>;
}

/// Result of running the chain for a request.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    /// The resource policy bypassed authentication.
    Skipped,
    /// An authenticator accepted the request.
    Authenticated(AuthenticationContext),
}

/// Ordered set of authenticators shared by every guarded resource.
pub struct AuthenticatorChain {
    authenticators: Vec<Arc<dyn Authenticator>>,
}

impl AuthenticatorChain {
    /// Create a chain. At least one authenticator is required.
    pub fn new(authenticators: Vec<Arc<dyn Authenticator>>) -> Result<Self, AuthError> {
        if authenticators.is_empty() {
            return Err(AuthError::Misconfigured(
                "an authenticator chain needs at least one authenticator".to_string(),
            ));
        }
        Ok(Self { authenticators })
    }

    /// Create a chain holding a single authenticator.
    pub fn single(authenticator: impl Authenticator + 'static) -> Self {
        Self {
            authenticators: vec![Arc::new(authenticator)],
        }
    }

    /// Names of the configured authenticators, in order.
    pub fn names(&self) -> Vec<&str> {
        self.authenticators.iter().map(|a| a.name()).collect()
    }

    /// Run the authenticators against a request, ignoring resource policy.
    pub async fn authenticate(
        &self,
        request: &AuthRequest<'_>,
    ) -> Result<AuthenticationContext, AuthError> {
        let mut first_failure: Option<AuthError> = None;

        for authenticator in &self.authenticators {
            match authenticator.authenticate(request).await {
                Ok(mut context) => {
                    context.authenticator = authenticator.name().to_string();
                    debug!(
                        authenticator = authenticator.name(),
                        route = request.route.template,
                        "Request authenticated"
                    );
                    return Ok(context);
                }
                Err(err) if err.is_recoverable() => {
                    debug!(
                        authenticator = authenticator.name(),
                        error_code = err.error_code(),
                        "Authenticator rejected request"
                    );
                    first_failure.get_or_insert(err);
                }
                Err(err) => {
                    error!(
                        authenticator = authenticator.name(),
                        error_code = err.error_code(),
                        error = %err,
                        "Authenticator failed"
                    );
                    return Err(err);
                }
            }
        }

        let err = first_failure.unwrap_or_else(|| {
            AuthError::Misconfigured("authenticator chain is empty".to_string())
        });
        warn!(
            route = request.route.template,
            error_code = err.error_code(),
            "Authentication failed"
        );
        Err(err)
    }

    /// Authenticate a request for a resource, honouring its policy.
    pub async fn process(
        &self,
        request: &AuthRequest<'_>,
        resource: &Resource,
    ) -> Result<AuthOutcome, AuthError> {
        if resource.should_skip(request.method, &request.route)? {
            debug!(
                resource = resource.name(),
                method = %request.method,
                route = request.route.template,
                "Authentication skipped by resource policy"
            );
            return Ok(AuthOutcome::Skipped);
        }

        self.authenticate(request)
            .await
            .map(AuthOutcome::Authenticated)
    }
}

/// A resource bound to the chain that protects it.
///
/// Construction validates the resource, so a policy relying on responder
/// names is refused at setup when the resource declares no responders.
#[derive(Clone)]
pub struct ResourceGuard {
    chain: Arc<AuthenticatorChain>,
    resource: Arc<Resource>,
}

impl ResourceGuard {
    /// Bind a resource to a chain.
    pub fn new(chain: Arc<AuthenticatorChain>, resource: Resource) -> Result<Self, AuthError> {
        resource.validate()?;
        Ok(Self {
            chain,
            resource: Arc::new(resource),
        })
    }

    /// The guarded resource.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Authenticate a request matched to `template`.
    pub async fn check(
        &self,
        method: &Method,
        headers: &HeaderMap,
        template: &str,
    ) -> Result<AuthOutcome, AuthError> {
        let request = AuthRequest {
            method,
            headers,
            route: self.resource.route_match(method, template),
        };
        self.chain.process(&request, &self.resource).await
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Resource registration and the routing contract consumed by the chain.

use std::collections::HashMap;

use axum::http::Method;

use super::error::AuthError;
use super::policy::{should_skip, ResourceAuthPolicy};

/// What the routing layer knows about a matched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    /// Route template the request matched (e.g. `/users/{id}`)
    pub template: &'a str,
    /// Name of the responder handling the request, if the router knows it
    pub responder: Option<&'a str>,
}

/// A routable resource as seen by the authenticator chain.
///
/// Every resource carries an explicit, possibly absent, [`ResourceAuthPolicy`].
/// Absent means "never skip". A resource that declares a responder table
/// tells the chain which handler serves each method; without one the router
/// cannot name responders.
#[derive(Debug, Clone)]
pub struct Resource {
    name: String,
    policy: Option<ResourceAuthPolicy>,
    responders: Option<HashMap<Method, String>>,
}

impl Resource {
    /// Create a resource with no policy and no responder table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            policy: None,
            responders: None,
        }
    }

    /// Attach the authentication policy.
    pub fn with_policy(mut self, policy: ResourceAuthPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Declare the responder serving `method`.
    pub fn responder(mut self, method: Method, name: impl Into<String>) -> Self {
        self.responders
            .get_or_insert_with(HashMap::new)
            .insert(method, name.into());
        self
    }

    /// Resource name, used in logs and configuration errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The attached policy, if any.
    pub fn policy(&self) -> Option<&ResourceAuthPolicy> {
        self.policy.as_ref()
    }

    /// Refuse a policy that needs responder names the router cannot supply.
    pub fn validate(&self) -> Result<(), AuthError> {
        let needs_responder = self.policy.as_ref().is_some_and(ResourceAuthPolicy::needs_responder);
        if needs_responder && self.responders.is_none() {
            return Err(AuthError::RoutingCapabilityMissing {
                resource: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Build the routing result for a request matched to `template`.
    ///
    /// `HEAD` falls back to the `GET` responder, as axum routes it.
    pub fn route_match<'a>(&'a self, method: &Method, template: &'a str) -> RouteMatch<'a> {
        let responder = self.responders.as_ref().and_then(|table| {
            table.get(method).or_else(|| {
                if *method == Method::HEAD {
                    table.get(&Method::GET)
                } else {
                    None
                }
            })
        });

        RouteMatch {
            template,
            responder: responder.map(String::as_str),
        }
    }

    /// Evaluate the resource's policy for one request.
    pub fn should_skip(&self, method: &Method, route: &RouteMatch<'_>) -> Result<bool, AuthError> {
        let Some(policy) = &self.policy else {
            return Ok(false);
        };

        should_skip(policy, method.as_str(), route.template, route.responder).map_err(|_| {
            AuthError::RoutingCapabilityMissing {
                resource: self.name.clone(),
            }
        })
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-resource authentication bypass rules.
//!
//! A [`ResourceAuthPolicy`] is declared once when a resource is registered and
//! read on every request. A request skips authentication when any of these
//! holds:
//!
//! - its route template is listed in `skip_uris`
//! - its method (case-insensitive) is listed in `skip_methods`
//! - the matched responder name is listed in `skip_responders`
//!
//! Route templates are the patterns handed to the router (`/users/{id}`),
//! never resolved paths.

use std::collections::BTreeSet;

/// The routing layer supplied no responder name although `skip_responders`
/// needs one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponderUnavailable;

/// Authentication bypass policy attached to a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceAuthPolicy {
    skip_methods: BTreeSet<String>,
    skip_uris: BTreeSet<String>,
    skip_responders: BTreeSet<String>,
}

impl ResourceAuthPolicy {
    /// Create an empty policy (never skips).
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip authentication for these HTTP methods.
    pub fn skip_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.skip_methods
            .extend(methods.into_iter().map(|m| m.as_ref().to_ascii_uppercase()));
        self
    }

    /// Skip authentication for these route templates.
    pub fn skip_uris<I, S>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_uris.extend(uris.into_iter().map(Into::into));
        self
    }

    /// Skip authentication for these responder (handler) names.
    pub fn skip_responders<I, S>(mut self, responders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_responders
            .extend(responders.into_iter().map(Into::into));
        self
    }

    /// Whether this policy can never skip a request.
    pub fn is_empty(&self) -> bool {
        self.skip_methods.is_empty() && self.skip_uris.is_empty() && self.skip_responders.is_empty()
    }

    /// Whether the policy depends on responder names from the routing layer.
    pub fn needs_responder(&self) -> bool {
        !self.skip_responders.is_empty()
    }
}

/// Decide whether a request bypasses authentication.
///
/// Fails with [`ResponderUnavailable`] when `skip_responders` is in use and no
/// earlier rule matched but the router did not name the responder: silently
/// skipping or silently authenticating would both hide a wiring mistake.
pub fn should_skip(
    policy: &ResourceAuthPolicy,
    method: &str,
    route_template: &str,
    responder: Option<&str>,
) -> Result<bool, ResponderUnavailable> {
    if policy.skip_uris.contains(route_template) {
        return Ok(true);
    }

    if policy
        .skip_methods
        .iter()
        .any(|skip| skip.eq_ignore_ascii_case(method))
    {
        return Ok(true);
    }

    if policy.needs_responder() {
        let responder = responder.ok_or(ResponderUnavailable)?;
        return Ok(policy.skip_responders.contains(responder));
    }

    Ok(false)
}

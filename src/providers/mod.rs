// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity provider presets.
//!
//! Each preset returns a [`JwtVerifierConfig`](crate::auth::JwtVerifierConfig)
//! with the provider's authority filled in; callers may still override the
//! timeout, leeway or key TTL before building the verifier.

mod auth0;
mod azure;

pub use auth0::{auth0, auth0_authority};
pub use azure::{azure_active_directory, azure_authority, AZURE_LOGIN_BASE_URL};

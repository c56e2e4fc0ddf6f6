// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Resource Authenticator - per-resource request authentication for Axum
//!
//! Routes are guarded by an ordered chain of authenticators (RS256 bearer
//! tokens verified against an OIDC-discovered JWKS, or static Basic
//! credentials). Each resource may declare which methods, route templates or
//! responders bypass authentication.
//!
//! ## Modules
//!
//! - `auth` - Authenticator chain, skip rules, JWT/JWKS and Basic authenticators
//! - `providers` - Identity provider presets (Azure AD, Auth0)
//! - `config` - Environment-driven service settings
//! - `api` - HTTP API handlers of the demonstration service (Axum)

pub mod api;
pub mod auth;
pub mod config;
pub mod providers;
pub mod state;

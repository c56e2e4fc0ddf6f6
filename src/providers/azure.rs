// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Azure Active Directory (Microsoft identity platform v2.0).

use crate::auth::JwtVerifierConfig;

pub const AZURE_LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";

/// Issuer of v2.0 tokens for `tenant_id`.
pub fn azure_authority(tenant_id: &str) -> String {
    format!("{AZURE_LOGIN_BASE_URL}/{tenant_id}/v2.0")
}

/// Verifier configuration for an Azure AD application.
pub fn azure_active_directory(
    tenant_id: &str,
    client_id: impl Into<String>,
) -> JwtVerifierConfig {
    JwtVerifierConfig::new(client_id, azure_authority(tenant_id))
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Auth0 tenants.

use crate::auth::JwtVerifierConfig;

/// Issuer for an Auth0 domain.
///
/// Auth0 issues tokens with `iss` set to `https://<domain>/`, trailing slash
/// included. A bare domain is given the `https` scheme.
pub fn auth0_authority(domain: &str) -> String {
    let domain = domain.trim_end_matches('/');
    if domain.starts_with("https://") || domain.starts_with("http://") {
        format!("{domain}/")
    } else {
        format!("https://{domain}/")
    }
}

/// Verifier configuration for an Auth0 application.
pub fn auth0(domain: &str, client_id: impl Into<String>) -> JwtVerifierConfig {
    JwtVerifierConfig::new(client_id, auth0_authority(domain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_normalisation() {
        assert_eq!(auth0_authority("xxx.eu.auth0.com"), "https://xxx.eu.auth0.com/");
        assert_eq!(auth0_authority("https://xxx.eu.auth0.com"), "https://xxx.eu.auth0.com/");
        assert_eq!(auth0_authority("https://xxx.eu.auth0.com/"), "https://xxx.eu.auth0.com/");
    }

    #[test]
    fn discovery_url() {
        let config = auth0("xxx.eu.auth0.com", "CLIENT_ID");
        assert_eq!(
            config.resolved_discovery_url().unwrap(),
            "https://xxx.eu.auth0.com/.well-known/openid-configuration"
        );
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{
    AuthError, Authenticator, AuthenticatorChain, JwtVerifier, StaticBasicAuthenticator,
};
use crate::config::Settings;

#[derive(Clone)]
pub struct AppState {
    pub chain: Arc<AuthenticatorChain>,
    /// Bearer verifier, kept for readiness reporting
    pub verifier: Option<Arc<JwtVerifier>>,
}

impl AppState {
    pub fn new(chain: AuthenticatorChain, verifier: Option<Arc<JwtVerifier>>) -> Self {
        Self {
            chain: Arc::new(chain),
            verifier,
        }
    }

    /// Build the chain from settings: JWT first, then static Basic.
    pub fn from_settings(settings: &Settings) -> Result<Self, AuthError> {
        let mut authenticators: Vec<Arc<dyn Authenticator>> = Vec::new();

        let verifier = match &settings.jwt {
            Some(config) => {
                let verifier = Arc::new(JwtVerifier::new(config.clone())?);
                authenticators.push(verifier.clone());
                Some(verifier)
            }
            None => None,
        };

        if let Some(basic) = &settings.basic {
            authenticators.push(Arc::new(StaticBasicAuthenticator::new(
                &basic.username,
                &basic.password,
            )));
        }

        Ok(Self::new(AuthenticatorChain::new(authenticators)?, verifier))
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the [`Settings`] loaded from
//! them at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `AUTH_AUTHORITY` | OAuth authority, expected `iss` | - |
//! | `AUTH_AZURE_TENANT_ID` | Azure AD tenant (replaces `AUTH_AUTHORITY`) | - |
//! | `AUTH_CLIENT_ID` | Expected `aud` | Required with a JWT authority |
//! | `AUTH_OIDC_DISCOVERY_URL` | OIDC metadata URL | `<authority>/.well-known/openid-configuration` |
//! | `AUTH_JWKS_URL` | JWKS URL, skips discovery | - |
//! | `AUTH_HTTP_TIMEOUT_SECS` | Discovery / JWKS request timeout | `10` |
//! | `AUTH_LEEWAY_SECS` | Clock skew tolerance | `60` |
//! | `AUTH_KEY_TTL_SECS` | Cached key lifetime | unset (until reset) |
//! | `AUTH_BASIC_USERNAME` | Static Basic username | - |
//! | `AUTH_BASIC_PASSWORD` | Static Basic password | - |

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::auth::jwt::{DEFAULT_HTTP_TIMEOUT, DEFAULT_LEEWAY_SECS};
use crate::auth::JwtVerifierConfig;
use crate::providers::azure_active_directory;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const AUTH_AUTHORITY_ENV: &str = "AUTH_AUTHORITY";
pub const AUTH_AZURE_TENANT_ID_ENV: &str = "AUTH_AZURE_TENANT_ID";
pub const AUTH_CLIENT_ID_ENV: &str = "AUTH_CLIENT_ID";
pub const AUTH_OIDC_DISCOVERY_URL_ENV: &str = "AUTH_OIDC_DISCOVERY_URL";
pub const AUTH_JWKS_URL_ENV: &str = "AUTH_JWKS_URL";
pub const AUTH_HTTP_TIMEOUT_SECS_ENV: &str = "AUTH_HTTP_TIMEOUT_SECS";
pub const AUTH_LEEWAY_SECS_ENV: &str = "AUTH_LEEWAY_SECS";
pub const AUTH_KEY_TTL_SECS_ENV: &str = "AUTH_KEY_TTL_SECS";
pub const AUTH_BASIC_USERNAME_ENV: &str = "AUTH_BASIC_USERNAME";
pub const AUTH_BASIC_PASSWORD_ENV: &str = "AUTH_BASIC_PASSWORD";

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },

    #[error("{0} and {1} are mutually exclusive")]
    Conflict(&'static str, &'static str),

    #[error("No authenticator configured: set AUTH_AUTHORITY, AUTH_AZURE_TENANT_ID or AUTH_BASIC_USERNAME")]
    NoAuthenticator,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Static Basic credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

/// Service settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    /// Bearer token verification, if configured
    pub jwt: Option<JwtVerifierConfig>,
    /// Static Basic authentication, if configured
    pub basic: Option<BasicCredentials>,
}

impl Settings {
    /// Load settings from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load settings from a map (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| vars.get(name).filter(|v| !v.is_empty()).cloned();

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(vars, PORT_ENV, DEFAULT_PORT)?;
        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            None => LogFormat::default(),
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(v) if v.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            Some(v) => {
                return Err(ConfigError::InvalidValue {
                    name: LOG_FORMAT_ENV,
                    value: v.to_string(),
                })
            }
        };

        let client_id = || get(AUTH_CLIENT_ID_ENV).ok_or(ConfigError::MissingEnvVar(AUTH_CLIENT_ID_ENV));
        let jwt = match (get(AUTH_AUTHORITY_ENV), get(AUTH_AZURE_TENANT_ID_ENV)) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Conflict(
                    AUTH_AUTHORITY_ENV,
                    AUTH_AZURE_TENANT_ID_ENV,
                ))
            }
            (Some(authority), None) => Some(JwtVerifierConfig::new(client_id()?, authority)),
            (None, Some(tenant_id)) => Some(azure_active_directory(&tenant_id, client_id()?)),
            (None, None) => None,
        };

        let jwt = match jwt {
            Some(mut config) => {
                config.discovery_url = get(AUTH_OIDC_DISCOVERY_URL_ENV);
                config.jwks_uri = get(AUTH_JWKS_URL_ENV);
                config.http_timeout = Duration::from_secs(parse_or(
                    vars,
                    AUTH_HTTP_TIMEOUT_SECS_ENV,
                    DEFAULT_HTTP_TIMEOUT.as_secs(),
                )?);
                config.leeway_secs = parse_or(vars, AUTH_LEEWAY_SECS_ENV, DEFAULT_LEEWAY_SECS)?;
                config.key_ttl =
                    parse_opt::<u64>(vars, AUTH_KEY_TTL_SECS_ENV)?.map(Duration::from_secs);
                Some(config)
            }
            None => None,
        };

        let basic = match (get(AUTH_BASIC_USERNAME_ENV), get(AUTH_BASIC_PASSWORD_ENV)) {
            (Some(username), Some(password)) => Some(BasicCredentials { username, password }),
            (Some(_), None) => return Err(ConfigError::MissingEnvVar(AUTH_BASIC_PASSWORD_ENV)),
            (None, Some(_)) => return Err(ConfigError::MissingEnvVar(AUTH_BASIC_USERNAME_ENV)),
            (None, None) => None,
        };

        if jwt.is_none() && basic.is_none() {
            return Err(ConfigError::NoAuthenticator);
        }

        Ok(Self {
            host,
            port,
            log_format,
            jwt,
            basic,
        })
    }

    /// `host:port` bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_opt<T: FromStr>(
    vars: &HashMap<String, String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match vars.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        }),
    }
}

fn parse_or<T: FromStr>(
    vars: &HashMap<String, String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    Ok(parse_opt(vars, name)?.unwrap_or(default))
}

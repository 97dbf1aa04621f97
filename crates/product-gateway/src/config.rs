//! Product Gateway configuration.
//!
//! Configuration is loaded from environment variables once at startup and is
//! immutable for the lifetime of the process. The tenant identifier is public
//! configuration, not a secret; no client secret is consumed by this service.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default JWT clock skew tolerance in seconds (5 minutes).
pub const DEFAULT_CLOCK_SKEW_SECONDS: i64 = 300;

/// Maximum allowed JWT clock skew tolerance in seconds (10 minutes).
///
/// Prevents misconfiguration that would weaken issued-at validation.
pub const MAX_CLOCK_SKEW_SECONDS: i64 = 600;

/// Default JWKS cache TTL in seconds (5 minutes).
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 300;

/// Product Gateway configuration.
///
/// Loaded from environment variables with sensible defaults. The JWKS URL
/// and issuer are derived from the tenant when not set explicitly, matching
/// the identity provider's published endpoint layout.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Identity provider tenant identifier.
    pub tenant_id: String,

    /// Expected `aud` claim value (the backend application ID).
    pub audience: String,

    /// Expected `iss` claim value.
    pub issuer: String,

    /// URL of the provider's JWKS endpoint.
    pub jwks_url: String,

    /// JWT clock skew tolerance in seconds for issued-at validation.
    pub clock_skew_seconds: i64,

    /// How long fetched signing keys are trusted before a refetch.
    pub jwks_cache_ttl: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid clock skew configuration: {0}")]
    InvalidClockSkew(String),

    #[error("Invalid JWKS cache TTL configuration: {0}")]
    InvalidJwksCacheTtl(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let tenant_id = vars
            .get("OIDC_TENANT_ID")
            .ok_or_else(|| ConfigError::MissingEnvVar("OIDC_TENANT_ID".to_string()))?
            .clone();

        let audience = vars
            .get("OIDC_AUDIENCE")
            .ok_or_else(|| ConfigError::MissingEnvVar("OIDC_AUDIENCE".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let issuer = vars.get("OIDC_ISSUER").cloned().unwrap_or_else(|| {
            format!("https://login.microsoftonline.com/{}/v2.0", tenant_id)
        });

        let jwks_url = vars.get("OIDC_JWKS_URL").cloned().unwrap_or_else(|| {
            format!(
                "https://login.microsoftonline.com/{}/discovery/v2.0/keys",
                tenant_id
            )
        });

        // Parse clock skew tolerance with validation
        let clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {}",
                    value
                )));
            }

            if value > MAX_CLOCK_SKEW_SECONDS {
                return Err(ConfigError::InvalidClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW_SECONDS, value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW_SECONDS
        };

        // Parse JWKS cache TTL with validation
        let jwks_cache_ttl_seconds = if let Some(value_str) = vars.get("JWKS_CACHE_TTL_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwksCacheTtl(format!(
                    "JWKS_CACHE_TTL_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidJwksCacheTtl(
                    "JWKS_CACHE_TTL_SECONDS must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_JWKS_CACHE_TTL_SECONDS
        };

        Ok(Config {
            bind_address,
            tenant_id,
            audience,
            issuer,
            jwks_url,
            clock_skew_seconds,
            jwks_cache_ttl: Duration::from_secs(jwks_cache_ttl_seconds),
        })
    }
}

//! Verified token claims.
//!
//! Contains the claim set returned by successful verification. The `sub`
//! field is redacted in Debug output to keep user identifiers out of logs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Claims extracted from a verified token.
///
/// Immutable after creation; returned to the caller as the result of
/// verification and stored in request extensions by the auth middleware.
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user or client identifier) - redacted in Debug output.
    pub sub: String,

    /// Intended recipient of the token (the backend application ID).
    pub aud: String,

    /// Canonical URI of the issuing identity provider.
    pub iss: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Space-separated delegated scopes, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scp: Option<String>,

    /// Display name, if the provider included one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Custom Debug implementation that redacts the `sub` field.
impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("aud", &self.aud)
            .field("iss", &self.iss)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("scp", &self.scp)
            .field("name", &self.name)
            .finish()
    }
}

impl Claims {
    /// Check if the token carries a specific delegated scope.
    ///
    /// Scopes are space-separated in the `scp` claim.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scp
            .as_deref()
            .map(|s| s.split_whitespace().any(|v| v == scope))
            .unwrap_or(false)
    }

    /// Get all delegated scopes as a vector.
    pub fn scopes(&self) -> Vec<&str> {
        self.scp
            .as_deref()
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }
}

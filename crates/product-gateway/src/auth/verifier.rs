//! Token verification.
//!
//! Validates incoming bearer tokens against public keys resolved from the
//! identity provider's JWKS endpoint.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The algorithm allow-list (RS256 only) is enforced against the declared
//!   header algorithm before any key resolution or signature work, so a
//!   token can never select its own verification algorithm
//! - Expiry, audience, and issuer are checked with exact semantics
//! - Generic error messages prevent information leakage

use crate::auth::claims::Claims;
use crate::auth::jwks::{Jwk, KeyResolver};
use crate::errors::AuthError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, Validation};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

/// The only signature algorithm this service accepts.
///
/// A compile-time constant rather than configuration so a misconfigured
/// deployment cannot widen the allow-list.
const ALLOWED_ALGORITHM: &str = "RS256";

/// Maximum allowed token size in bytes (8 KiB).
///
/// Oversized tokens are rejected before any base64 or JSON work.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

/// Fields extracted from a token header prior to signature verification.
#[derive(Debug)]
struct TokenHeader {
    kid: String,
    alg: String,
}

/// Verifies bearer tokens using keys from the identity provider.
pub struct TokenVerifier {
    /// Resolver for public signing keys.
    resolver: Arc<KeyResolver>,

    /// Expected `aud` claim value.
    audience: String,

    /// Expected `iss` claim value.
    issuer: String,

    /// Clock skew tolerance in seconds for issued-at validation.
    clock_skew_seconds: i64,
}

impl TokenVerifier {
    /// Create a new token verifier.
    pub fn new(
        resolver: Arc<KeyResolver>,
        audience: String,
        issuer: String,
        clock_skew_seconds: i64,
    ) -> Self {
        Self {
            resolver,
            audience,
            issuer,
            clock_skew_seconds,
        }
    }

    /// Verify a token and return its claims.
    ///
    /// Verification steps, each terminal on failure:
    ///
    /// 1. Decode the header without verifying the signature; extract `kid`
    ///    and the declared algorithm
    /// 2. Enforce the RS256 allow-list against the declared algorithm
    /// 3. Resolve the signing key via the key resolver
    /// 4. Verify the RS256 signature over header+payload
    /// 5. Validate claims: expiry, audience, issuer, issued-at
    ///
    /// # Errors
    ///
    /// Returns the `AuthError` variant naming the stage that refused the
    /// token; see [`AuthError`] for the taxonomy.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token)?;

        // Allow-list check comes before any key work: a declared algorithm
        // outside the list is rejected even if its signature would verify.
        if header.alg != ALLOWED_ALGORITHM {
            tracing::debug!(
                target: "gateway.auth.verifier",
                alg = %header.alg,
                "declared algorithm not in allow-list"
            );
            return Err(AuthError::SignatureInvalid);
        }

        let jwk = self.resolver.resolve(&header.kid).await?;

        let claims = check_signature(token, &jwk)?;

        self.check_claims(&claims, chrono::Utc::now().timestamp())?;

        tracing::debug!(target: "gateway.auth.verifier", "token verified");
        Ok(claims)
    }

    /// Validate claims against configuration and an explicit `now` sample.
    ///
    /// Split out from [`verify`](Self::verify) so boundary conditions can be
    /// unit-tested without wall-clock dependence.
    fn check_claims(&self, claims: &Claims, now: i64) -> Result<(), AuthError> {
        // Boundary: exp == now is already expired.
        if claims.exp <= now {
            tracing::debug!(
                target: "gateway.auth.verifier",
                exp = claims.exp,
                now = now,
                "token expired"
            );
            return Err(AuthError::TokenExpired);
        }

        // Exact equality only; prefix or substring matches are rejections.
        if claims.aud != self.audience {
            tracing::debug!(target: "gateway.auth.verifier", aud = %claims.aud, "audience mismatch");
            return Err(AuthError::AudienceMismatch);
        }

        if claims.iss != self.issuer {
            tracing::debug!(target: "gateway.auth.verifier", iss = %claims.iss, "issuer mismatch");
            return Err(AuthError::IssuerMismatch);
        }

        if claims.iat > now + self.clock_skew_seconds {
            tracing::debug!(
                target: "gateway.auth.verifier",
                iat = claims.iat,
                now = now,
                clock_skew_seconds = self.clock_skew_seconds,
                "iat too far in the future"
            );
            return Err(AuthError::IssuedAtTooFarInFuture);
        }

        Ok(())
    }
}

/// Decode a token header without verifying the signature.
///
/// Extracts the key ID and the declared algorithm. The `kid` value is only
/// ever used to look up a key in the trusted key set; nothing else from the
/// unverified header is trusted.
fn decode_header(token: &str) -> Result<TokenHeader, AuthError> {
    // Size check first (DoS prevention)
    if token.len() > MAX_TOKEN_SIZE_BYTES {
        return Err(AuthError::MalformedToken(format!(
            "token size {} exceeds maximum {}",
            token.len(),
            MAX_TOKEN_SIZE_BYTES
        )));
    }

    // Compact JWS format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::MalformedToken(format!(
            "expected 3 token segments, found {}",
            parts.len()
        )));
    }

    let header_part = parts
        .first()
        .ok_or_else(|| AuthError::MalformedToken("empty token".to_string()))?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        AuthError::MalformedToken(format!("header is not valid base64url: {}", e))
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes)
        .map_err(|e| AuthError::MalformedToken(format!("header is not valid JSON: {}", e)))?;

    let alg = header
        .get("alg")
        .and_then(|v| v.as_str())
        .map(ToString::to_string)
        .ok_or_else(|| AuthError::MalformedToken("header missing alg".to_string()))?;

    // Reject empty kid values for defense-in-depth
    let kid = header
        .get("kid")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| AuthError::MalformedToken("header missing kid".to_string()))?;

    Ok(TokenHeader { kid, alg })
}

/// Verify the token signature with the resolved key and extract claims.
fn check_signature(token: &str, jwk: &Jwk) -> Result<Claims, AuthError> {
    // A published key tagged with a different algorithm must not be used
    // for RS256 verification.
    if let Some(alg) = &jwk.alg {
        if alg != ALLOWED_ALGORITHM {
            tracing::warn!(target: "gateway.auth.verifier", kid = %jwk.kid, alg = %alg, "key algorithm outside allow-list");
            return Err(AuthError::SignatureInvalid);
        }
    }

    let decoding_key = jwk.decoding_key()?;

    let mut validation = Validation::new(Algorithm::RS256);
    // Expiry, audience, and issuer are checked separately with exact
    // semantics; here only the signature and payload structure matter.
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(target: "gateway.auth.verifier", error = %e, "signature verification failed");
        match e.kind() {
            ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                AuthError::MalformedToken("payload is not a valid claim set".to_string())
            }
            _ => AuthError::SignatureInvalid,
        }
    })?;

    Ok(token_data.claims)
}

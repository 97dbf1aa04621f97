//! Product Gateway error types.
//!
//! `AuthError` is the verification taxonomy: each variant names the stage at
//! which a token was refused. `ApiError` maps outcomes to HTTP responses.
//! Client-facing messages are intentionally generic; the actual failure
//! reason is logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Token verification failure taxonomy.
///
/// Every variant is terminal for the current request. Detail strings are for
/// logs only and never reach the client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Token is not parseable as a compact JWS or the header lacks a key ID.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// JWKS endpoint unreachable or returned a non-success status.
    #[error("Key set fetch failed: {0}")]
    KeyFetch(String),

    /// Key ID absent from the key set even after a rotation refetch.
    #[error("Signing key not found: {kid}")]
    KeyNotFound { kid: String },

    /// Key set payload malformed, or an entry could not be converted to
    /// usable key material.
    #[error("Key set parse failed: {0}")]
    KeyParse(String),

    /// Signature verification failed, or the declared algorithm is outside
    /// the allow-list.
    #[error("Signature invalid")]
    SignatureInvalid,

    /// The `exp` claim is not in the future.
    #[error("Token expired")]
    TokenExpired,

    /// The `aud` claim does not exactly equal the configured audience.
    #[error("Audience mismatch")]
    AudienceMismatch,

    /// The `iss` claim does not exactly equal the configured issuer.
    #[error("Issuer mismatch")]
    IssuerMismatch,

    /// The `iat` claim is further in the future than the clock skew allows.
    #[error("Issued-at too far in the future")]
    IssuedAtTooFarInFuture,
}

impl AuthError {
    /// Verification stage that produced this error, for log diagnostics.
    pub fn stage(&self) -> &'static str {
        match self {
            AuthError::MalformedToken(_) => "header_decode",
            AuthError::KeyFetch(_) | AuthError::KeyNotFound { .. } | AuthError::KeyParse(_) => {
                "key_resolution"
            }
            AuthError::SignatureInvalid => "signature_check",
            AuthError::TokenExpired
            | AuthError::AudienceMismatch
            | AuthError::IssuerMismatch
            | AuthError::IssuedAtTooFarInFuture => "claims_check",
        }
    }
}

/// Gateway error type.
///
/// Maps to HTTP status codes:
/// - `NoCredentials`: 401 Unauthorized (no bearer token presented)
/// - `Rejected`: 403 Forbidden (token presented but refused)
/// - `Internal`: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No credentials presented")]
    NoCredentials,

    #[error("Token rejected: {0}")]
    Rejected(#[from] AuthError),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NoCredentials => 401,
            ApiError::Rejected(_) => 403,
            ApiError::Internal => 500,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::NoCredentials => (
                StatusCode::UNAUTHORIZED,
                "NO_CREDENTIALS",
                "Authentication required".to_string(),
            ),
            ApiError::Rejected(reason) => {
                // Log the actual rejection reason server-side; the client
                // only learns that the token was refused.
                tracing::warn!(
                    target: "gateway.auth",
                    stage = reason.stage(),
                    reason = %reason,
                    "Token rejected"
                );
                (
                    StatusCode::FORBIDDEN,
                    "TOKEN_REJECTED",
                    "The access token is invalid or expired".to_string(),
                )
            }
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        // Add WWW-Authenticate header for 401 responses
        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) =
                "Bearer realm=\"product-gateway\", error=\"invalid_request\"".parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

//! Authentication middleware for protected routes.
//!
//! Extracts the bearer token from the Authorization header, verifies it, and
//! injects the verified claims into request extensions. A missing or
//! malformed header is refused with 401 before the verifier runs; a
//! presented-but-rejected token maps to 403.

use crate::auth::{Claims, TokenVerifier};
use crate::errors::ApiError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Token verifier with its key resolver.
    pub verifier: Arc<TokenVerifier>,
}

/// Authentication middleware that verifies bearer tokens.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - 401 Unauthorized with WWW-Authenticate header when no bearer credential
///   is presented (missing header, wrong scheme, empty token)
/// - 403 Forbidden when a presented token is rejected by verification
/// - Continues to the next handler with claims in extensions otherwise
#[instrument(skip(state, req, next), name = "gateway.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    // Extract Authorization header
    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "gateway.middleware.auth", "missing Authorization header");
            ApiError::NoCredentials
        })?;

    // Extract Bearer token
    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::debug!(target: "gateway.middleware.auth", "Authorization header is not a bearer credential");
        ApiError::NoCredentials
    })?;

    if token.is_empty() {
        tracing::debug!(target: "gateway.middleware.auth", "empty bearer token");
        return Err(ApiError::NoCredentials);
    }

    // Verify the token; rejection reasons map to 403
    let claims = state.verifier.verify(token).await?;

    // Store claims in request extensions for downstream handlers
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extension trait for extracting claims from a request.
pub trait ClaimsExt {
    /// Get the verified claims from request extensions.
    ///
    /// Returns `None` if the auth middleware was not applied to this request.
    fn claims(&self) -> Option<&Claims>;
}

impl<B> ClaimsExt for axum::extract::Request<B> {
    fn claims(&self) -> Option<&Claims> {
        self.extensions().get::<Claims>()
    }
}

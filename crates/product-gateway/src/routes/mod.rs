//! HTTP routes for Product Gateway.
//!
//! Defines the Axum router and application state. The token verifier and its
//! key resolver are constructed here from configuration so that every
//! protected route shares one key cache.

use crate::auth::{KeyResolver, TokenVerifier};
use crate::config::Config;
use crate::handlers;
use crate::middleware::{require_auth, AuthState};
use axum::{middleware::from_fn_with_state, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/v1/health` - public health check
/// - `/v1/products` - protected resource, bearer token required
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>) -> Router {
    let resolver = Arc::new(KeyResolver::new(
        state.config.jwks_url.clone(),
        state.config.jwks_cache_ttl,
    ));
    let verifier = Arc::new(TokenVerifier::new(
        resolver,
        state.config.audience.clone(),
        state.config.issuer.clone(),
        state.config.clock_skew_seconds,
    ));
    let auth_state = Arc::new(AuthState { verifier });

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/v1/health", get(handlers::health_check))
        .with_state(state);

    // Protected routes behind the auth middleware
    let protected_routes = Router::new()
        .route("/v1/products", get(handlers::list_products))
        .route_layer(from_fn_with_state(auth_state, require_auth));

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    public_routes
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}

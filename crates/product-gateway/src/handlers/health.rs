//! Health check handler.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /v1/health
///
/// Public liveness endpoint; no authentication required.
///
/// ## Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "tenant": "contoso-tenant"
/// }
/// ```
#[instrument(skip_all, name = "gateway.handlers.health")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        tenant: state.config.tenant_id.clone(),
    })
}

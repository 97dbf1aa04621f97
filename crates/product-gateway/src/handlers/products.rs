//! Protected products handler.
//!
//! Returns the protected resource payload. Only reachable through the auth
//! middleware, so the request always carries verified claims.

use crate::auth::Claims;
use crate::models::Product;
use axum::{Extension, Json};
use tracing::instrument;

/// Handler for GET /v1/products
///
/// Returns the product catalog to an authenticated caller. Requires a valid
/// bearer token via the auth middleware.
///
/// ## Response
///
/// ```json
/// [
///   {"name": "Laptop", "price": 1000},
///   {"name": "Mouse", "price": 50},
///   {"name": "Keyboard", "price": 100}
/// ]
/// ```
#[instrument(skip_all, name = "gateway.handlers.products")]
pub async fn list_products(Extension(claims): Extension<Claims>) -> Json<Vec<Product>> {
    tracing::debug!(
        target: "gateway.handlers.products",
        claims = ?claims,
        "returning product catalog"
    );

    Json(vec![
        Product {
            name: "Laptop".to_string(),
            price: 1000,
        },
        Product {
            name: "Mouse".to_string(),
            price: 50,
        },
        Product {
            name: "Keyboard".to_string(),
            price: 100,
        },
    ])
}

//! Data models for Product Gateway.

use serde::{Deserialize, Serialize};

/// A product exposed by the protected resource endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    /// Display name.
    pub name: String,

    /// Unit price in whole currency units.
    pub price: u32,
}

/// Response for the health check endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status ("healthy").
    pub status: String,

    /// Configured identity provider tenant.
    pub tenant: String,
}

//! HTTP request handlers.

pub mod health;
pub mod products;

pub use health::health_check;
pub use products::list_products;

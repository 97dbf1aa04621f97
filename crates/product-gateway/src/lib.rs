//! Product Gateway Service Library
//!
//! A resource API that validates OIDC bearer tokens before serving protected
//! data. Token verification is the core of the service:
//!
//! - `auth::jwks::KeyResolver` fetches and caches the identity provider's
//!   public signing keys (JWKS) and resolves key IDs to keys
//! - `auth::verifier::TokenVerifier` decodes a token's header, resolves its
//!   signing key, verifies the RS256 signature, and enforces claim
//!   constraints (expiry, audience, issuer, algorithm allow-list)
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> auth/verifier.rs -> auth/jwks.rs
//!                                     -> handlers/*.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Token verification subsystem (key resolver, verifier, claims)
//! - `config` - Service configuration from environment
//! - `errors` - Error taxonomy with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Bearer token extraction and enforcement
//! - `models` - Data models
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

//! Token verification subsystem.
//!
//! Two components composed per request: `KeyResolver` maps a key ID from a
//! token header to a public signing key fetched from the identity provider's
//! JWKS endpoint, and `TokenVerifier` checks the token's signature and claims
//! against that key and the configured audience/issuer.

pub mod claims;
pub mod jwks;
pub mod verifier;

pub use claims::Claims;
pub use jwks::{Jwk, KeyResolver};
pub use verifier::TokenVerifier;

//! Key resolver: fetches and caches public signing keys from the identity
//! provider's JWKS endpoint.
//!
//! The resolver maps a key ID (`kid`) from a token header to a public key,
//! hiding the cost and failure modes of the remote fetch. Keys are cached
//! with a TTL and replaced wholesale on refetch; a `kid` missing from a
//! fresh cache triggers exactly one refetch to tolerate provider key
//! rotation.
//!
//! # Security
//!
//! - The configured endpoint is the sole source of trusted key material;
//!   nothing from the token itself is ever admitted to the cache
//! - The cache reference is swapped atomically after a successful fetch, so
//!   readers never observe a partially populated key set
//! - HTTPS is expected in production (enforced by deployment config)

use crate::errors::AuthError;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Timeout for a single JWKS fetch request.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON Web Key as published by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type (always "RSA" for RS256 keys).
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    pub kid: String,

    /// Algorithm (should be "RS256").
    #[serde(default)]
    pub alg: Option<String>,

    /// RSA modulus (base64url encoded).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url encoded).
    #[serde(default)]
    pub e: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

impl Jwk {
    /// Convert this entry into a usable verification key.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyParse` when the key type is not RSA or the
    /// modulus/exponent components are missing or not valid base64url.
    pub fn decoding_key(&self) -> Result<DecodingKey, AuthError> {
        if self.kty != "RSA" {
            return Err(AuthError::KeyParse(format!(
                "unsupported key type '{}' for kid {}",
                self.kty, self.kid
            )));
        }

        let n = self.n.as_deref().ok_or_else(|| {
            AuthError::KeyParse(format!("key {} missing RSA modulus", self.kid))
        })?;
        let e = self.e.as_deref().ok_or_else(|| {
            AuthError::KeyParse(format!("key {} missing RSA exponent", self.kid))
        })?;

        DecodingKey::from_rsa_components(n, e).map_err(|err| {
            AuthError::KeyParse(format!("key {} has invalid RSA components: {}", self.kid, err))
        })
    }
}

/// JWKS document from the provider's endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct KeySetResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// Cached key set with its TTL expiry and a generation counter.
///
/// The generation is bumped on every successful refetch so that concurrent
/// callers can tell whether someone else already refreshed the set they saw.
struct CachedKeySet {
    /// Map of key ID to JWK.
    keys: HashMap<String, Jwk>,

    /// Monotonic refetch counter.
    generation: u64,

    /// When this cache entry expires.
    expires_at: Instant,
}

/// Resolves key IDs to public signing keys, caching the provider's key set.
///
/// Thread-safe; concurrent callers that miss the same cache generation are
/// coalesced into a single in-flight fetch.
pub struct KeyResolver {
    /// URL of the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching the key set.
    http_client: reqwest::Client,

    /// Cached key set, replaced wholesale on refetch.
    cache: Arc<RwLock<Option<CachedKeySet>>>,

    /// Serializes refetches so a miss flood produces one network request.
    refresh_lock: Mutex<()>,

    /// How long a fetched key set is trusted.
    cache_ttl: Duration,
}

impl KeyResolver {
    /// Create a new key resolver.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL of the provider's JWKS endpoint
    /// * `cache_ttl` - How long to trust a fetched key set before refreshing
    pub fn new(jwks_url: String, cache_ttl: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "gateway.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: Arc::new(RwLock::new(None)),
            refresh_lock: Mutex::new(()),
            cache_ttl,
        }
    }

    /// Resolve a key ID to its signing key.
    ///
    /// Returns the key from cache when present. On a cold, expired, or
    /// rotated cache (kid absent from a fresh set), fetches the key set
    /// once before failing.
    ///
    /// # Errors
    ///
    /// - `AuthError::KeyFetch` - network failure or non-success status
    /// - `AuthError::KeyParse` - malformed key set payload
    /// - `AuthError::KeyNotFound` - kid absent even after refetch
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn resolve(&self, kid: &str) -> Result<Jwk, AuthError> {
        // Fast path: fresh cache containing the key.
        let seen_generation = {
            let cache = self.cache.read().await;
            match cache.as_ref() {
                Some(cached) if cached.expires_at > Instant::now() => {
                    if let Some(key) = cached.keys.get(kid) {
                        tracing::debug!(target: "gateway.auth.jwks", kid = %kid, "key set cache hit");
                        return Ok(key.clone());
                    }
                    // Fresh cache without this kid: the provider may have
                    // rotated keys, so one refetch is required before failing.
                    tracing::debug!(target: "gateway.auth.jwks", kid = %kid, "kid missing from fresh key set, refetching");
                    cached.generation
                }
                Some(cached) => cached.generation,
                None => 0,
            }
        };

        self.refresh(seen_generation).await?;

        let cache = self.cache.read().await;
        if let Some(cached) = cache.as_ref() {
            if let Some(key) = cached.keys.get(kid) {
                return Ok(key.clone());
            }
        }

        tracing::warn!(target: "gateway.auth.jwks", kid = %kid, "kid not found in key set after refetch");
        Err(AuthError::KeyNotFound {
            kid: kid.to_string(),
        })
    }

    /// Refresh the cached key set, coalescing concurrent callers.
    ///
    /// `seen_generation` is the generation the caller observed before
    /// deciding to refresh. If another caller already replaced that
    /// generation with a fresh set, the network round trip is skipped.
    async fn refresh(&self, seen_generation: u64) -> Result<(), AuthError> {
        let _guard = self.refresh_lock.lock().await;

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.generation > seen_generation && cached.expires_at > Instant::now() {
                    tracing::debug!(target: "gateway.auth.jwks", "key set already refreshed by concurrent caller");
                    return Ok(());
                }
            }
        }

        // The fetch runs in a spawned task so that a caller cancelled at its
        // own deadline does not abort cache population for other waiters.
        let client = self.http_client.clone();
        let url = self.jwks_url.clone();
        let cache = Arc::clone(&self.cache);
        let ttl = self.cache_ttl;

        let task = tokio::spawn(async move {
            let keys = fetch_key_set(&client, &url).await?;

            let mut guard = cache.write().await;
            let generation = guard.as_ref().map_or(0, |c| c.generation) + 1;
            tracing::info!(
                target: "gateway.auth.jwks",
                key_count = keys.len(),
                generation = generation,
                "key set cache refreshed"
            );
            // Replace-on-refetch: the whole set is swapped, never merged.
            *guard = Some(CachedKeySet {
                keys,
                generation,
                expires_at: Instant::now() + ttl,
            });
            Ok::<(), AuthError>(())
        });

        task.await
            .map_err(|e| AuthError::KeyFetch(format!("key set refresh task failed: {}", e)))?
    }
}

/// Fetch and parse the JWKS document.
///
/// Retries once immediately on a transient request error, then fails.
async fn fetch_key_set(
    client: &reqwest::Client,
    url: &str,
) -> Result<HashMap<String, Jwk>, AuthError> {
    tracing::debug!(target: "gateway.auth.jwks", url = %url, "fetching key set");

    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(first_err) => {
            tracing::debug!(target: "gateway.auth.jwks", error = %first_err, "key set fetch failed, retrying once");
            client.get(url).send().await.map_err(|e| {
                tracing::error!(target: "gateway.auth.jwks", error = %e, "key set fetch failed after retry");
                AuthError::KeyFetch(format!("request failed: {}", e))
            })?
        }
    };

    if !response.status().is_success() {
        tracing::error!(
            target: "gateway.auth.jwks",
            status = %response.status(),
            "key set endpoint returned error"
        );
        return Err(AuthError::KeyFetch(format!(
            "endpoint returned status {}",
            response.status()
        )));
    }

    let key_set: KeySetResponse = response.json().await.map_err(|e| {
        tracing::error!(target: "gateway.auth.jwks", error = %e, "failed to parse key set response");
        AuthError::KeyParse(format!("invalid key set document: {}", e))
    })?;

    Ok(key_set
        .keys
        .into_iter()
        .map(|key| (key.kid.clone(), key))
        .collect())
}

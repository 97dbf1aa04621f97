//! Key resolver integration tests.
//!
//! Exercises caching, rotation refetch, single-flight coalescing, and the
//! fetch failure taxonomy against a mocked JWKS endpoint.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use anyhow::Result;
use common::{other_keypair, shared_keypair};
use product_gateway::auth::KeyResolver;
use product_gateway::errors::AuthError;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEYS_PATH: &str = "/discovery/v2.0/keys";

fn resolver_for(mock_server: &MockServer, ttl: Duration) -> KeyResolver {
    KeyResolver::new(format!("{}{}", mock_server.uri(), KEYS_PATH), ttl)
}

async fn mount_key_set(mock_server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(KEYS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(mock_server)
        .await;
}

/// A cached key is served without a second network round trip.
#[tokio::test]
async fn test_resolve_caches_key_set() -> Result<()> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(KEYS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(shared_keypair().key_set_json()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server, Duration::from_secs(300));

    let first = resolver.resolve(&shared_keypair().kid).await?;
    let second = resolver.resolve(&shared_keypair().kid).await?;

    assert_eq!(first.kid, shared_keypair().kid);
    assert_eq!(second.kid, shared_keypair().kid);
    // expect(1) is verified when mock_server drops

    Ok(())
}

/// A kid missing from a fresh cache triggers exactly one refetch, which
/// picks up a rotated-in key.
#[tokio::test]
async fn test_resolve_refetches_on_rotation() -> Result<()> {
    let mock_server = MockServer::start().await;
    mount_key_set(&mock_server, shared_keypair().key_set_json()).await;

    let resolver = resolver_for(&mock_server, Duration::from_secs(300));

    // Warm the cache with the original key set
    resolver.resolve(&shared_keypair().kid).await?;

    // Provider rotates: new key set published
    mock_server.reset().await;
    mount_key_set(
        &mock_server,
        serde_json::json!({
            "keys": [shared_keypair().jwk_json(), other_keypair().jwk_json()]
        }),
    )
    .await;

    // The rotated-in key resolves via the rotation refetch
    let resolved = resolver.resolve(&other_keypair().kid).await?;
    assert_eq!(resolved.kid, other_keypair().kid);

    Ok(())
}

/// A kid absent even after the rotation refetch is KeyNotFound, and the
/// refetch happens exactly once.
#[tokio::test]
async fn test_resolve_unknown_kid_refetches_once() -> Result<()> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(KEYS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(shared_keypair().key_set_json()))
        .expect(2) // initial warm fetch + one rotation refetch
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server, Duration::from_secs(300));

    resolver.resolve(&shared_keypair().kid).await?;

    let result = resolver.resolve("no-such-kid").await;
    assert!(
        matches!(result, Err(AuthError::KeyNotFound { ref kid }) if kid == "no-such-kid"),
        "expected KeyNotFound, got {:?}",
        result
    );

    Ok(())
}

/// A concurrent flood of resolves for the same missing kid coalesces into
/// one network fetch.
#[tokio::test]
async fn test_concurrent_resolves_coalesce_into_one_fetch() -> Result<()> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(KEYS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(shared_keypair().key_set_json())
                // Slow response so all callers are in flight together
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let resolver = Arc::new(resolver_for(&mock_server, Duration::from_secs(300)));

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            tokio::spawn(async move { resolver.resolve(&shared_keypair().kid).await })
        })
        .collect();

    for task in futures::future::join_all(tasks).await {
        let resolved = task.expect("task panicked")?;
        assert_eq!(resolved.kid, shared_keypair().kid);
    }
    // expect(1) is verified when mock_server drops

    Ok(())
}

/// A non-success status from the endpoint is a fetch failure.
#[tokio::test]
async fn test_resolve_maps_error_status_to_key_fetch() -> Result<()> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(KEYS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server, Duration::from_secs(300));

    let result = resolver.resolve(&shared_keypair().kid).await;
    assert!(matches!(result, Err(AuthError::KeyFetch(_))));

    Ok(())
}

/// A malformed key set document is a parse failure, not a fetch failure.
#[tokio::test]
async fn test_resolve_maps_malformed_body_to_key_parse() -> Result<()> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(KEYS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("not a key set"))
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server, Duration::from_secs(300));

    let result = resolver.resolve(&shared_keypair().kid).await;
    assert!(matches!(result, Err(AuthError::KeyParse(_))));

    Ok(())
}

/// A caller that hits its own deadline mid-fetch abandons the await, but
/// the in-flight fetch still populates the cache: a later resolve succeeds
/// without a second network request.
#[tokio::test]
async fn test_cancelled_caller_does_not_abort_cache_population() -> Result<()> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(KEYS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(shared_keypair().key_set_json())
                // Slow enough that the first caller's deadline fires mid-fetch
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server, Duration::from_secs(300));

    let first = tokio::time::timeout(
        Duration::from_millis(50),
        resolver.resolve(&shared_keypair().kid),
    )
    .await;
    assert!(first.is_err(), "first caller should hit its deadline");

    // Give the abandoned fetch time to finish and swap the cache in
    tokio::time::sleep(Duration::from_millis(300)).await;

    let resolved = resolver.resolve(&shared_keypair().kid).await?;
    assert_eq!(resolved.kid, shared_keypair().kid);
    // expect(1) is verified when mock_server drops: the second resolve was
    // served from the cache the cancelled caller's fetch populated

    Ok(())
}

/// Refetch replaces the cached set wholesale: keys absent from the new
/// document are no longer served once the TTL forces a refresh.
#[tokio::test]
async fn test_refetch_replaces_key_set_wholesale() -> Result<()> {
    let mock_server = MockServer::start().await;
    mount_key_set(&mock_server, shared_keypair().key_set_json()).await;

    // Short TTL so the second resolve goes back to the network
    let resolver = resolver_for(&mock_server, Duration::from_millis(50));

    resolver.resolve(&shared_keypair().kid).await?;

    // New key set drops the original key entirely
    mock_server.reset().await;
    mount_key_set(&mock_server, other_keypair().key_set_json()).await;

    tokio::time::sleep(Duration::from_millis(100)).await;

    let result = resolver.resolve(&shared_keypair().kid).await;
    assert!(
        matches!(result, Err(AuthError::KeyNotFound { .. })),
        "old key should be gone after replacement, got {:?}",
        result
    );

    let resolved = resolver.resolve(&other_keypair().kid).await?;
    assert_eq!(resolved.kid, other_keypair().kid);

    Ok(())
}

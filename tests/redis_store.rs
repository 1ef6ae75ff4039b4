//! Integration tests for the Redis store.
//!
//! These tests require a Redis instance running at `redis://127.0.0.1/`.
//! Tests are ignored by default - run with `cargo test --test redis_store -- --ignored`

#![cfg(feature = "redis-store")]

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use cornstand::config::LimitsConfig;
use cornstand::purchase::{PurchaseOutcome, PurchaseService};
use cornstand::store::{KeyTtl, KeyValueStore, RedisStore};

const REDIS_URL: &str = "redis://127.0.0.1/";

/// Namespace unique to this run so tests do not see each other's keys.
fn namespace(test_name: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("test:{}:{}", test_name, nanos)
}

async fn connect() -> Option<RedisStore> {
    match RedisStore::connect(REDIS_URL).await {
        Ok(store) => Some(store),
        Err(e) => {
            eprintln!("Skipping test: Redis not available at {}: {}", REDIS_URL, e);
            None
        }
    }
}

#[tokio::test]
#[ignore] // Requires Redis
async fn test_redis_ping() {
    let Some(store) = connect().await else { return };
    assert_eq!(store.ping().await.unwrap(), "PONG");
}

#[tokio::test]
#[ignore] // Requires Redis
async fn test_redis_primitives() {
    let Some(store) = connect().await else { return };
    let ns = namespace("primitives");
    let claim = format!("{}:claim", ns);
    let counter = format!("{}:counter", ns);

    assert!(store.set_if_absent(&claim, "1", 30).await.unwrap());
    assert!(!store.set_if_absent(&claim, "1", 30).await.unwrap());
    assert!(matches!(
        store.time_to_live(&claim).await.unwrap(),
        KeyTtl::Expires(secs) if secs > 0 && secs <= 30
    ));

    assert_eq!(store.time_to_live(&counter).await.unwrap(), KeyTtl::Missing);
    assert_eq!(store.increment(&counter).await.unwrap(), 1);
    assert_eq!(store.time_to_live(&counter).await.unwrap(), KeyTtl::Persistent);
    assert!(store.set_expiry(&counter, 30).await.unwrap());
    assert_eq!(store.get(&counter).await.unwrap().as_deref(), Some("1"));
}

#[tokio::test]
#[ignore] // Requires Redis
async fn test_redis_purchase_flow() {
    let Some(store) = connect().await else { return };
    let service = PurchaseService::new(
        Arc::new(store),
        &namespace("flow"),
        LimitsConfig::with_window(30),
    );

    assert_eq!(
        service.purchase("c1").await.unwrap(),
        PurchaseOutcome::Purchased {
            total_purchases: 1,
            retry_after_secs: 30,
        }
    );
    assert!(matches!(
        service.purchase("c1").await.unwrap(),
        PurchaseOutcome::RateLimited { retry_after_secs }
            if retry_after_secs > 0 && retry_after_secs <= 30
    ));

    let status = service.status("c1").await.unwrap();
    assert!(!status.can_purchase);
    assert_eq!(status.total_purchases, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // Requires Redis
async fn test_redis_concurrent_claims_single_winner() {
    let Some(store) = connect().await else { return };
    let service = Arc::new(PurchaseService::new(
        Arc::new(store),
        &namespace("contended"),
        LimitsConfig::with_window(30),
    ));

    let attempts = (0..32).map(|_| {
        let service = service.clone();
        tokio::spawn(async move { service.purchase("same-client").await.unwrap() })
    });
    let outcomes = futures::future::join_all(attempts).await;

    let purchased = outcomes
        .iter()
        .filter(|o| matches!(o, Ok(PurchaseOutcome::Purchased { .. })))
        .count();
    assert_eq!(purchased, 1);
    assert_eq!(service.status("same-client").await.unwrap().total_purchases, 1);
}

//! Integration tests for the Redis-backed store and bus.
//!
//! These tests require a live Redis (or Redis-compatible) instance. Run
//! with:
//!
//! ```bash
//! docker compose up -d
//! cargo test -p tapefeed-store -- --ignored
//! docker compose down
//! ```
//!
//! All tests are marked `#[ignore]` so they are skipped during normal
//! `cargo test` runs.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::float_cmp,
    clippy::panic
)]

use std::sync::Arc;
use std::time::Duration;

use tapefeed_store::{
    ConnectOptions, EventBus, KeyedEventStore, RedisBackend, RedisBus, StoreBackend, StoreError,
};
use tapefeed_types::{EventAction, FieldMap, FieldValue, StoreEvent};

/// Redis connection URL for the local Docker instance.
const REDIS_URL: &str = "redis://localhost:6379";

fn fast_opts() -> ConnectOptions {
    ConnectOptions {
        max_attempts: 3,
        base_delay: Duration::from_millis(50),
    }
}

async fn setup() -> (KeyedEventStore, RedisBus) {
    let backend = RedisBackend::connect(REDIS_URL, &fast_opts())
        .await
        .expect("Failed to connect to Redis -- is Docker running?");
    let bus = RedisBus::new(backend.client().clone(), REDIS_URL, fast_opts());
    let store = KeyedEventStore::new(
        Arc::new(backend),
        Arc::new(bus.clone()),
        // Unique prefix per run so tests do not trip over stale keys.
        format!("tapefeed-test-{}", std::process::id()),
    );
    (store, bus)
}

fn fields(pairs: &[(&str, &str)]) -> FieldMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), FieldValue::from(*v)))
        .collect()
}

#[tokio::test]
#[ignore = "requires live Redis instance (docker compose up -d)"]
async fn redis_connect_and_ping() {
    let backend = RedisBackend::connect(REDIS_URL, &fast_opts())
        .await
        .expect("Failed to connect to Redis");
    backend.ping().await.expect("Failed to ping");
}

#[tokio::test]
#[ignore = "requires live Redis instance (docker compose up -d)"]
async fn connection_exhaustion_is_fatal() {
    // Nothing listens on this port; every attempt must fail fast.
    let result = RedisBackend::connect(
        "redis://localhost:1",
        &ConnectOptions {
            max_attempts: 2,
            base_delay: Duration::from_millis(10),
        },
    )
    .await;

    match result {
        Err(StoreError::ConnectionExhausted { attempts, .. }) => assert_eq!(attempts, 2),
        other => panic!("expected ConnectionExhausted, got {other:?}"),
    }
}

#[tokio::test]
#[ignore = "requires live Redis instance (docker compose up -d)"]
async fn record_round_trip_comes_back_textual() {
    let (store, _bus) = setup().await;

    store
        .set("orders", "O1", fields(&[("side", "buy"), ("qty", "3")]))
        .await
        .expect("Failed to set");

    let read = store.get("orders", "O1").await.expect("Failed to get");
    assert_eq!(read, Some(fields(&[("side", "buy"), ("qty", "3")])));

    store.delete("orders", "O1").await.expect("Failed to delete");
}

#[tokio::test]
#[ignore = "requires live Redis instance (docker compose up -d)"]
async fn empty_record_write_reads_back_absent() {
    let (store, _bus) = setup().await;

    store
        .set("orders", "E1", fields(&[("side", "buy")]))
        .await
        .expect("Failed to set");
    // Redis has no empty-hash state; this must not trip a protocol error.
    store
        .set("orders", "E1", FieldMap::new())
        .await
        .expect("Failed to write empty record");

    assert_eq!(store.get("orders", "E1").await.expect("Failed to get"), None);
}

#[tokio::test]
#[ignore = "requires live Redis instance (docker compose up -d)"]
async fn hincrbyfloat_is_atomic_across_tasks() {
    let (store, _bus) = setup().await;

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..16 {
        let store = store.clone();
        tasks.spawn(async move {
            store
                .increment_field("orders", "INC", "fills", 1.0)
                .await
                .expect("Failed to increment");
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.expect("increment task panicked");
    }

    let record = store
        .get("orders", "INC")
        .await
        .expect("Failed to get")
        .expect("record missing");
    assert_eq!(record.get("fills").unwrap().as_f64(), Some(16.0));

    store.delete("orders", "INC").await.expect("Failed to delete");
}

#[tokio::test]
#[ignore = "requires live Redis instance (docker compose up -d)"]
async fn mutation_events_arrive_on_the_category_channel() {
    let (store, bus) = setup().await;

    let mut sub = bus
        .subscribe(&["positions"])
        .await
        .expect("Failed to subscribe");

    store
        .set("positions", "P1", fields(&[("unrealized_pnl", "10.00")]))
        .await
        .expect("Failed to set");

    // Pub/sub delivery is asynchronous; poll briefly.
    let mut received = None;
    for _ in 0..50 {
        if let Some(message) = sub.poll() {
            received = Some(message);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let message = received.expect("no event received");
    assert_eq!(message.topic, "positions");
    let event: StoreEvent = serde_json::from_slice(&message.payload).expect("bad payload");
    assert_eq!(event.action, EventAction::Create);
    assert_eq!(
        event.data.get("identifier"),
        Some(&FieldValue::Text("P1".into()))
    );

    sub.unsubscribe().await.expect("Failed to unsubscribe");
    store.delete("positions", "P1").await.expect("Failed to delete");
}

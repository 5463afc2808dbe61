//! Tests for get/set event broadcast
//!
//! These tests verify:
//! - Set and get emit events carrying the affected entry
//! - Misses emit nothing
//! - Delivery is best-effort and never blocks the caller
//! - Disconnected subscribers are pruned

use serde_json::json;
use shelfdb::events::{Event, EventBus, EventKind};
use shelfdb::{Config, Store};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_memory_store() -> Store {
    let config = Config::builder().memory(true).build();
    Store::open(config).unwrap()
}

// =============================================================================
// Store Event Tests
// =============================================================================

#[test]
fn test_set_emits_event() {
    let store = setup_memory_store();
    let rx = store.subscribe();

    store.set("key", json!({"x": 1})).unwrap();

    let event = rx.try_recv().unwrap();
    assert_eq!(event.kind, EventKind::Set);
    assert_eq!(event.key, "key");
    assert_eq!(event.value, json!({"x": 1}));
}

#[test]
fn test_get_emits_event_on_hit() {
    let store = setup_memory_store();
    store.set("key", json!("value")).unwrap();

    let rx = store.subscribe();
    store.get("key").unwrap();

    let event = rx.try_recv().unwrap();
    assert_eq!(event.kind, EventKind::Get);
    assert_eq!(event.key, "key");
    assert_eq!(event.value, json!("value"));
}

#[test]
fn test_get_miss_emits_nothing() {
    let store = setup_memory_store();
    let rx = store.subscribe();

    store.get("nonexistent").unwrap();

    assert!(rx.try_recv().is_err());
}

#[test]
fn test_multiple_subscribers_each_receive() {
    let store = setup_memory_store();
    let rx1 = store.subscribe();
    let rx2 = store.subscribe();

    store.set("key", json!(1)).unwrap();

    assert_eq!(rx1.try_recv().unwrap().key, "key");
    assert_eq!(rx2.try_recv().unwrap().key, "key");
}

#[test]
fn test_full_subscriber_never_blocks_caller() {
    let store = setup_memory_store();
    let rx = store.subscribe();

    // Well past the per-subscriber channel capacity; the store must keep
    // accepting writes while the receiver drains nothing
    for i in 0..200 {
        store.set(&format!("key{}", i), json!(i)).unwrap();
    }

    assert_eq!(store.count().unwrap(), 200);

    // The subscriber sees a capped prefix of the stream, not an error
    let mut received = 0;
    while rx.try_recv().is_ok() {
        received += 1;
    }
    assert!(received > 0);
    assert!(received < 200);
}

// =============================================================================
// EventBus Tests
// =============================================================================

#[test]
fn test_dropped_subscriber_is_pruned() {
    let bus = EventBus::new();
    let rx = bus.subscribe();
    assert_eq!(bus.subscriber_count(), 1);

    drop(rx);
    bus.publish(Event {
        kind: EventKind::Set,
        key: "key".to_string(),
        value: json!(1),
    });

    assert_eq!(bus.subscriber_count(), 0);
}

#[test]
fn test_publish_without_subscribers_is_noop() {
    let bus = EventBus::new();

    bus.publish(Event {
        kind: EventKind::Get,
        key: "key".to_string(),
        value: json!(null),
    });

    assert_eq!(bus.subscriber_count(), 0);
}

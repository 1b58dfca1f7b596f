//! Trait contract tests for the registry and result stores.
//!
//! These tests verify the behavioral contracts of the storage traits
//! using in-memory fakes. Any conforming implementation must pass these.

use std::sync::Arc;
use std::time::Duration;

use callgraph_state::fakes::{
    MemoryCallDependenciesStore, MemoryCallDependentsStore, MemoryCallLeafsStore,
    MemoryCallLinkStore, MemoryCallRequirementStore, MemoryCallResultStore,
};
use callgraph_state::storage_traits::*;
use callgraph_state::{CallRegistry, StorageError};
use chrono::{TimeZone, Utc};

fn ids(names: &[&str]) -> CallIdSet {
    names.iter().map(|n| CallId::from(*n)).collect()
}

// ===========================================================================
// CallRequirementStore contract tests
// ===========================================================================

#[tokio::test]
async fn requirement_put_then_get() {
    let store = MemoryCallRequirementStore::new();
    let when = Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap();
    let req = CallRequirement::new(CallId::from("c1"), "Market('NBP') * 2", Some(when));
    store.put(req.clone()).await.unwrap();

    assert_eq!(store.get(&CallId::from("c1")).await.unwrap(), req);
}

#[tokio::test]
async fn requirement_get_not_found() {
    let store = MemoryCallRequirementStore::new();
    let err = store.get(&CallId::from("missing")).await.unwrap_err();

    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[tokio::test]
async fn requirement_put_is_an_upsert() {
    let store = MemoryCallRequirementStore::new();
    store
        .put(CallRequirement::new(CallId::from("c1"), "1", None))
        .await
        .unwrap();
    store
        .put(CallRequirement::new(CallId::from("c1"), "2", None))
        .await
        .unwrap();

    assert_eq!(store.get(&CallId::from("c1")).await.unwrap().dsl_source, "2");
    assert_eq!(store.call_ids().unwrap(), vec![CallId::from("c1")]);
}

// ===========================================================================
// Edge store contract tests
// ===========================================================================

#[tokio::test]
async fn dependencies_empty_set_is_distinct_from_missing() {
    let store = MemoryCallDependenciesStore::new();
    store.put(&CallId::from("leaf"), CallIdSet::new()).await.unwrap();

    assert!(store.get(&CallId::from("leaf")).await.unwrap().is_empty());
    assert!(store
        .get(&CallId::from("unknown"))
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn dependencies_round_trip_set() {
    let store = MemoryCallDependenciesStore::new();
    store.put(&CallId::from("c"), ids(&["a", "b"])).await.unwrap();

    assert_eq!(store.get(&CallId::from("c")).await.unwrap(), ids(&["a", "b"]));
}

#[tokio::test]
async fn dependents_missing_entry_is_not_found() {
    let store = MemoryCallDependentsStore::new();
    store.put(&CallId::from("a"), ids(&["c"])).await.unwrap();

    assert_eq!(store.get(&CallId::from("a")).await.unwrap(), ids(&["c"]));
    assert!(store.get(&CallId::from("c")).await.unwrap_err().is_not_found());
}

// ===========================================================================
// CallLeafsStore / CallLinkStore contract tests
// ===========================================================================

#[tokio::test]
async fn leafs_preserve_discovery_order() {
    let store = MemoryCallLeafsStore::new();
    let leafs = vec![CallId::from("z"), CallId::from("a")];
    store.put(&CallId::from("contract"), leafs.clone()).await.unwrap();

    assert_eq!(store.get(&CallId::from("contract")).await.unwrap(), leafs);
}

#[tokio::test]
async fn links_follow_appended_order() {
    let store = MemoryCallLinkStore::new();
    store.append(&CallId::from("root"), &CallId::from("a")).await.unwrap();
    store.append(&CallId::from("a"), &CallId::from("b")).await.unwrap();

    assert_eq!(
        store.next(&CallId::from("root")).await.unwrap(),
        Some(CallId::from("a"))
    );
    assert_eq!(
        store.next(&CallId::from("a")).await.unwrap(),
        Some(CallId::from("b"))
    );
    assert_eq!(store.next(&CallId::from("b")).await.unwrap(), None);
}

// ===========================================================================
// CallResultStore contract tests
// ===========================================================================

fn key(call: &str, scenario: &str) -> CallResultKey {
    CallResultKey::new(
        &ValuationId::from("val-1"),
        &CallId::from(call),
        &ScenarioLabel::from(scenario),
    )
}

#[tokio::test]
async fn results_are_keyed_by_scenario() {
    let store = MemoryCallResultStore::new();
    store.put(key("c1", ""), 10.0).await.unwrap();
    store.put(key("c1", "spot-up"), 11.5).await.unwrap();

    assert_eq!(store.get(&key("c1", "")).await.unwrap(), 10.0);
    assert_eq!(store.get(&key("c1", "spot-up")).await.unwrap(), 11.5);
    assert!(store.get(&key("c1", "spot-down")).await.is_err());
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn results_are_write_once() {
    let store = MemoryCallResultStore::new();
    store.put(key("c1", ""), 1.0).await.unwrap();
    let err = store.put(key("c1", ""), 2.0).await.unwrap_err();

    assert!(matches!(err, StorageError::AlreadyExists { .. }));
    assert_eq!(store.get(&key("c1", "")).await.unwrap(), 1.0);
}

#[tokio::test(start_paused = true)]
async fn results_tolerate_concurrent_reads() {
    let store = Arc::new(MemoryCallResultStore::new().with_read_latency(Duration::from_millis(50)));
    store.put(key("c1", ""), 3.0).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.get(&key("c1", "")).await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 3.0);
    }
}

// ===========================================================================
// CallRegistry
// ===========================================================================

#[tokio::test]
async fn in_memory_registry_wires_independent_stores() {
    let registry = CallRegistry::in_memory();
    let id = CallId::from("x");
    registry.dependencies.put(&id, CallIdSet::new()).await.unwrap();

    assert!(registry.dependencies.get(&id).await.is_ok());
    assert!(registry.dependents.get(&id).await.is_err());
    assert!(registry.requirements.get(&id).await.is_err());
}

//! Scheduler ordering properties, for both the in-memory iterator and the
//! registry-backed stream.

use std::collections::HashMap;

use callgraph_core::{schedule, schedule_from_registry, CallGraph, GraphError, GraphResult};
use callgraph_state::fakes::{MemoryCallDependenciesStore, MemoryCallDependentsStore};
use callgraph_state::storage_traits::*;
use futures::TryStreamExt;

fn id(name: &str) -> CallId {
    CallId::from(name)
}

fn ids(names: &[&str]) -> CallIdSet {
    names.iter().map(|n| CallId::from(*n)).collect()
}

fn graph_of(calls: &[(&str, &[&str])]) -> CallGraph {
    let mut graph = CallGraph::new();
    for (call, deps) in calls {
        graph.add_call(id(call), ids(deps));
    }
    graph
}

fn collect(order: impl Iterator<Item = GraphResult<CallId>>) -> Vec<CallId> {
    order.collect::<GraphResult<Vec<_>>>().unwrap()
}

/// Every call appears after each of its dependencies.
fn assert_topological(order: &[CallId], graph: &CallGraph) {
    let position: HashMap<&CallId, usize> =
        order.iter().enumerate().map(|(i, c)| (c, i)).collect();
    for call in order {
        for dep in callgraph_core::EdgeIndex::dependencies(graph, call).unwrap() {
            assert!(
                position[dep] < position[call],
                "{dep} must be emitted before {call}"
            );
        }
    }
}

#[test]
fn test_two_leaves_join_then_chain() {
    let graph = graph_of(&[("A", &[]), ("B", &[]), ("C", &["A", "B"]), ("D", &["C"])]);

    let order = collect(schedule(vec![id("A"), id("B")], &graph));

    assert_eq!(order.len(), 4);
    assert_topological(&order, &graph);
    let c = order.iter().position(|x| x == &id("C")).unwrap();
    assert_eq!(c, 2);
    assert_eq!(order[3], id("D"));
}

#[test]
fn test_each_reachable_call_emitted_once() {
    // Wide fan-in and fan-out with shared sub-results.
    let graph = graph_of(&[
        ("l1", &[]),
        ("l2", &[]),
        ("l3", &[]),
        ("m1", &["l1", "l2"]),
        ("m2", &["l2", "l3"]),
        ("m3", &["l1", "l3"]),
        ("n1", &["m1", "m2"]),
        ("n2", &["m2", "m3", "l1"]),
        ("top", &["n1", "n2", "m1"]),
    ]);

    let order = collect(graph.execution_order());

    assert_eq!(order.len(), graph.len());
    let unique: CallIdSet = order.iter().cloned().collect();
    assert_eq!(unique.len(), order.len());
    assert_topological(&order, &graph);
}

#[test]
fn test_repeated_leaves_do_not_repeat_calls() {
    let graph = graph_of(&[("A", &[]), ("B", &["A"])]);

    let order = collect(schedule(vec![id("A"), id("A")], &graph));

    assert_eq!(order, vec![id("A"), id("B")]);
}

#[test]
fn test_calls_unreachable_from_leaves_are_not_emitted() {
    // x and y wait on each other; z waits on the cycle.
    let graph = graph_of(&[
        ("a", &[]),
        ("b", &["a"]),
        ("x", &["y"]),
        ("y", &["x"]),
        ("z", &["x", "b"]),
    ]);

    let order = collect(graph.execution_order());

    assert_eq!(order, vec![id("a"), id("b")]);
}

#[test]
fn test_schedule_is_lazy() {
    let graph = graph_of(&[("A", &[]), ("B", &["A"]), ("C", &["B"])]);
    let mut order = graph.execution_order();

    assert_eq!(order.next().unwrap().unwrap(), id("A"));
    assert_eq!(order.next().unwrap().unwrap(), id("B"));
    assert_eq!(order.next().unwrap().unwrap(), id("C"));
    assert!(order.next().is_none());
}

// ---------------------------------------------------------------------------
// Registry-backed scheduling
// ---------------------------------------------------------------------------

async fn stores_for(
    graph: &CallGraph,
) -> (MemoryCallDependentsStore, MemoryCallDependenciesStore) {
    let dependents = MemoryCallDependentsStore::new();
    let dependencies = MemoryCallDependenciesStore::new();
    for call in graph.call_ids() {
        let deps = callgraph_core::EdgeIndex::dependencies(graph, call).unwrap();
        dependencies.put(call, deps.clone()).await.unwrap();
    }
    for (call, users) in graph.dependents_entries() {
        dependents.put(call, users.clone()).await.unwrap();
    }
    (dependents, dependencies)
}

#[tokio::test]
async fn test_registry_stream_matches_in_memory_order() {
    let graph = graph_of(&[
        ("A", &[]),
        ("B", &[]),
        ("C", &["A", "B"]),
        ("D", &["C"]),
        ("E", &["A"]),
    ]);
    let (dependents, dependencies) = stores_for(&graph).await;

    let streamed: Vec<CallId> =
        schedule_from_registry(graph.leaf_ids().to_vec(), &dependents, &dependencies)
            .try_collect()
            .await
            .unwrap();

    assert_eq!(streamed, collect(graph.execution_order()));
}

#[tokio::test]
async fn test_missing_dependents_entry_means_none() {
    let dependents = MemoryCallDependentsStore::new();
    let dependencies = MemoryCallDependenciesStore::new();
    dependencies.put(&id("solo"), ids(&[])).await.unwrap();

    let streamed: Vec<CallId> =
        schedule_from_registry(vec![id("solo")], &dependents, &dependencies)
            .try_collect()
            .await
            .unwrap();

    assert_eq!(streamed, vec![id("solo")]);
}

#[tokio::test]
async fn test_dependent_without_dependency_entry_is_integrity_error() {
    let dependents = MemoryCallDependentsStore::new();
    let dependencies = MemoryCallDependenciesStore::new();
    dependencies.put(&id("a"), ids(&[])).await.unwrap();
    dependents.put(&id("a"), ids(&["ghost"])).await.unwrap();

    let result: GraphResult<Vec<CallId>> =
        schedule_from_registry(vec![id("a")], &dependents, &dependencies)
            .try_collect()
            .await;

    match result {
        Err(GraphError::Integrity { call_id, .. }) => assert_eq!(call_id, id("ghost")),
        other => panic!("expected integrity error, got {other:?}"),
    }
}

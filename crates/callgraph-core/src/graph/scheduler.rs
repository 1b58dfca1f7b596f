//! Topological scheduling of calls.
//!
//! Kahn's algorithm runs over the *dependents* relation: a call is ready
//! once every one of its dependencies has been emitted, and readiness
//! propagates from each emitted call to its dependents.
//!
//! Two forms share [`KahnFrontier`]:
//! - [`schedule`] walks an in-memory [`EdgeIndex`] and yields an iterator.
//! - [`schedule_from_registry`] reads edges from the async registry stores
//!   and yields a stream.
//!
//! Both are lazy and one-shot. Calls on a dependency cycle, or not
//! reachable from the leaves, are never emitted.

use std::collections::HashMap;

use callgraph_state::{CallDependenciesStore, CallDependentsStore, CallId, CallIdSet};
use futures::Stream;

use super::frontier::KahnFrontier;
use crate::domain::{GraphError, GraphResult};

/// Read access to both directions of the dependency relation.
pub trait EdgeIndex {
    /// Calls that depend on `id`. `None` means there are none.
    fn dependents(&self, id: &CallId) -> Option<&CallIdSet>;

    /// Calls `id` depends on. `None` means `id` was never registered.
    fn dependencies(&self, id: &CallId) -> Option<&CallIdSet>;
}

/// In-memory dependency graph with reverse edges kept in step.
///
/// Edges are stored as `call -> dependencies` and `dependency -> dependents`
/// adjacency sets.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    /// Registration order of calls.
    calls: Vec<CallId>,
    dependencies: HashMap<CallId, CallIdSet>,
    dependents: HashMap<CallId, CallIdSet>,
    leaf_ids: Vec<CallId>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `call_id` with its dependency set.
    ///
    /// Re-registering a call replaces its dependencies and the reverse
    /// edges derived from them.
    pub fn add_call(&mut self, call_id: CallId, dependencies: CallIdSet) {
        match self.dependencies.get(&call_id) {
            Some(previous) => {
                for dep in previous {
                    if let Some(set) = self.dependents.get_mut(dep) {
                        set.remove(&call_id);
                    }
                }
                self.leaf_ids.retain(|id| id != &call_id);
            }
            None => self.calls.push(call_id.clone()),
        }

        if dependencies.is_empty() {
            self.leaf_ids.push(call_id.clone());
        }
        for dep in &dependencies {
            self.dependents
                .entry(dep.clone())
                .or_default()
                .insert(call_id.clone());
        }
        self.dependencies.insert(call_id, dependencies);
    }

    /// Calls in registration order.
    pub fn call_ids(&self) -> &[CallId] {
        &self.calls
    }

    /// Calls with no dependencies, in registration order.
    pub fn leaf_ids(&self) -> &[CallId] {
        &self.leaf_ids
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn contains(&self, id: &CallId) -> bool {
        self.dependencies.contains_key(id)
    }

    /// Non-empty dependents sets, keyed by the call depended on.
    pub fn dependents_entries(&self) -> impl Iterator<Item = (&CallId, &CallIdSet)> {
        self.dependents.iter().filter(|(_, set)| !set.is_empty())
    }

    /// Calls [`schedule`] would emit from this graph's own leaves.
    pub fn execution_order(&self) -> ExecutionOrder<'_, Self> {
        schedule(self.leaf_ids.iter().cloned(), self)
    }
}

impl EdgeIndex for CallGraph {
    fn dependents(&self, id: &CallId) -> Option<&CallIdSet> {
        self.dependents.get(id)
    }

    fn dependencies(&self, id: &CallId) -> Option<&CallIdSet> {
        self.dependencies.get(id)
    }
}

/// Lazy topological order over an [`EdgeIndex`].
///
/// Yields an `Integrity` error, then stops, if a dependent has no
/// dependency entry.
#[derive(Debug)]
pub struct ExecutionOrder<'g, G: ?Sized> {
    graph: &'g G,
    frontier: KahnFrontier,
    failed: bool,
}

impl<'g, G: EdgeIndex + ?Sized> Iterator for ExecutionOrder<'g, G> {
    type Item = GraphResult<CallId>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let graph = self.graph;
        let emitted = self.frontier.pop()?;

        if let Some(dependents) = graph.dependents(&emitted) {
            for dependent in dependents {
                let Some(deps) = graph.dependencies(dependent) else {
                    self.failed = true;
                    return Some(Err(GraphError::integrity(
                        dependent,
                        "dependent has no dependency entry",
                    )));
                };
                self.frontier.satisfy(&emitted, dependent, deps);
            }
        }

        Some(Ok(emitted))
    }
}

/// Schedule the calls reachable from `leaf_ids` through `graph`'s
/// dependents relation.
pub fn schedule<G: EdgeIndex + ?Sized>(
    leaf_ids: impl IntoIterator<Item = CallId>,
    graph: &G,
) -> ExecutionOrder<'_, G> {
    ExecutionOrder {
        graph,
        frontier: KahnFrontier::new(leaf_ids),
        failed: false,
    }
}

/// Schedule against the registry stores.
///
/// A call with no dependents entry has no dependents. A dependent with no
/// dependency entry is an `Integrity` error. The stream ends after its
/// first error.
pub fn schedule_from_registry<'a>(
    leaf_ids: Vec<CallId>,
    dependents: &'a dyn CallDependentsStore,
    dependencies: &'a dyn CallDependenciesStore,
) -> impl Stream<Item = GraphResult<CallId>> + Send + 'a {
    futures::stream::try_unfold(
        KahnFrontier::new(leaf_ids),
        move |mut frontier| async move {
            let Some(emitted) = frontier.pop() else {
                return Ok(None);
            };

            let next = match dependents.get(&emitted).await {
                Ok(set) => set,
                Err(e) if e.is_not_found() => CallIdSet::new(),
                Err(e) => return Err(GraphError::Storage(e)),
            };
            for dependent in &next {
                let deps = dependencies
                    .get(dependent)
                    .await
                    .map_err(|e| GraphError::from_dependency_lookup(dependent, e))?;
                frontier.satisfy(&emitted, dependent, &deps);
            }

            Ok(Some((emitted, frontier)))
        },
    )
}

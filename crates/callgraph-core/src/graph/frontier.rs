//! Ready-set bookkeeping for Kahn's algorithm over the dependents graph.

use std::collections::{HashMap, HashSet, VecDeque};

use callgraph_state::{CallId, CallIdSet};

/// Frontier of calls whose dependencies have all been emitted.
///
/// Calls leave the frontier in the order they entered it. Each call enters
/// at most once, so an inconsistent dependents relation cannot make the
/// scheduler emit a call twice.
#[derive(Debug, Default)]
pub struct KahnFrontier {
    ready: VecDeque<CallId>,
    queued: HashSet<CallId>,
    /// Per waiting call, the dependencies already emitted.
    satisfied: HashMap<CallId, HashSet<CallId>>,
}

impl KahnFrontier {
    /// Seed the frontier with leaf calls, keeping their order and dropping
    /// repeats.
    pub fn new(leaf_ids: impl IntoIterator<Item = CallId>) -> Self {
        let mut frontier = Self::default();
        for id in leaf_ids {
            frontier.enqueue(id);
        }
        frontier
    }

    pub fn pop(&mut self) -> Option<CallId> {
        self.ready.pop_front()
    }

    /// Record that `emitted` has been emitted, satisfying its edge to
    /// `dependent`. Returns `true` when this made `dependent` ready.
    pub fn satisfy(
        &mut self,
        emitted: &CallId,
        dependent: &CallId,
        dependent_dependencies: &CallIdSet,
    ) -> bool {
        if self.queued.contains(dependent) {
            return false;
        }

        let done = self.satisfied.entry(dependent.clone()).or_default();
        done.insert(emitted.clone());
        if !dependent_dependencies.iter().all(|d| done.contains(d)) {
            return false;
        }

        self.satisfied.remove(dependent);
        self.enqueue(dependent.clone())
    }

    /// Calls still waiting on at least one dependency.
    pub fn waiting(&self) -> impl Iterator<Item = &CallId> {
        self.satisfied.keys()
    }

    fn enqueue(&mut self, id: CallId) -> bool {
        if !self.queued.insert(id.clone()) {
            return false;
        }
        self.ready.push_back(id);
        true
    }
}

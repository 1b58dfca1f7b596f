//! In-memory fakes for storage traits
//!
//! Provides one `Memory*` store per trait in `storage_traits`, each backed by
//! a `Mutex<HashMap<..>>`. They satisfy the trait contracts without any
//! external dependencies and back the CLI as well as the test suites.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::StorageError;
use crate::storage_traits::*;

fn lock<'a, T>(store: &'static str, m: &'a Mutex<T>) -> StorageResult<MutexGuard<'a, T>> {
    m.lock()
        .map_err(|_| StorageError::Backend(format!("{store}: lock poisoned")))
}

// ---------------------------------------------------------------------------
// MemoryCallRequirementStore
// ---------------------------------------------------------------------------

/// In-memory requirement store backed by a `HashMap<CallId, CallRequirement>`.
#[derive(Debug, Default)]
pub struct MemoryCallRequirementStore {
    requirements: Mutex<HashMap<CallId, CallRequirement>>,
}

impl MemoryCallRequirementStore {
    const NAME: &'static str = "call_requirements";

    pub fn new() -> Self {
        Self::default()
    }

    /// All registered call ids, sorted.
    pub fn call_ids(&self) -> StorageResult<Vec<CallId>> {
        let requirements = lock(Self::NAME, &self.requirements)?;
        let mut ids: Vec<CallId> = requirements.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl CallRequirementStore for MemoryCallRequirementStore {
    async fn put(&self, requirement: CallRequirement) -> StorageResult<()> {
        let mut requirements = lock(Self::NAME, &self.requirements)?;
        requirements.insert(requirement.call_id.clone(), requirement);
        Ok(())
    }

    async fn get(&self, call_id: &CallId) -> StorageResult<CallRequirement> {
        let requirements = lock(Self::NAME, &self.requirements)?;
        requirements
            .get(call_id)
            .cloned()
            .ok_or_else(|| StorageError::not_found(Self::NAME, call_id))
    }
}

// ---------------------------------------------------------------------------
// Edge stores
// ---------------------------------------------------------------------------

/// In-memory forward edge store.
#[derive(Debug, Default)]
pub struct MemoryCallDependenciesStore {
    edges: Mutex<HashMap<CallId, CallIdSet>>,
}

impl MemoryCallDependenciesStore {
    const NAME: &'static str = "call_dependencies";

    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every registered entry.
    pub fn entries(&self) -> StorageResult<HashMap<CallId, CallIdSet>> {
        Ok(lock(Self::NAME, &self.edges)?.clone())
    }
}

#[async_trait]
impl CallDependenciesStore for MemoryCallDependenciesStore {
    async fn put(&self, call_id: &CallId, dependencies: CallIdSet) -> StorageResult<()> {
        let mut edges = lock(Self::NAME, &self.edges)?;
        edges.insert(call_id.clone(), dependencies);
        Ok(())
    }

    async fn get(&self, call_id: &CallId) -> StorageResult<CallIdSet> {
        let edges = lock(Self::NAME, &self.edges)?;
        edges
            .get(call_id)
            .cloned()
            .ok_or_else(|| StorageError::not_found(Self::NAME, call_id))
    }
}

/// In-memory reverse edge store.
#[derive(Debug, Default)]
pub struct MemoryCallDependentsStore {
    edges: Mutex<HashMap<CallId, CallIdSet>>,
}

impl MemoryCallDependentsStore {
    const NAME: &'static str = "call_dependents";

    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every registered entry.
    pub fn entries(&self) -> StorageResult<HashMap<CallId, CallIdSet>> {
        Ok(lock(Self::NAME, &self.edges)?.clone())
    }
}

#[async_trait]
impl CallDependentsStore for MemoryCallDependentsStore {
    async fn put(&self, call_id: &CallId, dependents: CallIdSet) -> StorageResult<()> {
        let mut edges = lock(Self::NAME, &self.edges)?;
        edges.insert(call_id.clone(), dependents);
        Ok(())
    }

    async fn get(&self, call_id: &CallId) -> StorageResult<CallIdSet> {
        let edges = lock(Self::NAME, &self.edges)?;
        edges
            .get(call_id)
            .cloned()
            .ok_or_else(|| StorageError::not_found(Self::NAME, call_id))
    }
}

// ---------------------------------------------------------------------------
// MemoryCallLeafsStore
// ---------------------------------------------------------------------------

/// In-memory leaf store keyed by contract id.
#[derive(Debug, Default)]
pub struct MemoryCallLeafsStore {
    leafs: Mutex<HashMap<CallId, Vec<CallId>>>,
}

impl MemoryCallLeafsStore {
    const NAME: &'static str = "call_leafs";

    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CallLeafsStore for MemoryCallLeafsStore {
    async fn put(&self, contract_id: &CallId, leaf_ids: Vec<CallId>) -> StorageResult<()> {
        let mut leafs = lock(Self::NAME, &self.leafs)?;
        leafs.insert(contract_id.clone(), leaf_ids);
        Ok(())
    }

    async fn get(&self, contract_id: &CallId) -> StorageResult<Vec<CallId>> {
        let leafs = lock(Self::NAME, &self.leafs)?;
        leafs
            .get(contract_id)
            .cloned()
            .ok_or_else(|| StorageError::not_found(Self::NAME, contract_id))
    }
}

// ---------------------------------------------------------------------------
// MemoryCallLinkStore
// ---------------------------------------------------------------------------

/// In-memory execution chain backed by a `HashMap<from, to>`.
#[derive(Debug, Default)]
pub struct MemoryCallLinkStore {
    links: Mutex<HashMap<CallId, CallId>>,
}

impl MemoryCallLinkStore {
    const NAME: &'static str = "call_links";

    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CallLinkStore for MemoryCallLinkStore {
    async fn append(&self, from: &CallId, to: &CallId) -> StorageResult<()> {
        let mut links = lock(Self::NAME, &self.links)?;
        links.insert(from.clone(), to.clone());
        Ok(())
    }

    async fn next(&self, from: &CallId) -> StorageResult<Option<CallId>> {
        let links = lock(Self::NAME, &self.links)?;
        Ok(links.get(from).cloned())
    }
}

// ---------------------------------------------------------------------------
// MemoryCallResultStore
// ---------------------------------------------------------------------------

/// In-memory write-once result store.
///
/// An optional read latency makes concurrent and sequential lookups
/// distinguishable under a paused tokio clock.
#[derive(Debug, Default)]
pub struct MemoryCallResultStore {
    results: Mutex<HashMap<CallResultKey, f64>>,
    read_latency: Option<Duration>,
}

impl MemoryCallResultStore {
    const NAME: &'static str = "call_results";

    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every `get` by `latency`.
    pub fn with_read_latency(mut self, latency: Duration) -> Self {
        self.read_latency = Some(latency);
        self
    }

    pub fn len(&self) -> usize {
        self.results.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CallResultStore for MemoryCallResultStore {
    async fn put(&self, key: CallResultKey, value: f64) -> StorageResult<()> {
        let mut results = lock(Self::NAME, &self.results)?;
        if results.contains_key(&key) {
            warn!(key = %key, "rejected second write to call result");
            return Err(StorageError::AlreadyExists {
                store: Self::NAME,
                key: key.to_string(),
            });
        }
        results.insert(key, value);
        Ok(())
    }

    async fn get(&self, key: &CallResultKey) -> StorageResult<f64> {
        if let Some(latency) = self.read_latency {
            tokio::time::sleep(latency).await;
        }
        let results = lock(Self::NAME, &self.results)?;
        results
            .get(key)
            .copied()
            .ok_or_else(|| StorageError::not_found(Self::NAME, key))
    }
}

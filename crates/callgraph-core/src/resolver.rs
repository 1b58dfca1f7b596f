//! Dependency value resolution.
//!
//! [`DependencyValueResolver`] looks up a call's dependency set, then fetches
//! each dependency's result for one valuation and scenario through a
//! [`FetchStrategy`]. A missing result fails the whole resolution; no
//! partial mapping is ever returned.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use callgraph_state::{
    CallDependenciesStore, CallId, CallResultKey, CallResultStore, ScenarioLabel, ValuationId,
};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::instrument;

use crate::config::{ResolverConfig, ResolverMode};
use crate::domain::{GraphError, GraphResult};
use crate::obs;

/// Values of a call's direct dependencies, keyed by dependency id.
pub type DependencyValues = HashMap<CallId, f64>;

/// How a batch of result lookups is issued.
#[async_trait]
pub trait FetchStrategy: Send + Sync + fmt::Debug {
    async fn fetch(
        &self,
        results: Arc<dyn CallResultStore>,
        keys: Vec<CallResultKey>,
    ) -> GraphResult<DependencyValues>;
}

/// Lookups one after another on the calling task.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialFetch;

#[async_trait]
impl FetchStrategy for SequentialFetch {
    async fn fetch(
        &self,
        results: Arc<dyn CallResultStore>,
        keys: Vec<CallResultKey>,
    ) -> GraphResult<DependencyValues> {
        let mut values = HashMap::with_capacity(keys.len());
        for key in keys {
            match results.get(&key).await {
                Ok(value) => {
                    values.insert(key.call_id, value);
                }
                Err(e) => return Err(lookup_failed(&key, e)),
            }
        }
        Ok(values)
    }
}

/// One spawned task per lookup, at most `max_concurrent` in flight.
///
/// The first failure aborts the remaining tasks.
#[derive(Debug, Clone, Copy)]
pub struct FanOutFetch {
    pub max_concurrent: usize,
}

impl FanOutFetch {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }
}

#[async_trait]
impl FetchStrategy for FanOutFetch {
    async fn fetch(
        &self,
        results: Arc<dyn CallResultStore>,
        keys: Vec<CallResultKey>,
    ) -> GraphResult<DependencyValues> {
        // Semaphore enforces max_concurrent
        let sem = Arc::new(Semaphore::new(self.max_concurrent.max(1)));
        let mut tasks = FuturesUnordered::new();

        for key in keys {
            let results = Arc::clone(&results);
            let sem = Arc::clone(&sem);
            tasks.push(tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.ok();
                let value = results.get(&key).await;
                (key, value)
            }));
        }

        let mut values = HashMap::with_capacity(tasks.len());
        while let Some(joined) = tasks.next().await {
            let err = match joined {
                Ok((key, Ok(value))) => {
                    values.insert(key.call_id, value);
                    continue;
                }
                Ok((key, Err(e))) => lookup_failed(&key, e),
                Err(e) => GraphError::TaskJoin(e.to_string()),
            };
            for task in tasks.iter() {
                task.abort();
            }
            return Err(err);
        }
        Ok(values)
    }
}

fn lookup_failed(key: &CallResultKey, err: callgraph_state::StorageError) -> GraphError {
    let err = GraphError::from_result_lookup(key, err);
    if matches!(err, GraphError::MissingResult { .. }) {
        obs::emit_missing_result(key);
    }
    err
}

/// Resolves the values a call needs from the result store.
#[derive(Clone)]
pub struct DependencyValueResolver {
    dependencies: Arc<dyn CallDependenciesStore>,
    results: Arc<dyn CallResultStore>,
    strategy: Arc<dyn FetchStrategy>,
}

impl DependencyValueResolver {
    /// Resolver with sequential lookups.
    pub fn new(
        dependencies: Arc<dyn CallDependenciesStore>,
        results: Arc<dyn CallResultStore>,
    ) -> Self {
        Self {
            dependencies,
            results,
            strategy: Arc::new(SequentialFetch),
        }
    }

    /// Resolver whose strategy follows `config`.
    pub fn from_config(
        dependencies: Arc<dyn CallDependenciesStore>,
        results: Arc<dyn CallResultStore>,
        config: &ResolverConfig,
    ) -> Self {
        let resolver = Self::new(dependencies, results);
        match config.mode {
            ResolverMode::Sequential => resolver,
            ResolverMode::FanOut => resolver.with_strategy(FanOutFetch::new(config.max_concurrent)),
        }
    }

    pub fn with_strategy(mut self, strategy: impl FetchStrategy + 'static) -> Self {
        self.strategy = Arc::new(strategy);
        self
    }

    /// Values of every direct dependency of `call_id` for one valuation
    /// and scenario.
    ///
    /// Fails with `Integrity` when `call_id` has no dependency entry and
    /// with `MissingResult` when any dependency has no stored value.
    #[instrument(skip(self), fields(strategy = ?self.strategy))]
    pub async fn resolve(
        &self,
        valuation_id: &ValuationId,
        call_id: &CallId,
        scenario: &ScenarioLabel,
    ) -> GraphResult<DependencyValues> {
        let dependencies = self
            .dependencies
            .get(call_id)
            .await
            .map_err(|e| GraphError::from_dependency_lookup(call_id, e))?;
        if dependencies.is_empty() {
            return Ok(DependencyValues::new());
        }

        let keys = dependencies
            .iter()
            .map(|dep| CallResultKey::new(valuation_id, dep, scenario))
            .collect();
        let values = self
            .strategy
            .fetch(Arc::clone(&self.results), keys)
            .await?;

        obs::emit_dependencies_resolved(call_id, scenario, values.len());
        Ok(values)
    }
}

impl fmt::Debug for DependencyValueResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyValueResolver")
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

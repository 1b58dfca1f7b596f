//! Graph construction from a contract specification.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use callgraph_state::{CallId, CallIdSet, CallRegistry, CallRequirement};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::scheduler::{schedule_from_registry, CallGraph, EdgeIndex};
use crate::cache::ParsedExprCache;
use crate::config::EngineConfig;
use crate::domain::{ContractSpecification, GraphError, GraphResult};
use crate::frontend::{DslParser, StubDecomposer};
use crate::obs;

/// Outcome of a successful [`GraphBuilder::build_graph`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub contract_id: CallId,
    pub source_digest: String,
    pub call_count: usize,
    pub leaf_ids: Vec<CallId>,
    /// Calls in execution chain order, root excluded.
    pub execution_order: Vec<CallId>,
}

/// Populates a [`CallRegistry`] from contract specifications.
pub struct GraphBuilder<P: DslParser, D> {
    parser: Arc<P>,
    decomposer: Arc<D>,
    registry: CallRegistry,
    config: EngineConfig,
    cache: Arc<ParsedExprCache<P::Expr>>,
}

impl<P, D> GraphBuilder<P, D>
where
    P: DslParser,
    D: StubDecomposer<P>,
{
    pub fn new(parser: Arc<P>, decomposer: Arc<D>, registry: CallRegistry) -> Self {
        Self {
            parser,
            decomposer,
            registry,
            config: EngineConfig::default(),
            cache: Arc::new(ParsedExprCache::new()),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &CallRegistry {
        &self.registry
    }

    /// Parsed expressions kept from previous builds.
    pub fn cache(&self) -> Arc<ParsedExprCache<P::Expr>> {
        Arc::clone(&self.cache)
    }

    /// Build the call graph of `contract` into the registry.
    ///
    /// Registers a requirement and a dependency entry for every stub, then
    /// the accumulated dependents, then an empty dependents entry for the
    /// contract itself. The schedule is linked into the execution chain
    /// starting at the contract id, and the leaf set is stored last.
    ///
    /// With `verify_acyclic` on, a schedule that misses registered calls
    /// fails: a dependency without a stub is an `Integrity` error, anything
    /// else is `CycleDetected`.
    ///
    /// Any error leaves the registry with a partial build that must not be
    /// read. Re-running the build from scratch is safe; registry writes are
    /// upserts.
    #[instrument(skip(self, contract), fields(contract_id = %contract.id))]
    pub async fn build_graph(&self, contract: &ContractSpecification) -> GraphResult<GraphSummary> {
        let started = Instant::now();
        let source_digest = contract.source_digest();
        obs::emit_build_started(&contract.id, &source_digest);

        let module = self.parser.parse(&contract.specification)?;
        let expr = self.parser.top_level_expr(&module)?;

        let mut graph = CallGraph::new();
        for stub in self.decomposer.decompose(&contract.id, &module, expr) {
            let stub = stub?;

            self.registry
                .requirements
                .put(CallRequirement::new(
                    stub.call_id.clone(),
                    stub.dsl_expr.to_string(),
                    stub.effective_present_time,
                ))
                .await?;
            self.registry
                .dependencies
                .put(&stub.call_id, stub.dependencies.clone())
                .await?;

            obs::emit_stub_registered(&stub.call_id, stub.dependencies.len());
            if self.config.memoize_parsed {
                self.cache.insert(stub.call_id.clone(), stub.dsl_expr);
            }
            graph.add_call(stub.call_id, stub.dependencies);
        }

        for (call_id, dependents) in graph.dependents_entries() {
            self.registry
                .dependents
                .put(call_id, dependents.clone())
                .await?;
        }
        self.registry
            .dependents
            .put(&contract.id, CallIdSet::new())
            .await?;

        let leaf_ids = graph.leaf_ids().to_vec();
        let execution_order = self.link_execution_chain(&contract.id, leaf_ids.clone()).await?;

        if self.config.verify_acyclic && execution_order.len() != graph.len() {
            if let Some((call_id, dependency)) = unregistered_dependency(&graph) {
                obs::emit_unregistered_dependency(&contract.id, call_id, dependency);
                return Err(GraphError::integrity(
                    call_id,
                    format!("depends on {dependency}, which the decomposition never registered"),
                ));
            }

            let scheduled: HashSet<&CallId> = execution_order.iter().collect();
            let unscheduled: Vec<CallId> = graph
                .call_ids()
                .iter()
                .filter(|id| !scheduled.contains(id))
                .cloned()
                .collect();
            obs::emit_cycle_detected(&contract.id, &unscheduled);
            return Err(GraphError::CycleDetected { unscheduled });
        }

        self.registry.leafs.put(&contract.id, leaf_ids.clone()).await?;

        obs::emit_build_finished(
            &contract.id,
            graph.len(),
            leaf_ids.len(),
            started.elapsed().as_millis() as u64,
        );

        Ok(GraphSummary {
            contract_id: contract.id.clone(),
            source_digest,
            call_count: graph.len(),
            leaf_ids,
            execution_order,
        })
    }

    /// Schedule from the registry and link each emitted call after the
    /// previous one, starting at the contract root.
    async fn link_execution_chain(
        &self,
        contract_id: &CallId,
        leaf_ids: Vec<CallId>,
    ) -> GraphResult<Vec<CallId>> {
        let order = schedule_from_registry(
            leaf_ids,
            self.registry.dependents.as_ref(),
            self.registry.dependencies.as_ref(),
        );
        futures::pin_mut!(order);

        let mut execution_order = Vec::new();
        let mut previous = contract_id.clone();
        while let Some(call_id) = order.try_next().await? {
            self.registry.links.append(&previous, &call_id).await?;
            previous = call_id.clone();
            execution_order.push(call_id);
        }
        Ok(execution_order)
    }
}

/// First call, in registration order, naming a dependency that has no
/// stub of its own. Such a call can never be scheduled.
fn unregistered_dependency(graph: &CallGraph) -> Option<(&CallId, &CallId)> {
    graph.call_ids().iter().find_map(|call_id| {
        graph
            .dependencies(call_id)?
            .iter()
            .find(|dependency| !graph.contains(dependency))
            .map(|dependency| (call_id, dependency))
    })
}

impl<P: DslParser, D> std::fmt::Debug for GraphBuilder<P, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

//! Valuation driver: walks a built execution chain and evaluates each call.
//!
//! Numeric evaluation is external and plugged in through [`CallEvaluator`].
//! For every call in chain order and every requested scenario the driver
//! loads the call requirement, resolves dependency values, evaluates and
//! writes the result. Chain order guarantees dependencies are written
//! before any dependent asks for them.
//!
//! When the driver shares the builder's [`ParsedExprCache`], the evaluator
//! receives the memoized expression alongside the requirement and can skip
//! re-parsing `dsl_source`.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use callgraph_state::{
    CallId, CallRegistry, CallRequirement, CallResultKey, CallResultStore, ScenarioLabel,
    ValuationId,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::cache::ParsedExprCache;
use crate::config::ResolverConfig;
use crate::domain::{EvaluationError, GraphError, GraphResult};
use crate::graph::walk_execution_chain;
use crate::obs;
use crate::resolver::{DependencyValueResolver, DependencyValues};

/// Evaluates one call's residual expression to a number.
#[async_trait]
pub trait CallEvaluator: Send + Sync {
    /// Parsed form of a call expression, as memoized by the graph builder.
    type Expr: Send + Sync + 'static;

    /// `parsed` is `None` when no memo entry exists for the call; the
    /// evaluator then works from `requirement.dsl_source`.
    async fn evaluate(
        &self,
        requirement: &CallRequirement,
        parsed: Option<&Self::Expr>,
        scenario: &ScenarioLabel,
        dependency_values: &DependencyValues,
    ) -> Result<f64, EvaluationError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioValue {
    pub scenario: ScenarioLabel,
    pub value: f64,
}

/// Summary of one [`ValuationDriver::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationReport {
    pub valuation_id: ValuationId,
    pub contract_id: CallId,
    pub calls_evaluated: usize,
    /// Value of the last call in the chain, per scenario.
    pub values: Vec<ScenarioValue>,
}

pub struct ValuationDriver<E> {
    registry: CallRegistry,
    results: Arc<dyn CallResultStore>,
    resolver: DependencyValueResolver,
    evaluator: Arc<dyn CallEvaluator<Expr = E>>,
    parsed: Option<Arc<ParsedExprCache<E>>>,
}

impl<E: Send + Sync + 'static> ValuationDriver<E> {
    pub fn new(
        registry: CallRegistry,
        results: Arc<dyn CallResultStore>,
        evaluator: Arc<dyn CallEvaluator<Expr = E>>,
        config: &ResolverConfig,
    ) -> Self {
        let resolver = DependencyValueResolver::from_config(
            Arc::clone(&registry.dependencies),
            Arc::clone(&results),
            config,
        );
        Self {
            registry,
            results,
            resolver,
            evaluator,
            parsed: None,
        }
    }

    /// Hand memoized expressions from `cache` to the evaluator.
    ///
    /// Usually the cache of the [`GraphBuilder`](crate::GraphBuilder) that
    /// built the contract.
    pub fn with_parsed_cache(mut self, cache: Arc<ParsedExprCache<E>>) -> Self {
        self.parsed = Some(cache);
        self
    }

    /// Evaluate every call of `contract_id` under each scenario.
    ///
    /// An empty `scenarios` slice evaluates the base scenario only.
    #[instrument(skip(self, scenarios), fields(scenario_count = scenarios.len()))]
    pub async fn run(
        &self,
        contract_id: &CallId,
        valuation_id: &ValuationId,
        scenarios: &[ScenarioLabel],
    ) -> GraphResult<ValuationReport> {
        let started = Instant::now();
        let scenarios = if scenarios.is_empty() {
            vec![ScenarioLabel::base()]
        } else {
            scenarios.to_vec()
        };

        let chain = walk_execution_chain(self.registry.links.as_ref(), contract_id).await?;

        let mut calls_evaluated = 0;
        let mut last_values: Vec<ScenarioValue> = Vec::new();
        for call_id in &chain {
            let requirement = self.registry.requirements.get(call_id).await.map_err(|e| {
                if e.is_not_found() {
                    GraphError::integrity(call_id, "execution chain names an unregistered call")
                } else {
                    GraphError::Storage(e)
                }
            })?;

            let parsed = self.parsed.as_ref().and_then(|cache| cache.get(call_id));

            last_values.clear();
            for scenario in &scenarios {
                let dependency_values = self
                    .resolver
                    .resolve(valuation_id, call_id, scenario)
                    .await?;
                let value = self
                    .evaluator
                    .evaluate(&requirement, parsed.as_deref(), scenario, &dependency_values)
                    .await
                    .map_err(|e| GraphError::Evaluation {
                        call_id: call_id.clone(),
                        message: e.0,
                    })?;
                self.results
                    .put(CallResultKey::new(valuation_id, call_id, scenario), value)
                    .await?;

                obs::emit_call_evaluated(call_id, scenario, value);
                last_values.push(ScenarioValue {
                    scenario: scenario.clone(),
                    value,
                });
            }
            calls_evaluated += 1;
        }

        obs::emit_valuation_finished(
            valuation_id,
            contract_id,
            calls_evaluated,
            started.elapsed().as_millis() as u64,
        );

        Ok(ValuationReport {
            valuation_id: valuation_id.clone(),
            contract_id: contract_id.clone(),
            calls_evaluated,
            values: last_values,
        })
    }
}

impl<E> std::fmt::Debug for ValuationDriver<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValuationDriver")
            .field("registry", &self.registry)
            .field("resolver", &self.resolver)
            .field("memoized", &self.parsed.is_some())
            .finish_non_exhaustive()
    }
}

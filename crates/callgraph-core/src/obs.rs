//! Structured observability hooks for graph build and valuation events.
//!
//! Lifecycle events are emitted at `info!`, per-call events at `debug!`
//! and invariant violations at `warn!`. Filtering follows `RUST_LOG`; see
//! [`crate::telemetry::init_tracing`].

use callgraph_state::{CallId, CallResultKey, ScenarioLabel, ValuationId};
use tracing::{debug, info, warn};

/// Emit event: graph build started for a contract.
///
/// # Example
///
/// ```ignore
/// emit_build_started(&contract.id, &contract.source_digest());
/// // logs: event=graph.build_started contract_id=... source_digest=...
/// ```
pub fn emit_build_started(contract_id: &CallId, source_digest: &str) {
    info!(
        event = "graph.build_started",
        contract_id = %contract_id,
        source_digest = %source_digest,
    );
}

pub fn emit_stub_registered(call_id: &CallId, dependency_count: usize) {
    debug!(
        event = "graph.stub_registered",
        call_id = %call_id,
        dependency_count = dependency_count,
    );
}

/// Emit event: graph build finished with call and leaf counts.
pub fn emit_build_finished(
    contract_id: &CallId,
    call_count: usize,
    leaf_count: usize,
    duration_ms: u64,
) {
    info!(
        event = "graph.build_finished",
        contract_id = %contract_id,
        call_count = call_count,
        leaf_count = leaf_count,
        duration_ms = duration_ms,
    );
}

/// Emit event: the schedule left calls behind (warning level).
pub fn emit_cycle_detected(contract_id: &CallId, unscheduled: &[CallId]) {
    warn!(
        event = "graph.cycle_detected",
        contract_id = %contract_id,
        unscheduled_count = unscheduled.len(),
        unscheduled = ?unscheduled,
    );
}

pub fn emit_unregistered_dependency(contract_id: &CallId, call_id: &CallId, dependency: &CallId) {
    warn!(
        event = "graph.unregistered_dependency",
        contract_id = %contract_id,
        call_id = %call_id,
        dependency = %dependency,
    );
}

pub fn emit_dependencies_resolved(call_id: &CallId, scenario: &ScenarioLabel, count: usize) {
    debug!(
        event = "resolver.dependencies_resolved",
        call_id = %call_id,
        scenario = %scenario,
        count = count,
    );
}

/// Emit event: a dependency had no result when it was asked for.
pub fn emit_missing_result(key: &CallResultKey) {
    warn!(
        event = "resolver.missing_result",
        valuation_id = %key.valuation_id,
        call_id = %key.call_id,
        scenario = %key.scenario,
    );
}

pub fn emit_call_evaluated(call_id: &CallId, scenario: &ScenarioLabel, value: f64) {
    debug!(
        event = "valuation.call_evaluated",
        call_id = %call_id,
        scenario = %scenario,
        value = value,
    );
}

/// Emit event: valuation finished with calls evaluated and duration.
pub fn emit_valuation_finished(
    valuation_id: &ValuationId,
    contract_id: &CallId,
    calls_evaluated: usize,
    duration_ms: u64,
) {
    info!(
        event = "valuation.finished",
        valuation_id = %valuation_id,
        contract_id = %contract_id,
        calls_evaluated = calls_evaluated,
        duration_ms = duration_ms,
    );
}

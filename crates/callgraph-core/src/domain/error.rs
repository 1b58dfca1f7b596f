//! Error taxonomy for graph construction, scheduling and resolution.

use callgraph_state::{CallId, CallResultKey, ScenarioLabel, StorageError, ValuationId};

/// The contract source could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error: {message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The stub decomposition failed part-way through its sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stub decomposition failed: {message}")]
pub struct DecompositionError {
    pub message: String,
}

impl DecompositionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Numeric evaluation of a call failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct EvaluationError(pub String);

/// An engine setting could not be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Errors produced by the graph engine.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Decomposition(#[from] DecompositionError),

    /// A registry entry the graph builder always writes is missing.
    #[error("integrity violation for call {call_id}: {detail}")]
    Integrity { call_id: CallId, detail: String },

    /// A dependency was queried before it was evaluated.
    #[error(
        "no result for call {call_id} in valuation {valuation_id} under scenario {scenario}"
    )]
    MissingResult {
        valuation_id: ValuationId,
        call_id: CallId,
        scenario: ScenarioLabel,
    },

    #[error("dependency cycle: calls never scheduled: {unscheduled:?}")]
    CycleDetected { unscheduled: Vec<CallId> },

    #[error("evaluation of call {call_id} failed: {message}")]
    Evaluation { call_id: CallId, message: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("resolver task failed: {0}")]
    TaskJoin(String),
}

impl GraphError {
    pub fn integrity(call_id: &CallId, detail: impl Into<String>) -> Self {
        GraphError::Integrity {
            call_id: call_id.clone(),
            detail: detail.into(),
        }
    }

    /// Map a failed dependency-entry lookup. Absence is an integrity
    /// violation; every built call has an entry, even if empty.
    pub fn from_dependency_lookup(call_id: &CallId, err: StorageError) -> Self {
        if err.is_not_found() {
            GraphError::integrity(call_id, "no dependency entry registered")
        } else {
            GraphError::Storage(err)
        }
    }

    /// Map a failed result-store lookup. Absence means the dependency was
    /// not evaluated first for this valuation and scenario.
    pub fn from_result_lookup(key: &CallResultKey, err: StorageError) -> Self {
        if err.is_not_found() {
            GraphError::MissingResult {
                valuation_id: key.valuation_id.clone(),
                call_id: key.call_id.clone(),
                scenario: key.scenario.clone(),
            }
        } else {
            GraphError::Storage(err)
        }
    }
}

/// Result type for graph engine operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_result_displays_key_parts() {
        let err = GraphError::MissingResult {
            valuation_id: ValuationId::from("val-9"),
            call_id: CallId::from("c-3"),
            scenario: ScenarioLabel::from("rates+1bp"),
        };
        let msg = err.to_string();
        assert!(msg.contains("val-9"));
        assert!(msg.contains("c-3"));
        assert!(msg.contains("rates+1bp"));
    }

    #[test]
    fn test_dependency_lookup_not_found_is_integrity() {
        let err = GraphError::from_dependency_lookup(
            &CallId::from("c1"),
            StorageError::not_found("call_dependencies", "c1"),
        );
        assert!(matches!(err, GraphError::Integrity { .. }));
    }

    #[test]
    fn test_dependency_lookup_backend_failure_stays_storage() {
        let err = GraphError::from_dependency_lookup(
            &CallId::from("c1"),
            StorageError::Backend("timeout".to_string()),
        );
        assert!(matches!(err, GraphError::Storage(_)));
    }

    #[test]
    fn test_result_lookup_not_found_is_missing_result() {
        let key = CallResultKey::new(
            &ValuationId::from("v"),
            &CallId::from("c"),
            &ScenarioLabel::base(),
        );
        let err = GraphError::from_result_lookup(&key, StorageError::not_found("call_results", &key));
        match err {
            GraphError::MissingResult { call_id, .. } => assert_eq!(call_id, CallId::from("c")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_error_converts_transparently() {
        let err: GraphError = ParseError::new("unexpected token").into();
        assert_eq!(err.to_string(), "parse error: unexpected token");
    }
}

//! Contract specifications and the stubbed calls decomposed from them.

use callgraph_state::{CallId, CallIdSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Source text of a payoff program plus its identifier.
///
/// The identifier roots the execution chain of the contract's call graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSpecification {
    pub id: CallId,
    pub specification: String,
}

impl ContractSpecification {
    /// Create a specification with a freshly generated id.
    pub fn new(specification: impl Into<String>) -> Self {
        Self::with_id(CallId::new(), specification)
    }

    pub fn with_id(id: CallId, specification: impl Into<String>) -> Self {
        Self {
            id,
            specification: specification.into(),
        }
    }

    /// SHA-256 hex digest of the source text.
    pub fn source_digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.specification.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// One atomic, independently evaluable sub-expression produced by stub
/// decomposition.
#[derive(Debug, Clone, PartialEq)]
pub struct StubbedCall<E> {
    pub call_id: CallId,
    /// Residual expression with dependencies replaced by stubs.
    pub dsl_expr: E,
    pub effective_present_time: Option<DateTime<Utc>>,
    /// Calls whose values this call needs.
    pub dependencies: CallIdSet,
}

impl<E> StubbedCall<E> {
    pub fn is_leaf(&self) -> bool {
        self.dependencies.is_empty()
    }
}

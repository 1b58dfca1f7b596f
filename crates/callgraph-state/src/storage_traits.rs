//! Storage trait definitions for the call graph engine
//!
//! These traits define the registry contracts the engine writes while
//! building a dependency graph, and the result store it reads while
//! resolving dependency values:
//! - `CallRequirementStore`: residual expression + evaluation time per call
//! - `CallDependenciesStore` / `CallDependentsStore`: forward and reverse edges
//! - `CallLeafsStore`: leaf calls per contract specification
//! - `CallLinkStore`: the singly-linked execution chain
//! - `CallResultStore`: values keyed by (valuation, call, scenario)
//!
//! All traits are async and backend-agnostic. Every operation is atomic at
//! the single-key level; nothing here spans keys. In-memory fakes are
//! provided via the `fakes` module.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// A set of call identifiers with a stable iteration order.
pub type CallIdSet = BTreeSet<CallId>;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Opaque identifier of a stubbed call.
///
/// Contract specifications share the identifier space: a contract's own id
/// roots its execution chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(pub String);

impl CallId {
    /// Generate a new random CallId
    pub fn new() -> Self {
        CallId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for CallId {
    fn from(s: &str) -> Self {
        CallId(s.to_string())
    }
}

impl From<String> for CallId {
    fn from(s: String) -> Self {
        CallId(s)
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one valuation run of a contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValuationId(pub String);

impl ValuationId {
    /// Generate a new random ValuationId
    pub fn new() -> Self {
        ValuationId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ValuationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ValuationId {
    fn from(s: &str) -> Self {
        ValuationId(s.to_string())
    }
}

impl std::fmt::Display for ValuationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Label of a market perturbation scenario.
///
/// The empty label is the base (unperturbed) scenario.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioLabel(pub String);

impl ScenarioLabel {
    pub fn base() -> Self {
        ScenarioLabel(String::new())
    }

    pub fn is_base(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for ScenarioLabel {
    fn from(s: &str) -> Self {
        ScenarioLabel(s.to_string())
    }
}

impl std::fmt::Display for ScenarioLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_base() {
            write!(f, "<base>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Persisted requirement of a single call: what to evaluate and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRequirement {
    pub call_id: CallId,
    /// Serialized residual expression.
    pub dsl_source: String,
    /// Time at which the expression is evaluated, if it is pinned to one.
    pub effective_present_time: Option<DateTime<Utc>>,
}

impl CallRequirement {
    pub fn new(
        call_id: CallId,
        dsl_source: impl Into<String>,
        effective_present_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            call_id,
            dsl_source: dsl_source.into(),
            effective_present_time,
        }
    }
}

/// Composite key of the result store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallResultKey {
    pub valuation_id: ValuationId,
    pub call_id: CallId,
    pub scenario: ScenarioLabel,
}

impl CallResultKey {
    pub fn new(valuation_id: &ValuationId, call_id: &CallId, scenario: &ScenarioLabel) -> Self {
        Self {
            valuation_id: valuation_id.clone(),
            call_id: call_id.clone(),
            scenario: scenario.clone(),
        }
    }
}

impl std::fmt::Display for CallResultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.valuation_id, self.call_id, self.scenario)
    }
}

// ---------------------------------------------------------------------------
// Registry stores
// ---------------------------------------------------------------------------

/// Call requirements by call id.
///
/// Writes are upserts so a graph can be rebuilt from scratch over a
/// registry holding a partial build.
#[async_trait]
pub trait CallRequirementStore: Send + Sync {
    async fn put(&self, requirement: CallRequirement) -> StorageResult<()>;

    /// Returns `StorageError::NotFound` if absent.
    async fn get(&self, call_id: &CallId) -> StorageResult<CallRequirement>;
}

/// Forward edges: the calls each call depends on.
#[async_trait]
pub trait CallDependenciesStore: Send + Sync {
    async fn put(&self, call_id: &CallId, dependencies: CallIdSet) -> StorageResult<()>;

    /// Returns `StorageError::NotFound` if no entry was registered. A leaf
    /// call has an entry holding the empty set.
    async fn get(&self, call_id: &CallId) -> StorageResult<CallIdSet>;
}

/// Reverse edges: the calls that depend on each call.
///
/// Callers treat `NotFound` as "no dependents".
#[async_trait]
pub trait CallDependentsStore: Send + Sync {
    async fn put(&self, call_id: &CallId, dependents: CallIdSet) -> StorageResult<()>;

    async fn get(&self, call_id: &CallId) -> StorageResult<CallIdSet>;
}

/// Leaf calls per contract specification, in discovery order.
#[async_trait]
pub trait CallLeafsStore: Send + Sync {
    async fn put(&self, contract_id: &CallId, leaf_ids: Vec<CallId>) -> StorageResult<()>;

    async fn get(&self, contract_id: &CallId) -> StorageResult<Vec<CallId>>;
}

/// The execution chain, one link per call.
#[async_trait]
pub trait CallLinkStore: Send + Sync {
    /// Record that `to` follows `from` in the chain.
    async fn append(&self, from: &CallId, to: &CallId) -> StorageResult<()>;

    /// The call following `from`, or `None` at the end of the chain.
    async fn next(&self, from: &CallId) -> StorageResult<Option<CallId>>;
}

// ---------------------------------------------------------------------------
// Result store
// ---------------------------------------------------------------------------

/// Call results by (valuation, call, scenario).
///
/// Guarantees:
/// - Entries are write-once; a second `put` for a key fails with
///   `StorageError::AlreadyExists`.
/// - `get` is safe to issue concurrently from many tasks.
#[async_trait]
pub trait CallResultStore: Send + Sync {
    async fn put(&self, key: CallResultKey, value: f64) -> StorageResult<()>;

    /// Returns `StorageError::NotFound` if the call has not been evaluated
    /// for this valuation and scenario.
    async fn get(&self, key: &CallResultKey) -> StorageResult<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_scenario_is_empty_label() {
        let base = ScenarioLabel::base();
        assert!(base.is_base());
        assert_eq!(base, ScenarioLabel::default());
        assert_eq!(base.to_string(), "<base>");
        assert!(!ScenarioLabel::from("spot+1%").is_base());
    }

    #[test]
    fn test_result_key_display_joins_components() {
        let key = CallResultKey::new(
            &ValuationId::from("v1"),
            &CallId::from("c1"),
            &ScenarioLabel::from("vol-up"),
        );
        assert_eq!(key.to_string(), "v1/c1/vol-up");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(CallId::new(), CallId::new());
        assert_ne!(ValuationId::new(), ValuationId::new());
    }

    #[test]
    fn test_call_id_set_membership() {
        let id = CallId::from("abc");
        let set: CallIdSet = [id.clone()].into_iter().collect();
        assert!(set.contains(&id));
        assert_eq!(id.as_str(), "abc");
    }
}

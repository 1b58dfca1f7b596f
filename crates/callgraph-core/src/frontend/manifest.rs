//! JSON stub manifests: contracts whose decomposition is already known.
//!
//! A manifest lists stubs dependencies-first:
//!
//! ```json
//! {
//!   "expr": "Max(a, b)",
//!   "stubs": [
//!     { "call_id": "a", "expr": "Market('NBP')", "effective_present_time": "2027-01-01T00:00:00Z" },
//!     { "call_id": "b", "expr": "Market('TTF')" },
//!     { "call_id": "@root", "expr": "Max(Stub('a'), Stub('b'))", "dependencies": ["a", "b"] }
//!   ]
//! }
//! ```
//!
//! The id `@root` stands for the contract's own id.

use std::collections::HashSet;

use callgraph_state::{CallId, CallIdSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DslParser, StubDecomposer, StubSequence};
use crate::domain::{DecompositionError, ParseError, StubbedCall};
use crate::graph::CallGraph;

/// Placeholder replaced by the contract id during decomposition.
pub const ROOT_PLACEHOLDER: &str = "@root";

fn resolve_id(id: &CallId, root: &CallId) -> CallId {
    if id.as_str() == ROOT_PLACEHOLDER {
        root.clone()
    } else {
        id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StubManifest {
    /// Top-level expression of the contract.
    pub expr: String,
    #[serde(default)]
    pub stubs: Vec<ManifestStub>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestStub {
    pub call_id: CallId,
    pub expr: String,
    #[serde(default)]
    pub effective_present_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub dependencies: Vec<CallId>,
}

impl StubManifest {
    /// Graph of the listed stubs with no ordering checks, for diagnosing
    /// manifests the decomposition rejects.
    pub fn call_graph(&self, root_id: &CallId) -> CallGraph {
        let mut graph = CallGraph::new();
        for stub in &self.stubs {
            graph.add_call(
                resolve_id(&stub.call_id, root_id),
                stub.dependencies
                    .iter()
                    .map(|d| resolve_id(d, root_id))
                    .collect(),
            );
        }
        graph
    }
}

/// Front end reading [`StubManifest`] JSON as contract source.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestFrontend;

impl ManifestFrontend {
    pub fn new() -> Self {
        Self
    }
}

impl DslParser for ManifestFrontend {
    type Module = StubManifest;
    type Expr = String;

    fn parse(&self, source: &str) -> Result<StubManifest, ParseError> {
        serde_json::from_str(source)
            .map_err(|e| ParseError::new(format!("invalid stub manifest: {e}")))
    }

    fn top_level_expr(&self, module: &StubManifest) -> Result<String, ParseError> {
        if module.expr.trim().is_empty() {
            return Err(ParseError::new("stub manifest has no top-level expression"));
        }
        Ok(module.expr.clone())
    }
}

impl StubDecomposer<ManifestFrontend> for ManifestFrontend {
    fn decompose<'a>(
        &'a self,
        root_id: &CallId,
        module: &'a StubManifest,
        _expr: String,
    ) -> StubSequence<'a, String> {
        let root = root_id.clone();
        let mut emitted: HashSet<CallId> = HashSet::new();

        Box::new(module.stubs.iter().map(move |stub| {
            let call_id = resolve_id(&stub.call_id, &root);
            let dependencies: CallIdSet = stub
                .dependencies
                .iter()
                .map(|d| resolve_id(d, &root))
                .collect();

            if let Some(missing) = dependencies.iter().find(|d| !emitted.contains(*d)) {
                return Err(DecompositionError::new(format!(
                    "stub {call_id} depends on {missing}, which was not emitted before it"
                )));
            }
            if !emitted.insert(call_id.clone()) {
                return Err(DecompositionError::new(format!(
                    "stub {call_id} emitted twice"
                )));
            }

            Ok(StubbedCall {
                call_id,
                dsl_expr: stub.expr.clone(),
                effective_present_time: stub.effective_present_time,
                dependencies,
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decompose_all(source: &str, root: &str) -> Vec<Result<StubbedCall<String>, DecompositionError>> {
        let frontend = ManifestFrontend::new();
        let module = frontend.parse(source).unwrap();
        let expr = frontend.top_level_expr(&module).unwrap();
        frontend
            .decompose(&CallId::from(root), &module, expr)
            .collect()
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = ManifestFrontend.parse("{ not json").unwrap_err();
        assert!(err.message.contains("invalid stub manifest"));
    }

    #[test]
    fn test_blank_top_level_expression_is_parse_error() {
        let module = ManifestFrontend.parse(r#"{"expr": "  "}"#).unwrap();
        assert!(ManifestFrontend.top_level_expr(&module).is_err());
    }

    #[test]
    fn test_root_placeholder_resolves_to_contract_id() {
        let stubs = decompose_all(
            r#"{"expr": "x", "stubs": [
                {"call_id": "a", "expr": "1"},
                {"call_id": "@root", "expr": "Stub('a') + 1", "dependencies": ["a"]}
            ]}"#,
            "contract-1",
        );
        let root = stubs[1].as_ref().unwrap();
        assert_eq!(root.call_id, CallId::from("contract-1"));
        assert!(root.dependencies.contains(&CallId::from("a")));
        assert!(stubs[0].as_ref().unwrap().is_leaf());
    }

    #[test]
    fn test_forward_reference_fails_mid_sequence() {
        let stubs = decompose_all(
            r#"{"expr": "x", "stubs": [
                {"call_id": "a", "expr": "1"},
                {"call_id": "b", "expr": "Stub('c')", "dependencies": ["c"]},
                {"call_id": "c", "expr": "2"}
            ]}"#,
            "root",
        );
        assert!(stubs[0].is_ok());
        assert!(stubs[1].is_err());
    }

    #[test]
    fn test_call_graph_keeps_out_of_order_stubs() {
        let module = ManifestFrontend
            .parse(
                r#"{"expr": "x", "stubs": [
                    {"call_id": "@root", "expr": "Stub('a')", "dependencies": ["a"]},
                    {"call_id": "a", "expr": "1"}
                ]}"#,
            )
            .unwrap();
        let graph = module.call_graph(&CallId::from("R"));
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.leaf_ids(), &[CallId::from("a")]);
    }

    #[test]
    fn test_duplicate_stub_is_rejected() {
        let stubs = decompose_all(
            r#"{"expr": "x", "stubs": [
                {"call_id": "a", "expr": "1"},
                {"call_id": "a", "expr": "1"}
            ]}"#,
            "root",
        );
        assert!(stubs[1].as_ref().unwrap_err().message.contains("twice"));
    }
}

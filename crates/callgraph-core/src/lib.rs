//! Callgraph-Core: dependency graphs for contract valuation
//!
//! Compiles a contract specification into a graph of stubbed calls,
//! orders the calls topologically and resolves each call's dependency
//! values from a result store that may hold several perturbation
//! scenarios.
//!
//! ## Layer 1 - Engine
//!
//! - [`GraphBuilder`]: parses and decomposes a contract through the
//!   [`frontend`] collaborators and writes the [`CallRegistry`]
//! - [`schedule`] / [`schedule_from_registry`]: Kahn's algorithm over the
//!   dependents relation
//! - [`DependencyValueResolver`]: sequential or fan-out dependency lookups
//! - [`ValuationDriver`]: walks the execution chain through a
//!   [`CallEvaluator`]
//!
//! [`CallRegistry`]: callgraph_state::CallRegistry

pub mod cache;
pub mod config;
pub mod domain;
pub mod driver;
pub mod frontend;
pub mod graph;
pub mod obs;
pub mod resolver;
pub mod telemetry;

pub use cache::ParsedExprCache;
pub use config::{EngineConfig, ResolverConfig, ResolverMode};
pub use domain::{
    ConfigError, ContractSpecification, DecompositionError, EvaluationError, GraphError,
    GraphResult, ParseError, StubbedCall,
};
pub use driver::{CallEvaluator, ScenarioValue, ValuationDriver, ValuationReport};
pub use frontend::{DslParser, ManifestFrontend, StubDecomposer, StubManifest, StubSequence};
pub use graph::{
    schedule, schedule_from_registry, walk_execution_chain, CallGraph, EdgeIndex, ExecutionOrder,
    GraphBuilder, GraphSummary, KahnFrontier,
};
pub use resolver::{
    DependencyValueResolver, DependencyValues, FanOutFetch, FetchStrategy, SequentialFetch,
};

/// Crate version, from Cargo metadata.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

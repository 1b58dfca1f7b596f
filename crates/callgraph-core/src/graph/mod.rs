//! Call graph construction and scheduling.
//!
//! Nodes are calls; an edge `A -> B` in the dependents relation means
//! "B depends on A", so A must be evaluated before B.

pub mod builder;
pub mod chain;
pub mod frontier;
pub mod scheduler;

pub use builder::{GraphBuilder, GraphSummary};
pub use chain::walk_execution_chain;
pub use frontier::KahnFrontier;
pub use scheduler::{schedule, schedule_from_registry, CallGraph, EdgeIndex, ExecutionOrder};

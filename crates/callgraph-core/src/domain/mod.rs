//! Domain types shared by the graph engine.

pub mod contract;
pub mod error;

pub use contract::{ContractSpecification, StubbedCall};
pub use error::{
    ConfigError, DecompositionError, EvaluationError, GraphError, GraphResult, ParseError,
};

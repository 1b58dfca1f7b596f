//! Callgraph-State: registry and result store contracts
//!
//! This crate defines the persistence boundary of the call graph engine.
//! The engine only needs key-addressed storage; how entries are made
//! durable is up to the backend behind these traits.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: identifiers, persisted records and single-key store contracts.
//!
//! ## Key Components
//!
//! - `CallId` / `ValuationId` / `ScenarioLabel`: identifiers joined across stores
//! - `CallRequirement`: residual expression and evaluation time of a call
//! - `CallRegistry`: the stores a graph build writes
//! - `CallResultStore`: results keyed by `CallResultKey`

mod error;
pub mod fakes;
mod registry;
pub mod storage_traits;

pub use error::StorageError;
pub use registry::CallRegistry;
pub use storage_traits::{
    CallDependenciesStore, CallDependentsStore, CallId, CallIdSet, CallLeafsStore, CallLinkStore,
    CallRequirement, CallRequirementStore, CallResultKey, CallResultStore, ScenarioLabel,
    StorageResult, ValuationId,
};

//! Bundle of the registry stores written by a graph build.

use std::sync::Arc;

use crate::fakes::{
    MemoryCallDependenciesStore, MemoryCallDependentsStore, MemoryCallLeafsStore,
    MemoryCallLinkStore, MemoryCallRequirementStore,
};
use crate::storage_traits::{
    CallDependenciesStore, CallDependentsStore, CallLeafsStore, CallLinkStore,
    CallRequirementStore,
};

/// The five registry stores a graph build populates.
///
/// Cheap to clone; every store is shared behind an `Arc`.
#[derive(Clone)]
pub struct CallRegistry {
    pub requirements: Arc<dyn CallRequirementStore>,
    pub dependencies: Arc<dyn CallDependenciesStore>,
    pub dependents: Arc<dyn CallDependentsStore>,
    pub leafs: Arc<dyn CallLeafsStore>,
    pub links: Arc<dyn CallLinkStore>,
}

impl CallRegistry {
    /// Registry backed entirely by the in-memory fakes.
    pub fn in_memory() -> Self {
        Self {
            requirements: Arc::new(MemoryCallRequirementStore::new()),
            dependencies: Arc::new(MemoryCallDependenciesStore::new()),
            dependents: Arc::new(MemoryCallDependentsStore::new()),
            leafs: Arc::new(MemoryCallLeafsStore::new()),
            links: Arc::new(MemoryCallLinkStore::new()),
        }
    }
}

impl std::fmt::Debug for CallRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallRegistry").finish_non_exhaustive()
    }
}

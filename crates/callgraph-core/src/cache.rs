//! Process-local memo of parsed call expressions.
//!
//! Entries live only as long as the cache. They are never written to the
//! registry and are not shared across processes.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use callgraph_state::CallId;

/// Parsed expressions keyed by call id.
#[derive(Debug)]
pub struct ParsedExprCache<E> {
    entries: RwLock<HashMap<CallId, Arc<E>>>,
}

impl<E> Default for ParsedExprCache<E> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<E> ParsedExprCache<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `expr` for `call_id`, replacing any previous entry.
    pub fn insert(&self, call_id: CallId, expr: E) -> Arc<E> {
        let expr = Arc::new(expr);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(call_id, Arc::clone(&expr));
        expr
    }

    pub fn get(&self, call_id: &CallId) -> Option<Arc<E>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(call_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

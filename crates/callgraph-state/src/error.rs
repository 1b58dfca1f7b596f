//! Error types for callgraph-state

use thiserror::Error;

/// Errors returned by registry and result store implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No entry is stored under the key.
    #[error("{store}: no entry for {key}")]
    NotFound { store: &'static str, key: String },

    /// A write-once entry already holds a value.
    #[error("{store}: entry for {key} already exists")]
    AlreadyExists { store: &'static str, key: String },

    /// The backing store failed.
    #[error("storage backend failed: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn not_found(store: &'static str, key: impl ToString) -> Self {
        StorageError::NotFound {
            store,
            key: key.to_string(),
        }
    }

    /// `true` for [`StorageError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

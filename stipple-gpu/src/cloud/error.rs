//! Error types for the point cloud store and its backends.

use thiserror::Error;

/// Errors raised by add operations and store construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Failed to allocate {requested} point batch(es)")]
    AllocationFailure { requested: usize },

    #[error("Asked to add {count} points but only {available} were supplied")]
    InvalidArgument { count: usize, available: usize },

    #[error("Batch capacity must be non-zero")]
    ZeroCapacity,
}

/// Errors reported by a [`BatchBackend`](super::BatchBackend).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Failed to create batch resource: {0}")]
    Create(String),

    #[error("Failed to attach batch to scene: {0}")]
    Attach(String),

    #[error("Failed to upload batch: {0}")]
    Upload(String),

    #[error("Upload of {len} points exceeds batch capacity {capacity}")]
    Overflow { len: usize, capacity: usize },

    #[error("Resource not found: {0}")]
    MissingResource(&'static str),
}

/// A commit stopped at the first batch the backend refused.
#[derive(Debug, Error)]
#[error("Commit failed at batch {batch}: {source}")]
pub struct CommitError {
    /// Index of the batch that failed; it stays dirty.
    pub batch: usize,
    #[source]
    pub source: BackendError,
}

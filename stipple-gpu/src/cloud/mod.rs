//! Batched point cloud storage.
//!
//! - [`PointCloudStore`] - owns points in fixed-capacity batches, commits on demand
//! - [`BatchBackend`] - turns batches into renderable resources
//! - [`CountingBackend`] - backend that only records calls

mod backend;
mod batch;
mod counting;
mod error;
mod store;

pub use backend::BatchBackend;
pub use batch::{Batch, BatchState};
pub use counting::{BackendStats, CountedBatch, CountingBackend, CountingScene};
pub use error::{BackendError, CommitError, StoreError};
pub use store::{CommitReport, DEFAULT_BATCH_CAPACITY, PointCloudStore, StoreConfig};

//! Stipple GPU Crate
//!
//! Keeps very large, growing point clouds drawable by grouping points into
//! fixed-capacity batches and uploading only the batches that changed.
//!
//! ## Modules
//!
//! - [`cloud`]: the [`PointCloudStore`] and the [`BatchBackend`] seam
//! - [`layer`]: the wgpu backend and the [`PointLayer`] that draws committed batches

mod bounds;
mod builder;
pub mod cloud;
pub mod layer;
mod pipeline;
mod renderer;
mod resource;
mod resource_registry;
mod type_map;
mod types;

pub use bounds::SceneBounds;
pub use builder::{BufferBuildError, BufferBuilder, BufferUsage};
pub use cloud::{
    BackendError, Batch, BatchBackend, BatchState, CommitError, CommitReport, PointCloudStore,
    StoreConfig, StoreError,
};
pub use layer::{LayerConfig, LayerError, PointLayer, RenderContext, WgpuBatchBackend};
pub use pipeline::{PipelineBuildError, RenderPipelineBuilder};
pub use renderer::{Renderer, RendererError};
pub use resource::{Handle, ResourceType};
pub use resource_registry::ResourceRegistry;
pub use types::{CameraUniforms, PointVertex};

// Re-export for downstream crates
pub use wgpu;

//! The seam between the store and whatever turns batches into drawable geometry.

use super::error::BackendError;
use crate::PointVertex;

/// Materializes point batches for a renderer.
///
/// The store drives a backend in a fixed order. On a batch's first
/// materialization it calls [`create`](Self::create), then
/// [`attach`](Self::attach) exactly once, then [`upload`](Self::upload). Later
/// commits of the same batch only call `upload` on the existing handle.
/// [`release`](Self::release) runs once per created handle on clear or drop.
pub trait BatchBackend {
    /// Per-batch renderable resource.
    type Handle;
    /// Where attached batches become visible.
    type Scene;

    /// Create the renderable for a batch holding up to `capacity` points.
    fn create(&mut self, capacity: usize) -> Result<Self::Handle, BackendError>;

    /// Make a freshly created batch visible in `scene`.
    fn attach(
        &mut self,
        scene: &mut Self::Scene,
        handle: &mut Self::Handle,
    ) -> Result<(), BackendError>;

    /// Replace the contents of `handle` with `vertices`.
    fn upload(
        &mut self,
        scene: &mut Self::Scene,
        handle: &Self::Handle,
        vertices: &[PointVertex],
    ) -> Result<(), BackendError>;

    /// Detach (when `attached`) and destroy a batch resource.
    fn release(&mut self, scene: &mut Self::Scene, handle: Self::Handle, attached: bool);
}

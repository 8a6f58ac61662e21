//! Fixed-capacity point batches.

use crate::PointVertex;
use std::collections::TryReserveError;

/// Lifecycle of a batch as seen by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// Still accepting points.
    Open { dirty: bool },
    /// Sealed at capacity; only a commit can still touch it.
    Full { dirty: bool },
}

impl BatchState {
    pub fn is_dirty(self) -> bool {
        match self {
            BatchState::Open { dirty } | BatchState::Full { dirty } => dirty,
        }
    }
}

/// A contiguous run of up to `capacity` points plus its backend resource.
///
/// The vertex buffer is reserved at full capacity on allocation and never
/// grows past it.
#[derive(Debug)]
pub struct Batch<H> {
    pub(super) vertices: Vec<PointVertex>,
    capacity: usize,
    dirty: bool,
    pub(super) handle: Option<H>,
    pub(super) attached: bool,
    pub(super) materialized: usize,
}

impl<H> Batch<H> {
    pub(super) fn with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let mut vertices = Vec::new();
        vertices.try_reserve_exact(capacity)?;
        Ok(Self {
            vertices,
            capacity,
            dirty: false,
            handle: None,
            attached: false,
            materialized: 0,
        })
    }

    /// Append points; the caller guarantees they fit.
    pub(super) fn extend(&mut self, vertices: impl IntoIterator<Item = PointVertex>) {
        let before = self.vertices.len();
        self.vertices.extend(vertices);
        debug_assert!(self.vertices.len() <= self.capacity);
        if self.vertices.len() != before {
            self.dirty = true;
        }
    }

    pub(super) fn push(&mut self, vertex: PointVertex) {
        debug_assert!(!self.is_full());
        self.vertices.push(vertex);
        self.dirty = true;
    }

    pub(super) fn mark_clean(&mut self) {
        self.dirty = false;
        self.materialized = self.vertices.len();
    }

    /// Occupied points, in insertion order.
    pub fn vertices(&self) -> &[PointVertex] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free slots left before the batch seals.
    pub fn remaining(&self) -> usize {
        self.capacity - self.vertices.len()
    }

    pub fn is_full(&self) -> bool {
        self.vertices.len() == self.capacity
    }

    /// True when points were added since the last successful commit.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn state(&self) -> BatchState {
        if self.is_full() {
            BatchState::Full { dirty: self.dirty }
        } else {
            BatchState::Open { dirty: self.dirty }
        }
    }

    /// Backend resource, present once the batch has been materialized.
    pub fn handle(&self) -> Option<&H> {
        self.handle.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Points visible to the renderer as of the last successful commit.
    pub fn materialized_len(&self) -> usize {
        self.materialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32) -> PointVertex {
        PointVertex {
            position: [x, 0.0, 0.0],
            color: [1.0, 1.0, 1.0],
        }
    }

    #[test]
    fn test_batch_state_cycle() {
        let mut batch: Batch<()> = Batch::with_capacity(2).unwrap();
        assert_eq!(batch.state(), BatchState::Open { dirty: false });
        assert!(batch.is_empty());

        batch.push(vertex(0.0));
        assert_eq!(batch.state(), BatchState::Open { dirty: true });

        batch.mark_clean();
        assert_eq!(batch.state(), BatchState::Open { dirty: false });
        assert_eq!(batch.materialized_len(), 1);

        batch.push(vertex(1.0));
        assert_eq!(batch.state(), BatchState::Full { dirty: true });
        assert_eq!(batch.remaining(), 0);

        batch.mark_clean();
        assert_eq!(batch.state(), BatchState::Full { dirty: false });
        assert!(!batch.state().is_dirty());
    }

    #[test]
    fn test_batch_reserves_full_capacity() {
        let batch: Batch<()> = Batch::with_capacity(1000).unwrap();
        assert!(batch.vertices.capacity() >= 1000);
        assert_eq!(batch.remaining(), 1000);
    }

    #[test]
    fn test_empty_extend_stays_clean() {
        let mut batch: Batch<()> = Batch::with_capacity(4).unwrap();
        batch.extend(std::iter::empty());
        assert!(!batch.is_dirty());
        batch.extend([vertex(0.0), vertex(1.0)]);
        assert!(batch.is_dirty());
        assert_eq!(batch.len(), 2);
    }
}

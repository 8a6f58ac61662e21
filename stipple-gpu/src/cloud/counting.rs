//! A backend that materializes nothing and only counts calls.
//!
//! Used by the headless driver to time batching without a GPU, and by tests to
//! observe exactly which backend calls a commit makes.

use super::backend::BatchBackend;
use super::error::BackendError;
use crate::PointVertex;
use std::collections::BTreeMap;

/// Cumulative backend calls.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BackendStats {
    pub created: usize,
    pub attached: usize,
    pub uploads: usize,
    pub uploaded_points: usize,
    pub released: usize,
}

/// Handle issued by [`CountingBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountedBatch {
    pub id: u64,
    pub capacity: usize,
}

/// Scene of a [`CountingBackend`]: visible point count per attached batch.
#[derive(Debug, Default, Clone)]
pub struct CountingScene {
    visible: BTreeMap<u64, usize>,
}

impl CountingScene {
    pub fn visible_batches(&self) -> usize {
        self.visible.len()
    }

    pub fn visible_points(&self) -> usize {
        self.visible.values().sum()
    }
}

#[derive(Debug, Default)]
pub struct CountingBackend {
    stats: BackendStats,
    next_id: u64,
}

impl CountingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> BackendStats {
        self.stats
    }
}

impl BatchBackend for CountingBackend {
    type Handle = CountedBatch;
    type Scene = CountingScene;

    fn create(&mut self, capacity: usize) -> Result<CountedBatch, BackendError> {
        self.next_id += 1;
        self.stats.created += 1;
        Ok(CountedBatch {
            id: self.next_id,
            capacity,
        })
    }

    fn attach(
        &mut self,
        scene: &mut CountingScene,
        handle: &mut CountedBatch,
    ) -> Result<(), BackendError> {
        self.stats.attached += 1;
        scene.visible.insert(handle.id, 0);
        Ok(())
    }

    fn upload(
        &mut self,
        scene: &mut CountingScene,
        handle: &CountedBatch,
        vertices: &[PointVertex],
    ) -> Result<(), BackendError> {
        if vertices.len() > handle.capacity {
            return Err(BackendError::Overflow {
                len: vertices.len(),
                capacity: handle.capacity,
            });
        }
        let visible = scene
            .visible
            .get_mut(&handle.id)
            .ok_or(BackendError::MissingResource("attached batch"))?;
        *visible = vertices.len();
        self.stats.uploads += 1;
        self.stats.uploaded_points += vertices.len();
        Ok(())
    }

    fn release(&mut self, scene: &mut CountingScene, handle: CountedBatch, attached: bool) {
        if attached {
            scene.visible.remove(&handle.id);
        }
        self.stats.released += 1;
    }
}

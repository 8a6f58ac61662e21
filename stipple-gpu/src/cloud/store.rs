//! Batched point cloud storage with explicit commit.

use super::backend::BatchBackend;
use super::batch::Batch;
use super::error::{BackendError, CommitError, StoreError};
use crate::PointVertex;
use stipple_data::Point;
use tracing::{debug, info, warn};

/// Points per batch unless configured otherwise.
pub const DEFAULT_BATCH_CAPACITY: usize = 1000;

/// Store configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Points per batch.
    pub batch_capacity: usize,
    /// Upper bound on allocated batches; `None` is unbounded.
    pub max_batches: Option<usize>,
}

impl StoreConfig {
    pub fn with_batch_capacity(mut self, capacity: usize) -> Self {
        self.batch_capacity = capacity;
        self
    }

    pub fn with_max_batches(mut self, max_batches: usize) -> Self {
        self.max_batches = Some(max_batches);
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            batch_capacity: DEFAULT_BATCH_CAPACITY,
            max_batches: None,
        }
    }
}

/// Outcome of a successful [`PointCloudStore::commit`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CommitReport {
    /// Batches uploaded by this commit.
    pub batches: usize,
    /// Points contained in those batches.
    pub points: usize,
}

/// Owns a growing point cloud split into fixed-capacity batches.
///
/// Adds only touch CPU memory. Nothing reaches the backend until
/// [`commit`](Self::commit), which uploads each dirty batch and skips the rest.
/// Every batch but the last is full; the last one, when not full, is the
/// current batch receiving new points.
pub struct PointCloudStore<B: BatchBackend> {
    config: StoreConfig,
    backend: B,
    scene: B::Scene,
    batches: Vec<Batch<B::Handle>>,
    point_count: usize,
}

impl<B: BatchBackend> PointCloudStore<B> {
    /// Create an empty store rendering through `backend` into `scene`.
    pub fn new(config: StoreConfig, backend: B, scene: B::Scene) -> Result<Self, StoreError> {
        if config.batch_capacity == 0 {
            return Err(StoreError::ZeroCapacity);
        }
        Ok(Self {
            config,
            backend,
            scene,
            batches: Vec::new(),
            point_count: 0,
        })
    }

    /// Append one point.
    pub fn add_point(&mut self, point: Point) -> Result<(), StoreError> {
        let index = match self.current_index() {
            Some(index) => index,
            None => self.push_batch()?,
        };
        self.batches[index].push(PointVertex::from(point));
        self.point_count += 1;
        Ok(())
    }

    /// Append one point given as flat components.
    pub fn add_point_components(
        &mut self,
        x: f32,
        y: f32,
        z: f32,
        r: f32,
        g: f32,
        b: f32,
    ) -> Result<(), StoreError> {
        self.add_point(Point::from_components(x, y, z, r, g, b))
    }

    /// Append the first `count` points of `points`.
    ///
    /// Produces the same batches as `count` calls to [`add_point`](Self::add_point).
    /// Every batch the call needs is allocated before any point is written, so
    /// on error the store is unchanged.
    pub fn add_points(&mut self, points: &[Point], count: usize) -> Result<(), StoreError> {
        if count == 0 {
            return Ok(());
        }
        let points = points.get(..count).ok_or(StoreError::InvalidArgument {
            count,
            available: points.len(),
        })?;

        let capacity = self.config.batch_capacity;
        let current = self.current_index();
        let fits = current.map_or(0, |index| self.batches[index].remaining().min(count));
        let (head, tail) = points.split_at(fits);

        let fresh = self.allocate_batches(tail.len().div_ceil(capacity))?;

        if let Some(index) = current {
            self.batches[index].extend(head.iter().map(PointVertex::from));
        }
        for (mut batch, chunk) in fresh.into_iter().zip(tail.chunks(capacity)) {
            batch.extend(chunk.iter().map(PointVertex::from));
            self.batches.push(batch);
        }
        self.point_count += count;
        Ok(())
    }

    /// Release every batch and return to the freshly constructed state.
    pub fn clear(&mut self) {
        let released = self.batches.len();
        self.release_all();
        self.point_count = 0;
        debug!(released, "Cleared point cloud");
    }

    /// Upload every dirty batch to the backend.
    ///
    /// Stops at the first backend error. Batches before the failing one keep
    /// their new contents; the failing batch stays dirty so the next commit
    /// retries it.
    #[tracing::instrument(level = "debug", skip_all, fields(batches = self.batches.len()))]
    pub fn commit(&mut self) -> Result<CommitReport, CommitError> {
        let mut report = CommitReport::default();

        for (index, batch) in self.batches.iter_mut().enumerate() {
            if !batch.is_dirty() {
                continue;
            }
            if let Err(source) = materialize(&mut self.backend, &mut self.scene, batch) {
                warn!("Batch {} failed to materialize: {}", index, source);
                return Err(CommitError {
                    batch: index,
                    source,
                });
            }
            report.batches += 1;
            report.points += batch.len();
        }

        if report.batches > 0 {
            info!(
                "Committed {} batches ({} points)",
                report.batches, report.points
            );
        }
        Ok(report)
    }

    /// Total points added, including ones not yet committed.
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    pub fn is_empty(&self) -> bool {
        self.point_count == 0
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    pub fn batches(&self) -> impl ExactSizeIterator<Item = &Batch<B::Handle>> {
        self.batches.iter()
    }

    pub fn capacity(&self) -> usize {
        self.config.batch_capacity
    }

    /// True when some batch holds points the renderer has not seen.
    pub fn has_pending(&self) -> bool {
        self.batches.iter().any(Batch::is_dirty)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn scene(&self) -> &B::Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut B::Scene {
        &mut self.scene
    }

    fn current_index(&self) -> Option<usize> {
        match self.batches.last() {
            Some(batch) if !batch.is_full() => Some(self.batches.len() - 1),
            _ => None,
        }
    }

    fn push_batch(&mut self) -> Result<usize, StoreError> {
        let mut fresh = self.allocate_batches(1)?;
        self.batches.append(&mut fresh);
        Ok(self.batches.len() - 1)
    }

    /// Allocate `count` empty batches and reserve room for them in the store.
    fn allocate_batches(&mut self, count: usize) -> Result<Vec<Batch<B::Handle>>, StoreError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let failure = StoreError::AllocationFailure { requested: count };

        if let Some(max) = self.config.max_batches {
            if self.batches.len() + count > max {
                warn!(
                    "Batch budget exhausted: {} allocated, {} requested, max {}",
                    self.batches.len(),
                    count,
                    max
                );
                return Err(failure);
            }
        }

        self.batches.try_reserve(count).map_err(|_| failure.clone())?;
        let mut fresh = Vec::new();
        fresh.try_reserve_exact(count).map_err(|_| failure.clone())?;
        for _ in 0..count {
            let batch = Batch::with_capacity(self.config.batch_capacity)
                .map_err(|_| failure.clone())?;
            fresh.push(batch);
        }

        debug!(
            "Allocated {} batches of {} points",
            count, self.config.batch_capacity
        );
        Ok(fresh)
    }

    fn release_all(&mut self) {
        for batch in self.batches.drain(..).rev() {
            if let Some(handle) = batch.handle {
                self.backend.release(&mut self.scene, handle, batch.attached);
            }
        }
    }
}

impl<B: BatchBackend> Drop for PointCloudStore<B> {
    fn drop(&mut self) {
        self.release_all();
    }
}

/// Create, attach and upload as needed to bring one batch up to date.
fn materialize<B: BatchBackend>(
    backend: &mut B,
    scene: &mut B::Scene,
    batch: &mut Batch<B::Handle>,
) -> Result<(), BackendError> {
    let capacity = batch.capacity();
    let handle = match batch.handle {
        Some(ref mut handle) => handle,
        None => batch.handle.insert(backend.create(capacity)?),
    };
    if !batch.attached {
        backend.attach(scene, handle)?;
        batch.attached = true;
    }
    backend.upload(scene, handle, &batch.vertices)?;
    batch.mark_clean();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::{BackendStats, BatchState, CountedBatch, CountingBackend, CountingScene};
    use glam::Vec3;

    type TestStore = PointCloudStore<CountingBackend>;

    fn store(capacity: usize) -> TestStore {
        PointCloudStore::new(
            StoreConfig::default().with_batch_capacity(capacity),
            CountingBackend::new(),
            CountingScene::default(),
        )
        .unwrap()
    }

    fn point(i: usize) -> Point {
        Point::from_components(i as f32, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    fn occupancies<B: BatchBackend>(store: &PointCloudStore<B>) -> Vec<usize> {
        store.batches().map(Batch::len).collect()
    }

    /// Counting backend that rejects uploads for chosen handle ids.
    #[derive(Default)]
    struct FlakyBackend {
        inner: CountingBackend,
        reject: Vec<u64>,
        reject_attach: bool,
    }

    impl BatchBackend for FlakyBackend {
        type Handle = CountedBatch;
        type Scene = CountingScene;

        fn create(&mut self, capacity: usize) -> Result<CountedBatch, BackendError> {
            self.inner.create(capacity)
        }

        fn attach(
            &mut self,
            scene: &mut CountingScene,
            handle: &mut CountedBatch,
        ) -> Result<(), BackendError> {
            if self.reject_attach {
                return Err(BackendError::Attach("scene unavailable".into()));
            }
            self.inner.attach(scene, handle)
        }

        fn upload(
            &mut self,
            scene: &mut CountingScene,
            handle: &CountedBatch,
            vertices: &[PointVertex],
        ) -> Result<(), BackendError> {
            if self.reject.contains(&handle.id) {
                return Err(BackendError::Upload("rejected".into()));
            }
            self.inner.upload(scene, handle, vertices)
        }

        fn release(&mut self, scene: &mut CountingScene, handle: CountedBatch, attached: bool) {
            self.inner.release(scene, handle, attached)
        }
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = PointCloudStore::new(
            StoreConfig::default().with_batch_capacity(0),
            CountingBackend::new(),
            CountingScene::default(),
        );
        assert!(matches!(result, Err(StoreError::ZeroCapacity)));
    }

    #[test]
    fn test_single_adds_fill_batches_in_order() {
        let mut store = store(1000);
        for i in 0..2500 {
            store.add_point(point(i)).unwrap();
        }
        assert_eq!(store.point_count(), 2500);
        assert_eq!(occupancies(&store), vec![1000, 1000, 500]);
    }

    #[test]
    fn test_batch_count_is_ceiling() {
        for n in [1usize, 6, 7, 13, 14, 15] {
            let mut store = store(7);
            for i in 0..n {
                store.add_point(point(i)).unwrap();
            }
            assert_eq!(store.point_count(), n);
            assert_eq!(store.batch_count(), n.div_ceil(7), "n = {}", n);
            let sizes = occupancies(&store);
            let (last, rest) = sizes.split_last().unwrap();
            assert!(rest.iter().all(|&len| len == 7));
            assert!(*last >= 1 && *last <= 7);
        }
    }

    #[test]
    fn test_exact_fill_allocates_lazily() {
        let mut store = store(4);
        let points: Vec<Point> = (0..8).map(point).collect();
        store.add_points(&points, 8).unwrap();
        assert_eq!(occupancies(&store), vec![4, 4]);

        store.add_point(point(8)).unwrap();
        assert_eq!(occupancies(&store), vec![4, 4, 1]);
    }

    #[test]
    fn test_add_points_matches_sequential_adds() {
        let points: Vec<Point> = (0..23).map(point).collect();

        for prefix in [0usize, 1, 3, 5] {
            for count in [0usize, 1, 2, 5, 10, 18] {
                let mut bulk = store(5);
                let mut single = store(5);
                for p in &points[..prefix] {
                    bulk.add_point(*p).unwrap();
                    single.add_point(*p).unwrap();
                }

                let batch = &points[prefix..prefix + count];
                bulk.add_points(batch, count).unwrap();
                for p in batch {
                    single.add_point(*p).unwrap();
                }

                assert_eq!(bulk.point_count(), single.point_count());
                assert_eq!(occupancies(&bulk), occupancies(&single));
                let bulk_vertices: Vec<_> =
                    bulk.batches().flat_map(|b| b.vertices().to_vec()).collect();
                let single_vertices: Vec<_> =
                    single.batches().flat_map(|b| b.vertices().to_vec()).collect();
                assert_eq!(bulk_vertices, single_vertices);
            }
        }
    }

    #[test]
    fn test_add_points_uses_prefix_only() {
        let mut store = store(10);
        let points: Vec<Point> = (0..6).map(point).collect();
        store.add_points(&points, 4).unwrap();
        assert_eq!(store.point_count(), 4);
        assert_eq!(store.batches().next().unwrap().vertices()[3].position[0], 3.0);
    }

    #[test]
    fn test_add_points_argument_checks() {
        let mut store = store(10);
        store.add_points(&[], 0).unwrap();
        assert_eq!(store.batch_count(), 0);

        let err = store.add_points(&[], 5).unwrap_err();
        assert_eq!(
            err,
            StoreError::InvalidArgument {
                count: 5,
                available: 0
            }
        );
        assert_eq!(store.point_count(), 0);
        assert_eq!(store.batch_count(), 0);
    }

    #[test]
    fn test_short_slice_leaves_open_batch_untouched() {
        let mut store = store(3);
        for i in 0..4 {
            store.add_point(point(i)).unwrap();
        }
        store.commit().unwrap();
        assert_eq!(occupancies(&store), vec![3, 1]);
        assert!(!store.has_pending());

        let four: Vec<Point> = (10..14).map(point).collect();
        assert_eq!(
            store.add_points(&four, 5),
            Err(StoreError::InvalidArgument {
                count: 5,
                available: 4
            })
        );
        assert_eq!(occupancies(&store), vec![3, 1]);
        assert_eq!(store.point_count(), 4);
        assert!(!store.has_pending());
        let open = store.batches().last().unwrap();
        assert_eq!(open.vertices()[0].position[0], 3.0);
        assert_eq!(open.state(), BatchState::Open { dirty: false });

        // Same check with the open batch still dirty
        store.add_point(point(4)).unwrap();
        assert!(store.has_pending());
        assert!(store.add_points(&four, 5).is_err());
        assert_eq!(occupancies(&store), vec![3, 2]);
        assert!(store.has_pending());
    }

    #[test]
    fn test_colors_pass_through_unclamped() {
        let mut store = store(10);
        store
            .add_point_components(0.0, 0.0, 0.0, 4.0, -2.0, 0.5)
            .unwrap();
        let vertex = store.batches().next().unwrap().vertices()[0];
        assert_eq!(vertex.color, [4.0, -2.0, 0.5]);
    }

    #[test]
    fn test_adds_are_invisible_until_commit() {
        let mut store = store(4);
        store.add_point(point(0)).unwrap();
        assert_eq!(store.point_count(), 1);
        assert!(store.has_pending());
        assert_eq!(store.backend().stats(), BackendStats::default());
        assert_eq!(store.scene().visible_points(), 0);

        let report = store.commit().unwrap();
        assert_eq!(report, CommitReport { batches: 1, points: 1 });
        assert_eq!(store.scene().visible_points(), 1);
        assert!(!store.has_pending());
    }

    #[test]
    fn test_second_commit_is_noop() {
        let mut store = store(3);
        for i in 0..10 {
            store.add_point(point(i)).unwrap();
        }
        store.commit().unwrap();
        let after_first = store.backend().stats();
        assert_eq!(after_first.created, 4);
        assert_eq!(after_first.uploads, 4);

        let report = store.commit().unwrap();
        assert_eq!(report, CommitReport::default());
        assert_eq!(store.backend().stats(), after_first);
    }

    #[test]
    fn test_open_batch_is_updated_in_place() {
        let mut store = store(4);
        store.add_point(point(0)).unwrap();
        store.commit().unwrap();
        assert_eq!(
            store.batches().next().unwrap().state(),
            BatchState::Open { dirty: false }
        );

        store.add_point(point(1)).unwrap();
        store.add_point(point(2)).unwrap();
        store.add_point(point(3)).unwrap();
        assert_eq!(
            store.batches().next().unwrap().state(),
            BatchState::Full { dirty: true }
        );

        let report = store.commit().unwrap();
        assert_eq!(report, CommitReport { batches: 1, points: 4 });

        let stats = store.backend().stats();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.attached, 1);
        assert_eq!(stats.uploads, 2);
        assert_eq!(store.scene().visible_points(), 4);
        assert_eq!(store.batches().next().unwrap().materialized_len(), 4);
    }

    #[test]
    fn test_only_dirty_batches_are_uploaded() {
        let mut store = store(2);
        for i in 0..5 {
            store.add_point(point(i)).unwrap();
        }
        store.commit().unwrap();

        store.add_point(point(5)).unwrap();
        let report = store.commit().unwrap();
        assert_eq!(report, CommitReport { batches: 1, points: 2 });
        assert_eq!(store.backend().stats().uploads, 4);
    }

    #[test]
    fn test_clear_resets_and_releases() {
        let mut store = store(3);
        for i in 0..7 {
            store.add_point(point(i)).unwrap();
        }
        store.commit().unwrap();
        store.add_point(point(7)).unwrap();

        store.clear();
        assert_eq!(store.point_count(), 0);
        assert!(store.is_empty());
        assert_eq!(store.batch_count(), 0);
        assert_eq!(store.backend().stats().released, 3);
        assert_eq!(store.scene().visible_batches(), 0);

        let uploads = store.backend().stats().uploads;
        assert_eq!(store.commit().unwrap(), CommitReport::default());
        assert_eq!(store.backend().stats().uploads, uploads);

        store.add_point(point(0)).unwrap();
        assert_eq!(occupancies(&store), vec![1]);
    }

    #[test]
    fn test_clear_before_any_commit() {
        let mut store = store(3);
        store.add_point(point(0)).unwrap();
        store.clear();
        assert_eq!(store.backend().stats().released, 0);
        assert_eq!(store.point_count(), 0);
    }

    #[test]
    fn test_commit_fails_fast_and_retries() {
        let mut store = PointCloudStore::new(
            StoreConfig::default().with_batch_capacity(2),
            FlakyBackend {
                reject: vec![2],
                ..Default::default()
            },
            CountingScene::default(),
        )
        .unwrap();
        for i in 0..6 {
            store.add_point(point(i)).unwrap();
        }

        let err = store.commit().unwrap_err();
        assert_eq!(err.batch, 1);
        assert!(matches!(err.source, BackendError::Upload(_)));

        let dirty: Vec<bool> = store.batches().map(Batch::is_dirty).collect();
        assert_eq!(dirty, vec![false, true, true]);
        // Third batch was never reached
        assert!(store.batches().nth(2).unwrap().handle().is_none());
        assert_eq!(store.backend().inner.stats().uploads, 1);

        store.backend_mut().reject.clear();
        let report = store.commit().unwrap();
        assert_eq!(report, CommitReport { batches: 2, points: 4 });

        let stats = store.backend().inner.stats();
        assert_eq!(stats.created, 3);
        assert_eq!(stats.attached, 3);
        assert_eq!(store.scene().visible_points(), 6);
    }

    #[test]
    fn test_attach_failure_keeps_handle() {
        let mut store = PointCloudStore::new(
            StoreConfig::default().with_batch_capacity(2),
            FlakyBackend {
                reject_attach: true,
                ..Default::default()
            },
            CountingScene::default(),
        )
        .unwrap();
        store.add_point(point(0)).unwrap();

        let err = store.commit().unwrap_err();
        assert!(matches!(err.source, BackendError::Attach(_)));
        let batch = store.batches().next().unwrap();
        assert!(batch.handle().is_some());
        assert!(!batch.is_attached());
        assert!(batch.is_dirty());

        store.backend_mut().reject_attach = false;
        store.commit().unwrap();
        assert_eq!(store.backend().inner.stats().created, 1);
        assert_eq!(store.backend().inner.stats().attached, 1);
    }

    #[test]
    fn test_batch_budget_failure_leaves_store_unchanged() {
        let mut store = PointCloudStore::new(
            StoreConfig::default()
                .with_batch_capacity(4)
                .with_max_batches(2),
            CountingBackend::new(),
            CountingScene::default(),
        )
        .unwrap();
        let points: Vec<Point> = (0..12).map(point).collect();

        store.add_points(&points, 6).unwrap();
        assert_eq!(occupancies(&store), vec![4, 2]);

        // Needs a third batch; nothing may be written, not even into the open one
        let err = store.add_points(&points, 5).unwrap_err();
        assert_eq!(err, StoreError::AllocationFailure { requested: 1 });
        assert_eq!(occupancies(&store), vec![4, 2]);
        assert_eq!(store.point_count(), 6);

        store.add_point(point(6)).unwrap();
        store.add_point(point(7)).unwrap();
        assert_eq!(
            store.add_point(point(8)),
            Err(StoreError::AllocationFailure { requested: 1 })
        );
        assert_eq!(store.point_count(), 8);
    }

    #[test]
    fn test_drop_releases_batches() {
        use std::cell::Cell;
        use std::rc::Rc;

        struct ProbeBackend {
            inner: CountingBackend,
            released: Rc<Cell<usize>>,
        }

        impl BatchBackend for ProbeBackend {
            type Handle = CountedBatch;
            type Scene = CountingScene;

            fn create(&mut self, capacity: usize) -> Result<CountedBatch, BackendError> {
                self.inner.create(capacity)
            }

            fn attach(
                &mut self,
                scene: &mut CountingScene,
                handle: &mut CountedBatch,
            ) -> Result<(), BackendError> {
                self.inner.attach(scene, handle)
            }

            fn upload(
                &mut self,
                scene: &mut CountingScene,
                handle: &CountedBatch,
                vertices: &[PointVertex],
            ) -> Result<(), BackendError> {
                self.inner.upload(scene, handle, vertices)
            }

            fn release(&mut self, scene: &mut CountingScene, handle: CountedBatch, attached: bool) {
                self.released.set(self.released.get() + 1);
                self.inner.release(scene, handle, attached)
            }
        }

        let released = Rc::new(Cell::new(0));
        let mut store = PointCloudStore::new(
            StoreConfig::default().with_batch_capacity(2),
            ProbeBackend {
                inner: CountingBackend::new(),
                released: Rc::clone(&released),
            },
            CountingScene::default(),
        )
        .unwrap();
        for i in 0..5 {
            store.add_point(point(i)).unwrap();
        }
        store.commit().unwrap();
        // Never committed, so never created
        store.add_point(point(5)).unwrap();
        store.add_point(point(6)).unwrap();

        drop(store);
        assert_eq!(released.get(), 3);
    }

    #[test]
    fn test_positions_survive_batching() {
        let mut store = store(3);
        for i in 0..5 {
            store
                .add_point(Point::new(Vec3::new(i as f32, 1.0, 2.0), Vec3::ONE))
                .unwrap();
        }
        let xs: Vec<f32> = store
            .batches()
            .flat_map(|b| b.vertices().iter().map(|v| v.position[0]))
            .collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }
}

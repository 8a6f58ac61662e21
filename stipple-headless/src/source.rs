//! Where the driver's points come from and how they are fed into the store.

use crate::config::Args;
use glam::Vec3;
use stipple_data::{GridSpec, PlyError, Point, load_points_from_ply};
use stipple_gpu::{BatchBackend, PointCloudStore, SceneBounds, StoreError};
use tracing::info;

/// How points are handed to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    /// One `add_point` call per point.
    Single,
    /// `add_points` calls of up to `chunk` points.
    Bulk { chunk: usize },
}

impl FeedMode {
    pub fn from_args(args: &Args) -> Self {
        match args.bulk {
            Some(chunk) if chunk > 0 => FeedMode::Bulk { chunk },
            _ => FeedMode::Single,
        }
    }
}

pub enum PointSource {
    Grid(GridSpec),
    Points(Vec<Point>),
}

impl PointSource {
    pub fn from_args(args: &Args) -> Result<Self, PlyError> {
        match &args.file {
            Some(path) => {
                let points = load_points_from_ply(path)?;
                info!("Loaded {} points from {}", points.len(), path.display());
                Ok(PointSource::Points(points))
            }
            None => Ok(PointSource::Grid(
                GridSpec::square(args.grid).with_layers(args.layers),
            )),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PointSource::Grid(spec) => spec.len(),
            PointSource::Points(points) => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bounds(&self) -> SceneBounds {
        match self {
            PointSource::Grid(spec) if !spec.is_empty() => {
                let (min, max) = spec.bounds();
                SceneBounds::from_min_max(min, max)
            }
            PointSource::Grid(_) => SceneBounds::from_positions(std::iter::empty::<Vec3>()),
            PointSource::Points(points) => {
                SceneBounds::from_positions(points.iter().map(|point| point.position))
            }
        }
    }

    /// Add every point to `store`, returning how many were added.
    pub fn feed<B: BatchBackend>(
        &self,
        store: &mut PointCloudStore<B>,
        mode: FeedMode,
    ) -> Result<usize, StoreError> {
        match (self, mode) {
            (PointSource::Grid(spec), FeedMode::Single) => {
                for point in spec.points() {
                    store.add_point(point)?;
                }
            }
            (PointSource::Grid(spec), FeedMode::Bulk { chunk }) => {
                let mut points = spec.points();
                let mut buffer = Vec::with_capacity(chunk.min(spec.len()));
                loop {
                    buffer.clear();
                    buffer.extend(points.by_ref().take(chunk));
                    if buffer.is_empty() {
                        break;
                    }
                    store.add_points(&buffer, buffer.len())?;
                }
            }
            (PointSource::Points(points), FeedMode::Single) => {
                for point in points {
                    store.add_point(*point)?;
                }
            }
            (PointSource::Points(points), FeedMode::Bulk { chunk }) => {
                for slice in points.chunks(chunk) {
                    store.add_points(slice, slice.len())?;
                }
            }
        }
        Ok(self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use stipple_gpu::StoreConfig;
    use stipple_gpu::cloud::{CountingBackend, CountingScene};

    fn store(capacity: usize) -> PointCloudStore<CountingBackend> {
        PointCloudStore::new(
            StoreConfig::default().with_batch_capacity(capacity),
            CountingBackend::new(),
            CountingScene::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_grid_source_from_args() {
        let args = Args::parse_from(["stipple-headless", "--grid", "40", "--layers", "3"]);
        let source = PointSource::from_args(&args).unwrap();
        assert_eq!(source.len(), 4800);
        assert_eq!(FeedMode::from_args(&args), FeedMode::Single);
    }

    #[test]
    fn test_zero_bulk_falls_back_to_single() {
        let args = Args::parse_from(["stipple-headless", "--bulk", "0"]);
        assert_eq!(FeedMode::from_args(&args), FeedMode::Single);
    }

    #[test]
    fn test_missing_ply_is_reported() {
        let args = Args::parse_from(["stipple-headless", "--file", "/nonexistent/cloud.ply"]);
        assert!(PointSource::from_args(&args).is_err());
    }

    #[test]
    fn test_bulk_and_single_feeds_agree() {
        let source = PointSource::Grid(GridSpec::square(30).with_layers(2));

        let mut single = store(128);
        assert_eq!(source.feed(&mut single, FeedMode::Single).unwrap(), 1800);

        let mut bulk = store(128);
        source.feed(&mut bulk, FeedMode::Bulk { chunk: 500 }).unwrap();

        assert_eq!(bulk.point_count(), 1800);
        assert_eq!(bulk.batch_count(), single.batch_count());
        for (a, b) in bulk.batches().zip(single.batches()) {
            assert_eq!(a.vertices(), b.vertices());
        }
    }

    #[test]
    fn test_point_list_feed_and_bounds() {
        let points = vec![
            Point::white(Vec3::new(-1.0, 0.0, 0.0)),
            Point::white(Vec3::new(3.0, 2.0, 1.0)),
            Point::white(Vec3::new(0.0, 4.0, -1.0)),
        ];
        let source = PointSource::Points(points);
        let bounds = source.bounds();
        assert_eq!(bounds.min, Vec3::new(-1.0, 0.0, -1.0));
        assert_eq!(bounds.max, Vec3::new(3.0, 4.0, 1.0));

        let mut store = store(2);
        source.feed(&mut store, FeedMode::Bulk { chunk: 2 }).unwrap();
        let sizes: Vec<usize> = store.batches().map(|batch| batch.len()).collect();
        assert_eq!(sizes, vec![2, 1]);
    }

    #[test]
    fn test_empty_grid_bounds() {
        let source = PointSource::Grid(GridSpec::square(0));
        assert!(source.is_empty());
        assert_eq!(source.bounds().radius, 1.0);
    }
}

//! Synthetic grid point generation.
//!
//! Produces the striped test grid the reference driver feeds into the store:
//! rows along y, columns along x, and rows colored red, green, blue in turn.
//! Stacking several layers along z scales the grid to arbitrary totals.

use crate::Point;
use glam::Vec3;

/// Shape of a generated grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    /// Points per row and per column. Rows and columns run over
    /// `-(side / 2)..side - side / 2`.
    pub side: u32,
    /// Number of grids stacked along z.
    pub layers: u32,
    /// Distance between stacked layers.
    pub layer_spacing: f32,
}

impl GridSpec {
    /// Single-layer square grid with `side` points per row and column.
    pub fn square(side: u32) -> Self {
        Self {
            side,
            layers: 1,
            layer_spacing: 1.0,
        }
    }

    pub fn with_layers(mut self, layers: u32) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_layer_spacing(mut self, spacing: f32) -> Self {
        self.layer_spacing = spacing;
        self
    }

    /// Points per row (and per column).
    pub fn side(&self) -> usize {
        self.side as usize
    }

    /// Coordinate of the first row and column.
    fn origin(&self) -> i64 {
        -i64::from(self.side / 2)
    }

    /// Total number of points the grid yields.
    pub fn len(&self) -> usize {
        self.side() * self.side() * self.layers as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Axis-aligned bounds of the generated positions as `(min, max)`.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let first = self.origin() as f32;
        let last = (self.origin() + i64::from(self.side) - 1) as f32;
        let top = self.layers.saturating_sub(1) as f32 * self.layer_spacing;
        (Vec3::new(first, first, 0.0), Vec3::new(last, last, top))
    }

    /// Iterate the grid points in row-major order, layer by layer.
    pub fn points(&self) -> GridPoints {
        GridPoints {
            spec: *self,
            index: 0,
            total: self.len(),
        }
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self::square(1000)
    }
}

/// Row color: red, green, blue cycling on `|row| % 3`.
fn row_color(row: i64) -> Vec3 {
    match row.unsigned_abs() % 3 {
        0 => Vec3::X,
        1 => Vec3::Y,
        _ => Vec3::Z,
    }
}

/// Iterator over the points of a [`GridSpec`].
#[derive(Debug, Clone)]
pub struct GridPoints {
    spec: GridSpec,
    index: usize,
    total: usize,
}

impl Iterator for GridPoints {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        if self.index >= self.total {
            return None;
        }

        let side = self.spec.side();
        let per_layer = side * side;
        let layer = self.index / per_layer;
        let within = self.index % per_layer;
        let row = (within / side) as i64 + self.spec.origin();
        let column = (within % side) as i64 + self.spec.origin();
        self.index += 1;

        Some(Point::new(
            Vec3::new(
                column as f32,
                row as f32,
                layer as f32 * self.spec.layer_spacing,
            ),
            row_color(row),
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridPoints {}

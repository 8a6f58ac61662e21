//! Stipple Data Crate
//!
//! CPU-side point data: the colored [`Point`] type, the grid generator used by
//! the reference driver, and PLY point loading.
//! This crate is GPU-agnostic; the renderer-native vertex layout lives in stipple-gpu.

pub mod grid;
pub mod ply;
pub mod types;

pub use grid::{GridPoints, GridSpec};
pub use ply::{PlyError, load_points_from_ply};
pub use types::Point;

//! PLY point loading

mod loader;

pub use loader::{PlyError, load_points_from_ply};

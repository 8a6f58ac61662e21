//! PLY file loading functions

use crate::Point;
use glam::Vec3;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

/// Color used when a vertex carries no color properties.
const DEFAULT_COLOR: Vec3 = Vec3::splat(0.8);

#[derive(Debug, thiserror::Error)]
pub enum PlyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PLY parsing error: {0}")]
    Parse(String),
    #[error("Missing '{property}' at vertex {index}")]
    MissingProperty { property: &'static str, index: usize },
}

// Only the vertex element matters for point clouds
#[derive(Deserialize, Debug)]
struct PlyFile {
    #[serde(rename = "vertex")]
    vertex: Vec<HashMap<String, JsonValue>>,
}

/// Load colored points from a PLY file.
///
/// Positions come from `x`/`y`/`z`; colors from `red`/`green`/`blue` or
/// `r`/`g`/`b` as 8-bit channels.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_points_from_ply(path: impl AsRef<Path>) -> Result<Vec<Point>, PlyError> {
    debug!("Loading PLY points");
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);

    let ply_data: PlyFile = serde_ply::from_reader(reader).map_err(|e| {
        warn!("Failed to parse PLY file: {}", e);
        PlyError::Parse(e.to_string())
    })?;

    let mut unreadable = 0;
    let points = ply_data
        .vertex
        .iter()
        .enumerate()
        .map(|(index, vertex)| point_from_properties(index, vertex, &mut unreadable))
        .collect::<Result<Vec<_>, _>>()?;

    if unreadable > 0 {
        warn!(
            "{} vertices carry color properties that are not 8-bit channels; using default color",
            unreadable
        );
    }

    info!("PLY file parsed: {} points", points.len());
    Ok(points)
}

fn get_f32(prop: Option<&JsonValue>) -> Option<f32> {
    prop.and_then(|v| match v {
        JsonValue::Number(n) => n.as_f64().map(|f| f as f32),
        _ => None,
    })
}

fn get_u8(prop: Option<&JsonValue>) -> Option<u8> {
    prop.and_then(|v| match v {
        JsonValue::Number(n) => n.as_u64().and_then(|u| u8::try_from(u).ok()),
        _ => None,
    })
}

const COLOR_NAMES: [[&str; 3]; 2] = [["red", "green", "blue"], ["r", "g", "b"]];

fn get_color(vertex: &HashMap<String, JsonValue>, names: [&str; 3]) -> Option<Vec3> {
    let [r, g, b] = names.map(|name| get_u8(vertex.get(name)));
    Some(Vec3::new(r? as f32, g? as f32, b? as f32) / 255.0)
}

fn has_color_properties(vertex: &HashMap<String, JsonValue>) -> bool {
    COLOR_NAMES
        .iter()
        .flatten()
        .any(|name| vertex.contains_key(*name))
}

/// Build a point from one vertex. Vertices whose color properties exist but
/// are not 8-bit channels get the default color and bump `unreadable`.
fn point_from_properties(
    index: usize,
    vertex: &HashMap<String, JsonValue>,
    unreadable: &mut usize,
) -> Result<Point, PlyError> {
    let coord = |property: &'static str| {
        get_f32(vertex.get(property)).ok_or(PlyError::MissingProperty { property, index })
    };
    let position = Vec3::new(coord("x")?, coord("y")?, coord("z")?);

    let color = match COLOR_NAMES.iter().find_map(|names| get_color(vertex, *names)) {
        Some(color) => color,
        None => {
            if has_color_properties(vertex) {
                *unreadable += 1;
            }
            DEFAULT_COLOR
        }
    };

    Ok(Point::new(position, color))
}

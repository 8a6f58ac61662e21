use glam::{Mat4, Vec3};
use stipple_gpu::{CameraUniforms, SceneBounds};

const MARGIN: f32 = 1.05;

/// Orthographic camera looking down -Z at the whole of `bounds`.
pub fn framing(bounds: &SceneBounds, aspect: f32) -> CameraUniforms {
    let extent = bounds.extent();
    let aspect = if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    };

    // Fit the larger of the two screen axes
    let half_height = (extent.y * 0.5).max(extent.x * 0.5 / aspect).max(0.5) * MARGIN;
    let half_width = half_height * aspect;

    let depth = extent.z.max(1.0);
    let eye = Vec3::new(bounds.center.x, bounds.center.y, bounds.max.z + depth);
    let view = Mat4::look_at_rh(eye, bounds.center, Vec3::Y);
    let proj = Mat4::orthographic_rh(
        -half_width,
        half_width,
        -half_height,
        half_height,
        0.0,
        eye.z - bounds.min.z + depth,
    );

    CameraUniforms::from_matrices(view, proj, eye)
}

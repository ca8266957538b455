//! Shadow Cascades
//!
//! Pure math for cascaded shadow maps: how the camera frustum is sliced and
//! the world-to-shadow matrix of each slice.
//!
//! Each cascade is fitted to the bounding sphere of its frustum slice, so the
//! projected size does not change as the camera rotates, and its origin is
//! snapped to whole shadow-map texels so edges do not shimmer as the camera
//! moves.

use glam::{Mat4, Vec3, Vec4};

use super::uniforms::SHADOW_CASCADE_COUNT;

/// How cascades are laid out over the view distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeConfig {
    /// Blend between uniform (`0.0`) and logarithmic (`1.0`) splits.
    pub split_lambda: f32,
    /// Width and height of each shadow map, in texels.
    pub map_size: u32,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            split_lambda: 0.5,
            map_size: 2048,
        }
    }
}

/// Far view distance of each cascade (Practical Split Scheme).
///
/// Splits increase strictly for `0 < near < far`; the last equals `far`.
#[must_use]
pub fn compute_cascade_splits(near: f32, far: f32, lambda: f32) -> [f32; SHADOW_CASCADE_COUNT] {
    let n = SHADOW_CASCADE_COUNT as f32;
    let mut splits = [0.0f32; SHADOW_CASCADE_COUNT];

    for (i, split) in splits.iter_mut().enumerate() {
        let p = (i + 1) as f32 / n;
        let log_split = near * (far / near).powf(p);
        let uni_split = near + (far - near) * p;
        *split = lambda * log_split + (1.0 - lambda) * uni_split;
    }
    splits[SHADOW_CASCADE_COUNT - 1] = far;

    splits
}

/// World-space corners of the view frustum between two view distances.
///
/// `view_to_clip` must be a right-handed perspective projection (camera looks
/// down -Z). Near face first, then far face, each counter-clockwise from the
/// bottom left.
#[must_use]
pub fn frustum_corners_world(
    world_to_view: Mat4,
    view_to_clip: Mat4,
    slice_near: f32,
    slice_far: f32,
) -> [Vec3; 8] {
    let tan_half_fov = 1.0 / view_to_clip.y_axis.y;
    let aspect = view_to_clip.y_axis.y / view_to_clip.x_axis.x;

    let h_near = tan_half_fov * slice_near;
    let w_near = h_near * aspect;
    let h_far = tan_half_fov * slice_far;
    let w_far = h_far * aspect;

    let corners_view = [
        Vec3::new(-w_near, -h_near, -slice_near),
        Vec3::new(w_near, -h_near, -slice_near),
        Vec3::new(w_near, h_near, -slice_near),
        Vec3::new(-w_near, h_near, -slice_near),
        Vec3::new(-w_far, -h_far, -slice_far),
        Vec3::new(w_far, -h_far, -slice_far),
        Vec3::new(w_far, h_far, -slice_far),
        Vec3::new(-w_far, h_far, -slice_far),
    ];

    let view_to_world = world_to_view.inverse();
    corners_view.map(|c| view_to_world.transform_point3(c))
}

/// Orthographic world-to-shadow matrix covering `corners`, seen along
/// `light_direction` (the direction light travels).
#[must_use]
pub fn build_cascade_matrix(light_direction: Vec3, corners: &[Vec3; 8], map_size: u32) -> Mat4 {
    let dir = light_direction.try_normalize().unwrap_or(Vec3::NEG_Y);

    let center = corners.iter().copied().sum::<Vec3>() / 8.0;
    let radius = corners
        .iter()
        .map(|c| c.distance(center))
        .fold(0.0f32, f32::max)
        .max(1e-3);
    // Quantized so small float noise between frames cannot resize the map.
    let radius = (radius * 16.0).ceil() / 16.0;

    let up = if dir.y.abs() > 0.99 { Vec3::X } else { Vec3::Y };
    let eye = center - dir * radius;
    let light_view = Mat4::look_at_rh(eye, center, up);
    let mut light_proj = Mat4::orthographic_rh(-radius, radius, -radius, radius, 0.0, radius * 2.0);

    // Move the projection so the world origin lands on a texel corner.
    let half_size = map_size.max(1) as f32 / 2.0;
    let origin = (light_proj * light_view * Vec4::W) * half_size;
    let offset = (origin.round() - origin) / half_size;
    light_proj.w_axis.x += offset.x;
    light_proj.w_axis.y += offset.y;

    light_proj * light_view
}

/// All cascade matrices and split distances for a camera and one directional
/// light, ready for [`WorldUniforms::with_shadows`](super::WorldUniforms::with_shadows).
#[must_use]
pub fn build_world_to_shadow(
    world_to_view: Mat4,
    view_to_clip: Mat4,
    near: f32,
    far: f32,
    light_direction: Vec3,
    config: &CascadeConfig,
) -> ([Mat4; SHADOW_CASCADE_COUNT], [f32; SHADOW_CASCADE_COUNT]) {
    let splits = compute_cascade_splits(near, far, config.split_lambda);

    let mut matrices = [Mat4::IDENTITY; SHADOW_CASCADE_COUNT];
    let mut slice_near = near;
    for (matrix, &slice_far) in matrices.iter_mut().zip(&splits) {
        let corners = frustum_corners_world(world_to_view, view_to_clip, slice_near, slice_far);
        *matrix = build_cascade_matrix(light_direction, &corners, config.map_size);
        slice_near = slice_far;
    }

    log::trace!("Cascade splits {splits:?}");
    (matrices, splits)
}

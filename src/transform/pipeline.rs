//! CPU Transform Pipeline
//!
//! Reference implementation of the vertex stage of the `mesh` skeleton, used
//! for picking, culling and tests. It follows the same chain:
//!
//! ```text
//! local ─local_to_world─▶ world ─world_to_view─▶ view ─view_to_clip─▶ clip
//!                           └─world_to_shadow[i]─▶ shadow cascade i
//! ```

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use super::uniforms::{ObjectUniforms, SHADOW_CASCADE_COUNT, WorldUniforms};
use super::vertex::VertexInput;
use crate::material::ColorSource;

/// Interpolants produced for one vertex.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexOutput {
    pub clip_position: Vec4,
    pub local_position: Vec3,
    pub world_position: Vec3,
    pub view_position: Vec3,
    pub shadow_positions: [Vec4; SHADOW_CASCADE_COUNT],
    pub normal: Vec3,
    pub color: Vec4,
    pub uv: Vec2,
    pub texture_index: u32,
}

/// Matrices for one draw, composed once and applied to any number of vertices.
///
/// Holds no mutable state, so one pipeline can be shared across threads.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformPipeline {
    local_to_world: Mat4,
    world_to_view: Mat4,
    view_to_clip: Mat4,
    world_to_shadow: [Mat4; SHADOW_CASCADE_COUNT],
    normal_matrix: Mat3,
    color: ColorSource,
    tint: Vec4,
}

impl TransformPipeline {
    /// `local_to_world` must be invertible.
    #[must_use]
    pub fn new(object: &ObjectUniforms, world: &WorldUniforms) -> Self {
        let normal_matrix = Mat3::from_mat4(object.local_to_world).inverse().transpose();
        Self {
            local_to_world: object.local_to_world,
            world_to_view: world.world_to_view,
            view_to_clip: world.view_to_clip,
            world_to_shadow: world.world_to_shadow,
            normal_matrix,
            color: ColorSource::VertexAttribute,
            tint: Vec4::ONE,
        }
    }

    /// Selects where output colors come from; `tint` is used by
    /// [`ColorSource::Constant`].
    #[must_use]
    pub fn with_color(mut self, color: ColorSource, tint: Vec4) -> Self {
        self.color = color;
        self.tint = tint;
        self
    }

    /// Inverse-transpose of the upper-left 3×3 of `local_to_world`.
    #[inline]
    #[must_use]
    pub fn normal_matrix(&self) -> Mat3 {
        self.normal_matrix
    }

    #[must_use]
    pub fn process(&self, input: &VertexInput) -> VertexOutput {
        let local_position = input.position.extend(1.0);
        let world_position = self.local_to_world * local_position;
        let view_position = self.world_to_view * world_position;
        let clip_position = self.view_to_clip * view_position;

        let shadow_positions = self.world_to_shadow.map(|m| m * world_position);

        let color = match self.color {
            ColorSource::VertexAttribute => input.color,
            ColorSource::Constant => self.tint,
        };

        VertexOutput {
            clip_position,
            local_position: input.position,
            world_position: world_position.truncate(),
            view_position: view_position.truncate(),
            shadow_positions,
            normal: (self.normal_matrix * input.normal).normalize_or_zero(),
            color,
            uv: input.uv,
            texture_index: input.texture_index,
        }
    }

    #[must_use]
    pub fn process_all(&self, inputs: &[VertexInput]) -> Vec<VertexOutput> {
        inputs.iter().map(|v| self.process(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TransformPipeline>();
    }

    #[test]
    fn test_constant_color() {
        let pipeline = TransformPipeline::new(&ObjectUniforms::default(), &WorldUniforms::default())
            .with_color(ColorSource::Constant, Vec4::new(0.5, 0.25, 1.0, 1.0));
        let mut input = VertexInput::new(Vec3::ZERO, Vec3::Y);
        input.color = Vec4::new(1.0, 0.0, 0.0, 1.0);

        assert_eq!(pipeline.process(&input).color, Vec4::new(0.5, 0.25, 1.0, 1.0));
    }

    #[test]
    fn test_passthrough_attributes() {
        let pipeline =
            TransformPipeline::new(&ObjectUniforms::default(), &WorldUniforms::default());
        let mut input = VertexInput::new(Vec3::ONE, Vec3::X);
        input.uv = Vec2::new(0.25, 0.75);
        input.texture_index = 3;

        let out = pipeline.process(&input);
        assert_eq!(out.uv, input.uv);
        assert_eq!(out.texture_index, 3);
        assert_eq!(out.color, input.color);
        assert_eq!(out.local_position, Vec3::ONE);
    }
}

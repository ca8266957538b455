//! Vertex Records
//!
//! Interleaved vertex formats consumed by the built-in skeletons, with their
//! `wgpu` buffer layouts. Attribute locations follow the skeletons'
//! `VertexInput` structs; skinned meshes append joints and weights at
//! locations 5 and 6.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub texture_index: u32,
    pub color: [f32; 4],
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            normal: [0.0, 1.0, 0.0],
            uv: [0.0; 2],
            texture_index: 0,
            color: [1.0; 4],
        }
    }
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
        3 => Uint32,
        4 => Float32x4
    ];

    #[must_use]
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SkinVertex {
    pub base: Vertex,
    /// Indices into the joint matrix storage buffer.
    pub joints: [u32; 4],
    pub weights: [f32; 4],
}

impl SkinVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
        3 => Uint32,
        4 => Float32x4,
        5 => Uint32x4,
        6 => Float32x4
    ];

    #[must_use]
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// A vertex as seen by the CPU transform pipeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexInput {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub texture_index: u32,
    pub color: Vec4,
}

impl Default for VertexInput {
    fn default() -> Self {
        Vertex::default().into()
    }
}

impl VertexInput {
    #[must_use]
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position,
            normal,
            ..Self::default()
        }
    }
}

impl From<Vertex> for VertexInput {
    fn from(v: Vertex) -> Self {
        Self {
            position: Vec3::from_array(v.position),
            normal: Vec3::from_array(v.normal),
            uv: Vec2::from_array(v.uv),
            texture_index: v.texture_index,
            color: Vec4::from_array(v.color),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_strides() {
        assert_eq!(Vertex::layout().array_stride, 52);
        assert_eq!(SkinVertex::layout().array_stride, 84);
    }

    #[test]
    fn test_attribute_offsets_follow_fields() {
        let offsets: Vec<_> = Vertex::layout().attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, [0, 12, 24, 32, 36]);

        let skin = SkinVertex::layout();
        assert_eq!(skin.attributes[5].shader_location, 5);
        assert_eq!(skin.attributes[5].offset, 52);
        assert_eq!(skin.attributes[6].offset, 68);
    }
}

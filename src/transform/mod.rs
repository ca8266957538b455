//! Vertex transform chain, uniform blocks and shadow cascade math.

pub mod cascade;
pub mod pipeline;
pub mod uniforms;
pub mod vertex;

pub use cascade::{
    CascadeConfig, build_cascade_matrix, build_world_to_shadow, compute_cascade_splits,
    frustum_corners_world,
};
pub use pipeline::{TransformPipeline, VertexOutput};
pub use uniforms::{
    MaterialUniforms, ObjectUniforms, SHADOW_CASCADE_COUNT, ShadowPassUniforms, WorldUniforms,
};
pub use vertex::{SkinVertex, Vertex, VertexInput};

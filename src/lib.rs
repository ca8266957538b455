//! Shader variant generation and the vertex transform core of a forward
//! renderer.
//!
//! - [`pipeline`]: WGSL skeletons with named slots, resolved by [`VariantKey`]s
//!   into variants that are compiled once and cached.
//! - [`material`]: maps material configuration onto variant keys.
//! - [`transform`]: the local → world → view → clip chain, shadow cascades and
//!   the uniform blocks feeding them.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod material;
pub mod pipeline;
pub mod transform;

pub use errors::{CompileError, Diagnostic, Result, TemplateError, VariantError};
pub use material::{ColorSource, MaterialBinder, MaterialConfig, PositionSource};
pub use pipeline::{
    CompiledShader, ShaderContext, ShaderSettings, ShaderTemplate, SlotType, VariantHandle,
    VariantKey,
};
pub use transform::{ObjectUniforms, TransformPipeline, VertexInput, VertexOutput, WorldUniforms};

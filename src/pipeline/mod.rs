//! Shader variant pipeline: templates → keys → compiled, cached shaders.

pub mod cache;
pub mod compiler;
pub mod context;
pub mod settings;
pub mod template;
pub mod variant_key;

pub use cache::{CacheStats, CompiledShader, ShaderCache, ShaderCacheKey};
pub use compiler::{FRAGMENT_ENTRY, NagaBackend, ShaderBackend, VERTEX_ENTRY, VariantCompiler};
pub use context::{ShaderContext, VariantHandle};
pub use settings::ShaderSettings;
pub use template::{
    MESH_TEMPLATE, ResolvedSource, SHADOW_TEMPLATE, ShaderTemplate, SlotType, TemplateId,
    TemplateLibrary, resolve, slots,
};
pub use variant_key::{SlotValue, VariantKey};

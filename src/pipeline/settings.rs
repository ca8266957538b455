//! Shader Settings
//!
//! Configuration for a [`ShaderContext`](super::ShaderContext), fixed at
//! creation time.
//!
//! ```rust,ignore
//! use myth_variants::pipeline::{ShaderContext, ShaderSettings};
//!
//! // Edit shaders on disk without rebuilding, and log every generated variant
//! let settings = ShaderSettings {
//!     template_dir: Some("assets/shaders".into()),
//!     log_sources: true,
//!     ..Default::default()
//! };
//! let context = ShaderContext::new(settings)?;
//! ```

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSettings {
    /// Run the full naga validator before emitting SPIR-V.
    ///
    /// Default: `true`
    pub validate: bool,

    /// SPIR-V language version emitted by the naga backend.
    ///
    /// Default: `(1, 0)`
    pub spirv_version: (u8, u8),

    /// Directory searched for `<name>.wgsl` before the embedded built-ins.
    ///
    /// Default: `None`
    pub template_dir: Option<PathBuf>,

    /// Log every resolved variant source at `trace` level before compiling.
    ///
    /// Default: `false`
    pub log_sources: bool,
}

impl Default for ShaderSettings {
    fn default() -> Self {
        Self {
            validate: true,
            spirv_version: (1, 0),
            template_dir: None,
            log_sources: false,
        }
    }
}

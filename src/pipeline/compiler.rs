//! Variant Compiler
//!
//! Turns resolved WGSL into SPIR-V through a [`ShaderBackend`] and memoizes the
//! result in a [`ShaderCache`].
//!
//! The default backend is [`NagaBackend`]: WGSL front-end → validator →
//! SPIR-V back-end, all in-process. Tests and tools can plug in their own
//! backend through the trait.

use std::sync::Arc;

use naga::back::spv;
use naga::valid::{Capabilities, ValidationFlags, Validator};

use super::cache::{CompiledShader, ShaderCache, ShaderCacheKey};
use super::settings::ShaderSettings;
use super::template::ResolvedSource;
use crate::errors::{CompileError, Diagnostic};

/// Entry point every skeleton must provide for the vertex stage.
pub const VERTEX_ENTRY: &str = "vs_main";
/// Entry point for the fragment stage, when the skeleton has one.
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// The native compiler behind [`VariantCompiler`].
pub trait ShaderBackend: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Compiles resolved source into SPIR-V words.
    fn compile(&self, source: &str, label: &str) -> Result<Vec<u32>, Vec<Diagnostic>>;
}

// ─── NagaBackend ──────────────────────────────────────────────────────────────

/// In-process WGSL → SPIR-V compiler built on naga.
#[derive(Debug, Clone)]
pub struct NagaBackend {
    flags: ValidationFlags,
    spirv_version: (u8, u8),
}

impl Default for NagaBackend {
    fn default() -> Self {
        Self::new(&ShaderSettings::default())
    }
}

impl NagaBackend {
    #[must_use]
    pub fn new(settings: &ShaderSettings) -> Self {
        let flags = if settings.validate {
            ValidationFlags::all()
        } else {
            ValidationFlags::empty()
        };
        Self {
            flags,
            spirv_version: settings.spirv_version,
        }
    }
}

impl ShaderBackend for NagaBackend {
    fn name(&self) -> &'static str {
        "naga"
    }

    fn compile(&self, source: &str, label: &str) -> Result<Vec<u32>, Vec<Diagnostic>> {
        let module = naga::front::wgsl::parse_str(source).map_err(|e| {
            let message = e.emit_to_string(source);
            vec![match e.location(source) {
                Some(loc) => Diagnostic::at(message, loc.line_number, loc.line_position),
                None => Diagnostic::new(message),
            }]
        })?;

        let mut validator = Validator::new(self.flags, Capabilities::all());
        let info = validator.validate(&module).map_err(|e| {
            let message = e.emit_to_string(source);
            vec![match e.location(source) {
                Some(loc) => Diagnostic::at(message, loc.line_number, loc.line_position),
                None => Diagnostic::new(message),
            }]
        })?;

        let has_vertex_entry = module
            .entry_points
            .iter()
            .any(|ep| ep.name == VERTEX_ENTRY && ep.stage == naga::ShaderStage::Vertex);
        if !has_vertex_entry {
            return Err(vec![Diagnostic::new(format!(
                "shader `{label}` has no `@vertex fn {VERTEX_ENTRY}` entry point"
            ))]);
        }

        let options = spv::Options {
            lang_version: self.spirv_version,
            ..Default::default()
        };
        spv::write_vec(&module, &info, &options, None)
            .map_err(|e| vec![Diagnostic::new(e.to_string())])
    }
}

// ─── VariantCompiler ──────────────────────────────────────────────────────────

/// Backend plus cache: compiles each distinct variant exactly once.
pub struct VariantCompiler {
    backend: Box<dyn ShaderBackend>,
    cache: ShaderCache,
    log_sources: bool,
}

impl std::fmt::Debug for VariantCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariantCompiler")
            .field("backend", &self.backend.name())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl VariantCompiler {
    #[must_use]
    pub fn new(backend: Box<dyn ShaderBackend>) -> Self {
        Self {
            backend,
            cache: ShaderCache::new(),
            log_sources: false,
        }
    }

    #[must_use]
    pub fn with_settings(backend: Box<dyn ShaderBackend>, settings: &ShaderSettings) -> Self {
        Self {
            log_sources: settings.log_sources,
            ..Self::new(backend)
        }
    }

    /// Returns the cached shader for `cache_key`, compiling `source` on a miss.
    ///
    /// Concurrent calls with the same key run the backend once and share the
    /// result, including a failure: every caller queued on a failing
    /// compilation gets the same [`CompileError`]. Failures leave the cache
    /// untouched.
    pub fn compile(
        &self,
        source: &str,
        cache_key: ShaderCacheKey,
        label: &str,
    ) -> Result<Arc<CompiledShader>, CompileError> {
        self.cache.get_or_compile(cache_key, || {
            if self.log_sources {
                log::trace!("Resolved shader {label} ({cache_key}):\n{source}");
            }
            log::debug!(
                "Compiling shader variant {label} ({cache_key}) with {}",
                self.backend.name()
            );

            match self.backend.compile(source, label) {
                Ok(words) => Ok(CompiledShader::new(
                    cache_key,
                    label,
                    self.backend.name(),
                    source,
                    words,
                )),
                Err(diagnostics) => {
                    let err = CompileError {
                        label: label.to_string(),
                        backend: self.backend.name(),
                        diagnostics,
                    };
                    log::warn!("{err}");
                    Err(err)
                }
            }
        })
    }

    /// Compiles a resolved template, labelled with its template name.
    pub fn compile_resolved(
        &self,
        source: &ResolvedSource,
    ) -> Result<Arc<CompiledShader>, CompileError> {
        self.compile(source.as_str(), source.cache_key(), source.template())
    }

    #[inline]
    #[must_use]
    pub fn cache(&self) -> &ShaderCache {
        &self.cache
    }

    #[inline]
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}

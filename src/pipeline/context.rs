//! Shader Context
//!
//! Owns everything needed to turn a material into a compiled shader: the
//! template library, the compiler and its cache. Nothing is global; an
//! application creates one context and shares it (`&ShaderContext` is `Sync`)
//! with its loader threads.
//!
//! Variants are prepared ahead of time with [`ShaderContext::prepare`] and
//! fetched at draw time with [`ShaderContext::variant`], which never compiles.

use std::fmt;
use std::sync::Arc;

use super::cache::{CompiledShader, ShaderCacheKey};
use super::compiler::{NagaBackend, ShaderBackend, VariantCompiler};
use super::settings::ShaderSettings;
use super::template::{ShaderTemplate, TemplateLibrary};
use super::variant_key::VariantKey;
use crate::errors::Result;
use crate::material::{MaterialBinder, MaterialConfig};

/// Cheap handle to a prepared variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariantHandle(ShaderCacheKey);

impl VariantHandle {
    #[inline]
    #[must_use]
    pub fn key(self) -> ShaderCacheKey {
        self.0
    }
}

impl fmt::Display for VariantHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug)]
pub struct ShaderContext {
    templates: TemplateLibrary,
    compiler: VariantCompiler,
    settings: ShaderSettings,
}

impl ShaderContext {
    /// Creates a context with the built-in templates and the naga backend.
    pub fn new(settings: ShaderSettings) -> Result<Self> {
        let backend = Box::new(NagaBackend::new(&settings));
        Self::with_backend(settings, backend)
    }

    /// Creates a context with the built-in templates and a custom backend.
    pub fn with_backend(settings: ShaderSettings, backend: Box<dyn ShaderBackend>) -> Result<Self> {
        let templates = TemplateLibrary::builtin(settings.template_dir.as_deref())?;
        let compiler = VariantCompiler::with_settings(backend, &settings);
        Ok(Self {
            templates,
            compiler,
            settings,
        })
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ShaderSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn templates(&self) -> &TemplateLibrary {
        &self.templates
    }

    #[inline]
    #[must_use]
    pub fn compiler(&self) -> &VariantCompiler {
        &self.compiler
    }

    /// Registers an additional (or replacement) skeleton.
    ///
    /// Replacing a skeleton changes its template id, so variants built from
    /// the old source are never returned for the new one.
    pub fn insert_template(&mut self, template: ShaderTemplate) {
        log::debug!("Registering shader template {} ({})", template.name(), template.id());
        self.templates.insert(template);
    }

    /// Resolves and compiles the variant of `template_name` described by `key`.
    ///
    /// Cheap when the variant is already cached. Safe to call from many
    /// threads at once; each distinct variant is compiled once.
    pub fn prepare(&self, template_name: &str, key: &VariantKey) -> Result<VariantHandle> {
        let template = self.templates.get(template_name)?;
        let source = template.resolve(key)?;
        let shader = self.compiler.compile_resolved(&source)?;
        Ok(VariantHandle(shader.key()))
    }

    /// [`prepare`](Self::prepare) with the key derived from a material.
    pub fn prepare_material(
        &self,
        template_name: &str,
        material: &MaterialConfig,
    ) -> Result<VariantHandle> {
        self.prepare(template_name, &MaterialBinder::bind(material))
    }

    /// Returns a prepared variant.
    ///
    /// # Panics
    ///
    /// Panics if `handle` was never successfully prepared on this context (or
    /// the cache was cleared since). Compiling at draw time is a bug.
    #[must_use]
    pub fn variant(&self, handle: VariantHandle) -> Arc<CompiledShader> {
        match self.compiler.cache().get(handle.0) {
            Some(shader) => shader,
            None => panic!("shader variant {handle} was never prepared"),
        }
    }

    #[must_use]
    pub fn try_variant(&self, handle: VariantHandle) -> Option<Arc<CompiledShader>> {
        self.compiler.cache().get(handle.0)
    }
}

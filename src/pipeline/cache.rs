//! Compiled Shader Cache
//!
//! Content-addressed storage for [`CompiledShader`]s, shared by every loader
//! thread that prepares variants.
//!
//! # Single-flight compilation
//!
//! At most one compilation runs per [`ShaderCacheKey`] at any time. Requests
//! for a key that is being compiled join that key's flight and, once it
//! lands, observe its outcome: the very same `Arc<CompiledShader>`, or a
//! clone of the same [`CompileError`]. Requests for different keys never
//! wait on each other.
//!
//! Failures are never stored in the cache. A flight leaves the in-flight
//! table as soon as it lands, so the next separate request compiles again.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use xxhash_rust::xxh3::{Xxh3, xxh3_128};

use super::template::TemplateId;
use crate::errors::CompileError;
use super::variant_key::SlotValue;

// ─── Keys ─────────────────────────────────────────────────────────────────────

/// xxh3-128 of a template identity and the slot expressions that fill it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderCacheKey(u128);

impl ShaderCacheKey {
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u128 {
        self.0
    }

    /// Entries must be supplied in slot-name order.
    pub(crate) fn derive<'a>(
        template: TemplateId,
        entries: impl IntoIterator<Item = (&'a str, &'a SlotValue)>,
    ) -> Self {
        let mut hasher = Xxh3::new();
        hasher.update(&template.raw().to_le_bytes());
        for (slot, value) in entries {
            hasher.update(slot.as_bytes());
            hasher.update(&[0]);
            hasher.update(value.expr.as_bytes());
            hasher.update(&[0xff]);
        }
        Self(hasher.digest128())
    }
}

impl fmt::Display for ShaderCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

// ─── CompiledShader ───────────────────────────────────────────────────────────

/// An immutable, compiled shader variant.
#[derive(Debug)]
pub struct CompiledShader {
    key: ShaderCacheKey,
    label: String,
    backend: &'static str,
    source: Arc<str>,
    words: Arc<[u32]>,
    content_hash: u128,
}

impl CompiledShader {
    #[must_use]
    pub fn new(
        key: ShaderCacheKey,
        label: impl Into<String>,
        backend: &'static str,
        source: impl Into<Arc<str>>,
        words: Vec<u32>,
    ) -> Self {
        let content_hash = xxh3_128(bytemuck::cast_slice(&words));
        Self {
            key,
            label: label.into(),
            backend,
            source: source.into(),
            words: words.into(),
            content_hash,
        }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> ShaderCacheKey {
        self.key
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Name of the backend that produced the bytecode.
    #[inline]
    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// The resolved WGSL this shader was compiled from.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// SPIR-V words.
    #[inline]
    #[must_use]
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    /// xxh3-128 of the bytecode.
    #[inline]
    #[must_use]
    pub fn content_hash(&self) -> u128 {
        self.content_hash
    }

    /// Creates a `wgpu::ShaderModule` for this variant.
    ///
    /// Hands wgpu the validated WGSL, so no extra device features are needed.
    #[must_use]
    pub fn create_module(&self, device: &wgpu::Device) -> wgpu::ShaderModule {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&self.label),
            source: wgpu::ShaderSource::Wgsl(self.source.as_ref().into()),
        })
    }
}

// ─── ShaderCache ──────────────────────────────────────────────────────────────

/// Counters describing cache activity since creation (or the last `clear`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub compilations: u64,
    pub failures: u64,
    pub entries: usize,
}

/// One compilation in progress. Callers queued on it read the outcome the
/// compiling caller leaves behind.
type Flight = Arc<Mutex<Option<Result<Arc<CompiledShader>, CompileError>>>>;

/// Shared cache of compiled variants with per-key single-flight compilation.
#[derive(Debug, Default)]
pub struct ShaderCache {
    ready: RwLock<FxHashMap<ShaderCacheKey, Arc<CompiledShader>>>,
    in_flight: Mutex<FxHashMap<ShaderCacheKey, Flight>>,
    hits: AtomicU64,
    compilations: AtomicU64,
    failures: AtomicU64,
}

impl ShaderCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached shader for `key`, never blocking on compilation.
    #[must_use]
    pub fn get(&self, key: ShaderCacheKey) -> Option<Arc<CompiledShader>> {
        self.ready.read().get(&key).cloned()
    }

    #[must_use]
    pub fn contains(&self, key: ShaderCacheKey) -> bool {
        self.ready.read().contains_key(&key)
    }

    /// Returns the cached shader for `key` or runs `compile` to produce it.
    ///
    /// `compile` runs at most once per flight. Every caller queued on that
    /// flight receives its outcome, including a [`CompileError`]. Errors are
    /// not stored in the cache, so a request arriving after the flight has
    /// landed starts a new one.
    pub fn get_or_compile(
        &self,
        key: ShaderCacheKey,
        compile: impl FnOnce() -> Result<CompiledShader, CompileError>,
    ) -> Result<Arc<CompiledShader>, CompileError> {
        if let Some(shader) = self.lookup(key) {
            return Ok(shader);
        }

        let flight = Arc::clone(self.in_flight.lock().entry(key).or_default());
        let mut outcome = flight.lock();

        if let Some(landed) = outcome.as_ref() {
            return match landed {
                Ok(shader) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    Ok(Arc::clone(shader))
                }
                Err(e) => Err(e.clone()),
            };
        }
        // A flight that landed before we joined the map may already be ready.
        if let Some(shader) = self.lookup(key) {
            return Ok(shader);
        }

        self.compilations.fetch_add(1, Ordering::Relaxed);
        let result = match compile() {
            Ok(shader) => {
                let shader = Arc::new(shader);
                self.ready.write().insert(key, Arc::clone(&shader));
                Ok(shader)
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        };
        *outcome = Some(result.clone());
        drop(outcome);

        // Later requests must not join a flight that has landed.
        let mut in_flight = self.in_flight.lock();
        if in_flight.get(&key).is_some_and(|f| Arc::ptr_eq(f, &flight)) {
            in_flight.remove(&key);
        }

        result
    }

    fn lookup(&self, key: ShaderCacheKey) -> Option<Arc<CompiledShader>> {
        let shader = self.get(key)?;
        self.hits.fetch_add(1, Ordering::Relaxed);
        log::trace!("Shader cache hit {key}");
        Some(shader)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ready.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ready.read().is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            compilations: self.compilations.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    /// Drops every cached shader and resets the counters.
    ///
    /// Shaders already handed out stay alive through their `Arc`s.
    pub fn clear(&self) {
        self.ready.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.compilations.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
    }
}

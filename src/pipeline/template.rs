//! Shader Templates
//!
//! Turns WGSL skeletons into concrete source using the minijinja template
//! engine. A parsed [`ShaderTemplate`] is a structured form of the skeleton:
//! the compiled template plus a table of named, typed slots. Filling a slot
//! that is missing or has the wrong type is an error at variant-build time,
//! never a silently broken shader.
//!
//! ## Syntax
//!
//! | Construct | Delimiters |
//! |-----------|------------|
//! | Slot      | `{{ name }}` |
//! | Block     | `{$ if x $} … {$ endif $}` |
//! | Line statement | `$$ for …` |
//!
//! Single braces are left alone, so plain WGSL passes through unchanged.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use minijinja::syntax::SyntaxConfig;
use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use rust_embed::RustEmbed;
use rustc_hash::FxHashMap;
use serde::Serialize;
use xxhash_rust::xxh3::Xxh3;

use super::cache::ShaderCacheKey;
use super::variant_key::{SlotValue, VariantKey};
use crate::errors::TemplateError;

/// Names of the slots the built-in skeletons expose.
pub mod slots {
    /// Local-space position fed into the transform chain (`vec3<f32>`).
    pub const OUT_POSITION: &str = "out_position";
    /// Local-space normal before the normal matrix (`vec3<f32>`).
    pub const OUT_NORMAL: &str = "out_normal";
    /// Interpolated vertex color (`vec4<f32>`).
    pub const OUT_COLOR: &str = "out_color";
    /// Extra `VertexInput` members for skinned meshes.
    pub const SKIN_ATTRIBUTES: &str = "skin_attributes";
    /// Module-scope skinning bindings and helpers.
    pub const SKIN_FUNCTIONS: &str = "skin_functions";
}

/// Forward mesh skeleton (`vs_main` + `fs_main`).
pub const MESH_TEMPLATE: &str = "mesh";
/// Depth-only cascade skeleton (`vs_main` + empty `fs_main`).
pub const SHADOW_TEMPLATE: &str = "shadow";

const BUILTIN_TEMPLATES: &[(&str, &[(&str, SlotType)])] = &[
    (
        MESH_TEMPLATE,
        &[
            (slots::OUT_POSITION, SlotType::Vec3),
            (slots::OUT_NORMAL, SlotType::Vec3),
            (slots::OUT_COLOR, SlotType::Vec4),
            (slots::SKIN_ATTRIBUTES, SlotType::Fields),
            (slots::SKIN_FUNCTIONS, SlotType::Declarations),
        ],
    ),
    (
        SHADOW_TEMPLATE,
        &[
            (slots::OUT_POSITION, SlotType::Vec3),
            (slots::SKIN_ATTRIBUTES, SlotType::Fields),
            (slots::SKIN_FUNCTIONS, SlotType::Declarations),
        ],
    ),
];

#[derive(RustEmbed)]
#[folder = "src/pipeline/shaders"]
struct ShaderAssets;

// ─── Slot Types ───────────────────────────────────────────────────────────────

/// The kind of WGSL fragment a slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum SlotType {
    /// Undeclared; accepts anything and is accepted everywhere.
    #[default]
    Any,
    F32,
    Vec2,
    Vec3,
    Vec4,
    /// Struct member list (`@location(n) name: type,` lines).
    Fields,
    /// Module-scope items (bindings, functions).
    Declarations,
}

impl SlotType {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::F32 => "f32",
            Self::Vec2 => "vec2<f32>",
            Self::Vec3 => "vec3<f32>",
            Self::Vec4 => "vec4<f32>",
            Self::Fields => "struct fields",
            Self::Declarations => "declarations",
        }
    }

    /// Whether a slot of this type can be filled with a value of type `value`.
    #[inline]
    #[must_use]
    pub fn accepts(self, value: SlotType) -> bool {
        self == Self::Any || value == Self::Any || self == value
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Template Identity ────────────────────────────────────────────────────────

/// xxh3-128 of a template's name and source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(u128);

impl TemplateId {
    fn of(name: &str, source: &str) -> Self {
        let mut hasher = Xxh3::new();
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
        hasher.update(source.as_bytes());
        Self(hasher.digest128())
    }

    #[inline]
    #[must_use]
    pub fn raw(self) -> u128 {
        self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

// ─── ShaderTemplate ───────────────────────────────────────────────────────────

fn new_environment() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();

    let syntax = SyntaxConfig::builder()
        .block_delimiters("{$", "$}")
        .variable_delimiters("{{", "}}")
        .line_statement_prefix("$$")
        .build()?;

    env.set_syntax(syntax);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_auto_escape_callback(|_| AutoEscape::None);

    Ok(env)
}

fn syntax_error(template: &str, err: &minijinja::Error) -> TemplateError {
    TemplateError::Syntax {
        template: template.to_string(),
        message: err.detail().map_or_else(|| err.to_string(), str::to_string),
        line: err.line(),
    }
}

/// Names minijinja reads as literals or special objects rather than variables.
const RESERVED_NAMES: &[&str] = &["true", "false", "none", "True", "False", "None", "self"];

fn is_slot_name(expr: &str) -> bool {
    let mut chars = expr.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED_NAMES.contains(&expr)
}

/// Every `{{ }}` placeholder must hold a bare slot name.
fn check_placeholders(template: &str, source: &str) -> Result<(), TemplateError> {
    let mut offset = 0;
    while let Some(start) = source[offset..].find("{{") {
        let open = offset + start + 2;
        // Unterminated placeholders were already rejected by the parser.
        let Some(len) = source[open..].find("}}") else {
            break;
        };
        let body = &source[open..open + len];
        let body = body.strip_prefix(['-', '+']).unwrap_or(body);
        let body = body.strip_suffix(['-', '+']).unwrap_or(body).trim();

        if !is_slot_name(body) {
            return Err(TemplateError::Syntax {
                template: template.to_string(),
                message: format!("placeholder `{body}` is not a slot name"),
                line: Some(source[..open].matches('\n').count() + 1),
            });
        }
        offset = open + len + 2;
    }
    Ok(())
}

/// A parsed, immutable shader skeleton.
///
/// Owns its own minijinja environment so that resolution needs no shared or
/// global state.
#[derive(Debug)]
pub struct ShaderTemplate {
    name: String,
    id: TemplateId,
    env: Environment<'static>,
    slots: BTreeMap<String, SlotType>,
}

impl ShaderTemplate {
    /// Parses `source`, discovering every slot it references.
    ///
    /// Each `{{ }}` placeholder must name a slot; literals such as
    /// `{{ true }}` and expressions such as `{{ a.b }}` are syntax errors.
    ///
    /// Discovered slots start out as [`SlotType::Any`]; use
    /// [`with_slot_types`](Self::with_slot_types) to pin them down.
    pub fn parse(name: &str, source: &str) -> Result<Self, TemplateError> {
        let mut env = new_environment().map_err(|e| syntax_error(name, &e))?;
        env.add_template_owned(name.to_string(), source.to_string())
            .map_err(|e| syntax_error(name, &e))?;
        check_placeholders(name, source)?;

        let slots = {
            let template = env.get_template(name).map_err(|e| syntax_error(name, &e))?;
            template
                .undeclared_variables(false)
                .into_iter()
                .map(|slot| (slot, SlotType::Any))
                .collect()
        };

        Ok(Self {
            name: name.to_string(),
            id: TemplateId::of(name, source),
            env,
            slots,
        })
    }

    /// Declares slot types. Every name must be referenced by the template.
    pub fn with_slot_types(mut self, types: &[(&str, SlotType)]) -> Result<Self, TemplateError> {
        for &(slot, ty) in types {
            match self.slots.get_mut(slot) {
                Some(declared) => *declared = ty,
                None => {
                    return Err(TemplateError::UnknownSlot {
                        template: self.name.clone(),
                        slot: slot.to_string(),
                    });
                }
            }
        }
        Ok(self)
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> TemplateId {
        self.id
    }

    /// Referenced slots and their declared types, ordered by name.
    pub fn slots(&self) -> impl Iterator<Item = (&str, SlotType)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), *v))
    }

    #[must_use]
    pub fn slot_type(&self, slot: &str) -> Option<SlotType> {
        self.slots.get(slot).copied()
    }

    /// See [`resolve`].
    pub fn resolve(&self, key: &VariantKey) -> Result<ResolvedSource, TemplateError> {
        let mut missing = BTreeSet::new();
        let mut filled: BTreeMap<&str, (SlotType, &SlotValue)> = BTreeMap::new();

        for (slot, &expected) in &self.slots {
            match key.get(slot) {
                Some(value) => {
                    filled.insert(slot.as_str(), (expected, value));
                }
                None => {
                    missing.insert(slot.clone());
                }
            }
        }

        if !missing.is_empty() {
            return Err(TemplateError::MissingSlots {
                template: self.name.clone(),
                names: missing,
            });
        }

        for (&slot, &(expected, value)) in &filled {
            if !expected.accepts(value.ty) {
                return Err(TemplateError::SlotTypeMismatch {
                    template: self.name.clone(),
                    slot: slot.to_string(),
                    expected,
                    found: value.ty,
                });
            }
        }

        let cache_key = ShaderCacheKey::derive(
            self.id,
            filled.iter().map(|(&slot, &(_, value))| (slot, value)),
        );

        let ctx = ResolveContext {
            slots: filled
                .iter()
                .map(|(&slot, &(_, value))| (slot, value.expr.as_str()))
                .collect(),
        };

        let text = self
            .env
            .get_template(&self.name)
            .and_then(|template| template.render(&ctx))
            .map_err(|e| TemplateError::Render {
                template: self.name.clone(),
                message: e.to_string(),
            })?;

        Ok(ResolvedSource {
            template: self.name.clone(),
            template_id: self.id,
            cache_key,
            text,
        })
    }
}

#[derive(Serialize)]
struct ResolveContext<'a> {
    #[serde(flatten)]
    slots: BTreeMap<&'a str, &'a str>,
}

/// Resolves every slot of `template` from `key`.
///
/// Fails with [`TemplateError::MissingSlots`] naming *all* referenced slots the
/// key does not fill, or [`TemplateError::SlotTypeMismatch`] when a typed slot
/// receives a value of another type. Key entries the template never references
/// are ignored and do not affect the cache key.
///
/// Pure: identical `(template, key)` pairs always produce identical output.
pub fn resolve(
    template: &ShaderTemplate,
    key: &VariantKey,
) -> Result<ResolvedSource, TemplateError> {
    template.resolve(key)
}

/// Concrete shader source produced from a template and a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    template: String,
    template_id: TemplateId,
    cache_key: ShaderCacheKey,
    text: String,
}

impl ResolvedSource {
    #[inline]
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    #[inline]
    #[must_use]
    pub fn template_id(&self) -> TemplateId {
        self.template_id
    }

    #[inline]
    #[must_use]
    pub fn cache_key(&self) -> ShaderCacheKey {
        self.cache_key
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}

// ─── TemplateLibrary ──────────────────────────────────────────────────────────

/// Registry of parsed templates, keyed by name.
///
/// Built-in skeletons are embedded in the binary. A directory given to
/// [`TemplateLibrary::builtin`] takes precedence, which allows editing shaders
/// without rebuilding.
#[derive(Debug, Default)]
pub struct TemplateLibrary {
    templates: FxHashMap<String, Arc<ShaderTemplate>>,
}

impl TemplateLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the built-in `mesh` and `shadow` skeletons with their slot types.
    pub fn builtin(template_dir: Option<&Path>) -> Result<Self, TemplateError> {
        let mut library = Self::new();
        for &(name, slot_types) in BUILTIN_TEMPLATES {
            let source = load_source(name, template_dir)?;
            let template = ShaderTemplate::parse(name, &source)?.with_slot_types(slot_types)?;
            library.insert(template);
        }
        log::info!("Loaded {} built-in shader templates", library.len());
        Ok(library)
    }

    /// Registers a template, replacing any previous one with the same name.
    pub fn insert(&mut self, template: ShaderTemplate) -> Arc<ShaderTemplate> {
        let template = Arc::new(template);
        self.templates
            .insert(template.name().to_string(), Arc::clone(&template));
        template
    }

    pub fn get(&self, name: &str) -> Result<Arc<ShaderTemplate>, TemplateError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn load_source(name: &str, template_dir: Option<&Path>) -> Result<String, TemplateError> {
    let filename = if Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wgsl"))
    {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}.wgsl"))
    };

    if let Some(dir) = template_dir {
        let path = dir.join(filename.as_ref());
        if path.exists() {
            log::debug!("Loading shader template {name} from {}", path.display());
            return std::fs::read_to_string(&path).map_err(|e| TemplateError::Load {
                template: name.to_string(),
                message: format!("{}: {e}", path.display()),
            });
        }
    }

    let file = ShaderAssets::get(&filename)
        .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
    std::str::from_utf8(file.data.as_ref())
        .map(str::to_string)
        .map_err(|e| TemplateError::Load {
            template: name.to_string(),
            message: e.to_string(),
        })
}

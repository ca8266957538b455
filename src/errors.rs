//! Error Types
//!
//! This module defines the error types produced while building shader variants.
//!
//! # Overview
//!
//! Two failure families exist, both surfaced synchronously at variant-build time:
//! - [`TemplateError`]: the skeleton could not be turned into source (unresolved
//!   or mistyped slots, template syntax errors, missing templates)
//! - [`CompileError`]: the shader backend rejected the resolved source
//!
//! [`VariantError`] wraps both. Neither is ever cached: fixing the material
//! configuration or the template and retrying starts a fresh build.
//!
//! # Usage
//!
//! ```rust,ignore
//! use myth_variants::errors::{Result, VariantError};
//!
//! fn prepare() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use crate::pipeline::template::SlotType;

fn join_names(names: &BTreeSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

fn at_line(line: &Option<usize>) -> String {
    line.map(|l| format!(" at line {l}")).unwrap_or_default()
}

fn join_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Template Errors
// ============================================================================

/// Failure to turn a template plus a [`VariantKey`] into shader source.
///
/// [`VariantKey`]: crate::pipeline::VariantKey
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// One or more referenced slots have no entry in the variant key.
    ///
    /// `names` always holds the complete set of missing slots.
    #[error("template `{template}` has unresolved slots: {}", join_names(.names))]
    MissingSlots {
        template: String,
        names: BTreeSet<String>,
    },

    /// A slot was filled with an expression of the wrong type.
    #[error("slot `{slot}` of template `{template}` expects {expected}, got {found}")]
    SlotTypeMismatch {
        template: String,
        slot: String,
        expected: SlotType,
        found: SlotType,
    },

    /// A slot type was declared for a name the template never references.
    #[error("template `{template}` does not reference slot `{slot}`")]
    UnknownSlot { template: String, slot: String },

    /// The skeleton itself is malformed.
    #[error("template `{template}` failed to parse{}: {message}", at_line(.line))]
    Syntax {
        template: String,
        message: String,
        line: Option<usize>,
    },

    /// Rendering failed after all slots were validated.
    #[error("failed to render template `{template}`: {message}")]
    Render { template: String, message: String },

    /// No template with this name is registered.
    #[error("template not found: {0}")]
    NotFound(String),

    /// A template file could not be read.
    #[error("failed to load template `{template}`: {message}")]
    Load { template: String, message: String },
}

// ============================================================================
// Compile Errors
// ============================================================================

/// A single message reported by the shader backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    /// 1-based source line, when the backend can locate the problem.
    pub line: Option<u32>,
    /// 1-based column within `line`.
    pub column: Option<u32>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
        }
    }

    #[must_use]
    pub fn at(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            message: message.into(),
            line: Some(line),
            column: Some(column),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "{line}:{column}: {}", self.message),
            (Some(line), None) => write!(f, "{line}: {}", self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// The backend rejected resolved shader source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{backend} rejected shader `{label}`: {}", join_diagnostics(.diagnostics))]
pub struct CompileError {
    pub label: String,
    pub backend: &'static str,
    pub diagnostics: Vec<Diagnostic>,
}

// ============================================================================
// Variant Errors
// ============================================================================

/// Any failure while preparing a shader variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VariantError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Alias for `Result<T, VariantError>`.
pub type Result<T> = std::result::Result<T, VariantError>;

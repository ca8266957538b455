//! Material Binding
//!
//! Decides *which* shader variant a material needs. A [`MaterialConfig`]
//! describes independent axes (where the color comes from, whether positions
//! are skinned), and [`MaterialBinder`] maps each axis to slot assignments.
//! Materials that agree on every axis get equal [`VariantKey`]s and therefore
//! share one compiled shader, however unrelated they otherwise are.
//!
//! No template or compiler work happens here.

use crate::pipeline::VariantKey;
use crate::pipeline::template::{SlotType, slots};

const SKIN_ATTRIBUTES: &str = include_str!("pipeline/shaders/chunks/skin_attributes.wgsl");
const SKIN_FUNCTIONS: &str = include_str!("pipeline/shaders/chunks/skinning.wgsl");

/// Source of the per-vertex color output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorSource {
    /// Interpolate the mesh's color attribute.
    #[default]
    VertexAttribute,
    /// Use the material's `albedo_tint` uniform for every vertex.
    Constant,
}

impl ColorSource {
    #[must_use]
    pub fn expression(self) -> &'static str {
        match self {
            Self::VertexAttribute => "input.color",
            Self::Constant => "u_material.albedo_tint",
        }
    }
}

/// Source of the local-space position (and normal) fed to the transform chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PositionSource {
    #[default]
    Static,
    /// Blend four joint matrices per vertex before the object transform.
    Skinned,
}

impl PositionSource {
    #[must_use]
    pub fn position_expression(self) -> &'static str {
        match self {
            Self::Static => "input.position",
            Self::Skinned => "skin_position(input)",
        }
    }

    #[must_use]
    pub fn normal_expression(self) -> &'static str {
        match self {
            Self::Static => "input.normal",
            Self::Skinned => "skin_normal(input)",
        }
    }
}

/// The variant-relevant description of a material.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MaterialConfig {
    pub color: ColorSource,
    pub position: PositionSource,
    /// Assignments for further axes, applied last and overriding the above.
    pub extra: VariantKey,
}

impl MaterialConfig {
    #[must_use]
    pub fn new(color: ColorSource, position: PositionSource) -> Self {
        Self {
            color,
            position,
            extra: VariantKey::new(),
        }
    }

    #[must_use]
    pub fn with_extra(mut self, slot: &str, expr: &str, ty: SlotType) -> Self {
        self.extra.set_typed(slot, expr, ty);
        self
    }
}

pub struct MaterialBinder;

impl MaterialBinder {
    /// Derives the variant key for `config`.
    ///
    /// The key covers every slot of the built-in templates; templates that
    /// reference fewer slots (the depth-only shadow skeleton) ignore the rest.
    #[must_use]
    pub fn bind(config: &MaterialConfig) -> VariantKey {
        let mut key = VariantKey::with_capacity(5 + config.extra.len());

        key.set_typed(slots::OUT_COLOR, config.color.expression(), SlotType::Vec4);
        key.set_typed(
            slots::OUT_POSITION,
            config.position.position_expression(),
            SlotType::Vec3,
        );
        key.set_typed(
            slots::OUT_NORMAL,
            config.position.normal_expression(),
            SlotType::Vec3,
        );

        let (attributes, functions) = match config.position {
            PositionSource::Static => ("", ""),
            PositionSource::Skinned => (SKIN_ATTRIBUTES, SKIN_FUNCTIONS),
        };
        key.set_typed(slots::SKIN_ATTRIBUTES, attributes, SlotType::Fields);
        key.set_typed(slots::SKIN_FUNCTIONS, functions, SlotType::Declarations);

        key.merge(&config.extra);
        key
    }
}

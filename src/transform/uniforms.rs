//! Uniform Blocks
//!
//! CPU mirrors of the uniform structs declared by the built-in skeletons.
//! Field order and sizes match WGSL uniform layout exactly, so a block can be
//! uploaded with `bytemuck::bytes_of` and no repacking.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

/// Number of shadow cascades every skeleton and uniform block carries.
pub const SHADOW_CASCADE_COUNT: usize = 4;

/// Per-object block (`@group(2) @binding(0)`).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ObjectUniforms {
    pub local_to_world: Mat4,
}

impl Default for ObjectUniforms {
    fn default() -> Self {
        Self {
            local_to_world: Mat4::IDENTITY,
        }
    }
}

impl ObjectUniforms {
    #[must_use]
    pub fn new(local_to_world: Mat4) -> Self {
        Self { local_to_world }
    }
}

/// Per-frame block (`@group(0) @binding(0)`).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct WorldUniforms {
    pub world_to_view: Mat4,
    pub view_to_clip: Mat4,
    /// Cascade `i` maps world space into the clip space of shadow map `i`.
    pub world_to_shadow: [Mat4; SHADOW_CASCADE_COUNT],
    pub camera_position: Vec3,
    pub time: f32,
    /// Far view distance of each cascade, increasing.
    pub cascade_splits: Vec4,
}

impl Default for WorldUniforms {
    fn default() -> Self {
        Self {
            world_to_view: Mat4::IDENTITY,
            view_to_clip: Mat4::IDENTITY,
            world_to_shadow: [Mat4::IDENTITY; SHADOW_CASCADE_COUNT],
            camera_position: Vec3::ZERO,
            time: 0.0,
            cascade_splits: Vec4::ZERO,
        }
    }
}

impl WorldUniforms {
    /// Camera-only block; shadow matrices stay identity.
    #[must_use]
    pub fn from_camera(world_to_view: Mat4, view_to_clip: Mat4) -> Self {
        let camera_position = world_to_view.inverse().w_axis.truncate();
        Self {
            world_to_view,
            view_to_clip,
            camera_position,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_shadows(
        mut self,
        world_to_shadow: [Mat4; SHADOW_CASCADE_COUNT],
        cascade_splits: [f32; SHADOW_CASCADE_COUNT],
    ) -> Self {
        self.world_to_shadow = world_to_shadow;
        self.cascade_splits = Vec4::from_array(cascade_splits);
        self
    }

    #[inline]
    #[must_use]
    pub fn world_to_clip(&self) -> Mat4 {
        self.view_to_clip * self.world_to_view
    }
}

/// Per-material block (`@group(1) @binding(0)` in the mesh skeleton).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MaterialUniforms {
    pub albedo_tint: Vec4,
}

impl Default for MaterialUniforms {
    fn default() -> Self {
        Self {
            albedo_tint: Vec4::ONE,
        }
    }
}

/// Per-pass block of the shadow skeleton (`@group(1) @binding(0)`).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ShadowPassUniforms {
    pub cascade: u32,
    pub _pad: [u32; 3],
}

impl ShadowPassUniforms {
    /// Selects the cascade rendered by one shadow pass.
    ///
    /// # Panics
    ///
    /// Panics if `cascade` is not below [`SHADOW_CASCADE_COUNT`]; the shader
    /// indexes `world_to_shadow` with it unchecked.
    #[must_use]
    pub fn new(cascade: u32) -> Self {
        assert!(
            usize::try_from(cascade).is_ok_and(|c| c < SHADOW_CASCADE_COUNT),
            "shadow cascade {cascade} out of range (0..{SHADOW_CASCADE_COUNT})"
        );
        Self {
            cascade,
            _pad: [0; 3],
        }
    }
}

//! Resource slot numbering shared by the SPIR-V code generator and the
//! descriptor slot mapping.
//!
//! Every D3D register that names a resource (`cb#`, `t#`, `s#`, `u#`) is
//! assigned a *slot id* that is unique across all shader stages:
//!
//! ```text
//! slot = stage_index * SLOTS_PER_STAGE + class_base + register
//! ```
//!
//! Slot ids are what the generated SPIR-V carries in its `Binding`
//! decorations. They are sparse; [`crate::DescriptorSlotMapping`] turns the
//! slots a pipeline actually uses into dense binding indices.

use aero_dxbc::ShaderStage;

/// Base slot offset for `cb#` constant buffers.
pub const BINDING_BASE_CBUFFER: u32 = 0;
/// Base slot offset for `t#` shader resource views (textures and buffers).
pub const BINDING_BASE_TEXTURE: u32 = 32;
/// Base slot offset for `s#` samplers.
pub const BINDING_BASE_SAMPLER: u32 = 160;
/// Base slot offset for SM5 `u#` unordered access views.
///
/// Placed directly after the sampler range; D3D11 caps samplers at `s0..s15`
/// so valid sampler slots never reach it.
pub const BINDING_BASE_UAV: u32 = BINDING_BASE_SAMPLER + MAX_SAMPLER_SLOTS;

/// Slot ids reserved per shader stage.
pub const SLOTS_PER_STAGE: u32 = BINDING_BASE_UAV + MAX_UAV_SLOTS;

/// D3D10/11 exposes 14 constant buffer slots per shader stage (`cb0..cb13`).
pub const D3D11_MAX_CONSTANT_BUFFER_SLOTS: u32 = 14;

/// Number of SRV (`t#`) slots that fit between the texture and sampler bases.
pub const MAX_TEXTURE_SLOTS: u32 = BINDING_BASE_SAMPLER - BINDING_BASE_TEXTURE;

/// D3D11 exposes 16 sampler slots per shader stage (`s0..s15`).
pub const MAX_SAMPLER_SLOTS: u32 = 16;

/// D3D11 exposes 8 UAV slots to SM5 shaders (`u0..u7`).
pub const MAX_UAV_SLOTS: u32 = 8;

/// Register class of a resource slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    ConstantBuffer,
    ShaderResource,
    Sampler,
    UnorderedAccess,
}

impl ResourceClass {
    pub fn base(self) -> u32 {
        match self {
            Self::ConstantBuffer => BINDING_BASE_CBUFFER,
            Self::ShaderResource => BINDING_BASE_TEXTURE,
            Self::Sampler => BINDING_BASE_SAMPLER,
            Self::UnorderedAccess => BINDING_BASE_UAV,
        }
    }

    /// Number of registers of this class per stage.
    pub fn max_slots(self) -> u32 {
        match self {
            Self::ConstantBuffer => D3D11_MAX_CONSTANT_BUFFER_SLOTS,
            Self::ShaderResource => MAX_TEXTURE_SLOTS,
            Self::Sampler => MAX_SAMPLER_SLOTS,
            Self::UnorderedAccess => MAX_UAV_SLOTS,
        }
    }

    /// Register prefix used in diagnostics.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::ConstantBuffer => "cb",
            Self::ShaderResource => "t",
            Self::Sampler => "s",
            Self::UnorderedAccess => "u",
        }
    }
}

/// Position of `stage` in the slot id space, `None` for unknown stages.
pub fn stage_index(stage: ShaderStage) -> Option<u32> {
    match stage {
        ShaderStage::Vertex => Some(0),
        ShaderStage::Pixel => Some(1),
        ShaderStage::Compute => Some(2),
        ShaderStage::Geometry => Some(3),
        ShaderStage::Hull => Some(4),
        ShaderStage::Domain => Some(5),
        ShaderStage::Unknown(_) => None,
    }
}

/// Slot id of register `register` of `class` in `stage`.
///
/// Returns `None` when the register is past the class's per-stage limit or the
/// stage is unknown.
pub fn compute_resource_slot_id(
    stage: ShaderStage,
    class: ResourceClass,
    register: u32,
) -> Option<u32> {
    if register >= class.max_slots() {
        return None;
    }
    Some(stage_index(stage)? * SLOTS_PER_STAGE + class.base() + register)
}

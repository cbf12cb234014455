use aero_dxbc::ShaderStage;
use aero_spirv::SpirvCodeBuffer;
use bitflags::bitflags;
use thiserror::Error;

use crate::slot_mapping::{DescriptorSlotMapping, SlotMappingError};

bitflags! {
    /// Set of shader stages a binding is visible to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const PIXEL = 1 << 1;
        const COMPUTE = 1 << 2;
        const GEOMETRY = 1 << 3;
        const HULL = 1 << 4;
        const DOMAIN = 1 << 5;
    }
}

impl ShaderStages {
    pub fn from_stage(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => Self::VERTEX,
            ShaderStage::Pixel => Self::PIXEL,
            ShaderStage::Compute => Self::COMPUTE,
            ShaderStage::Geometry => Self::GEOMETRY,
            ShaderStage::Hull => Self::HULL,
            ShaderStage::Domain => Self::DOMAIN,
            ShaderStage::Unknown(_) => Self::empty(),
        }
    }
}

/// Descriptor type behind a resource slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    UniformBuffer,
    SampledImage,
    UniformTexelBuffer,
    Sampler,
}

/// A resource slot declared by a shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceSlot {
    /// Slot id, see [`crate::binding_model`].
    pub slot: u32,
    pub kind: ResourceKind,
}

/// A translated shader: stage, declared slots and SPIR-V code.
///
/// Immutable once built and shared through `Arc`; module creation only reads
/// it and rewrites a private copy of the code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shader {
    stage: ShaderStage,
    slots: Vec<ResourceSlot>,
    code: SpirvCodeBuffer,
}

impl Shader {
    pub fn new(stage: ShaderStage, slots: Vec<ResourceSlot>, code: SpirvCodeBuffer) -> Self {
        Self { stage, slots, code }
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Declared slots, in declaration order.
    pub fn slots(&self) -> &[ResourceSlot] {
        &self.slots
    }

    /// Code with slot ids in its binding decorations.
    pub fn code(&self) -> &SpirvCodeBuffer {
        &self.code
    }

    /// Registers every declared slot with `mapping`.
    pub fn define_resource_slots(
        &self,
        mapping: &mut DescriptorSlotMapping,
    ) -> Result<(), SlotMappingError> {
        let stages = ShaderStages::from_stage(self.stage);
        for slot in &self.slots {
            mapping.define_slot(slot.slot, slot.kind, stages)?;
        }
        Ok(())
    }

    /// Copy of the code with each binding decoration rewritten from slot id to
    /// the dense binding index assigned by `mapping`.
    pub fn remapped_code(
        &self,
        mapping: &DescriptorSlotMapping,
    ) -> Result<SpirvCodeBuffer, SlotMappingError> {
        let mut code = self.code.clone();
        let mut unmapped = None;
        code.rewrite_bindings(|slot| match mapping.get_binding_id(slot) {
            Some(binding) => binding,
            None => {
                unmapped.get_or_insert(slot);
                slot
            }
        });
        match unmapped {
            Some(slot) => Err(SlotMappingError::UnmappedSlot { slot }),
            None => Ok(code),
        }
    }

    /// Rewrites the code against `mapping` and hands it to `factory`.
    pub fn create_shader_module<F: ShaderModuleFactory>(
        &self,
        factory: &F,
        mapping: &DescriptorSlotMapping,
    ) -> Result<ShaderModule<F::Module>, ShaderModuleError> {
        let code = self.remapped_code(mapping)?;
        let module = factory.create_module(self.stage, code.words())?;
        Ok(ShaderModule {
            stage: self.stage,
            module,
        })
    }
}

/// Backend that turns SPIR-V words into a native shader module.
pub trait ShaderModuleFactory {
    type Module;

    fn create_module(&self, stage: ShaderStage, code: &[u32])
        -> Result<Self::Module, ShaderModuleError>;
}

/// A backend shader module created from a [`Shader`].
///
/// Owns the native handle; dropping it releases the module. Not `Clone`, share
/// it by reference or `Arc`.
#[derive(Debug)]
pub struct ShaderModule<M> {
    stage: ShaderStage,
    module: M,
}

impl<M> ShaderModule<M> {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn module(&self) -> &M {
        &self.module
    }

    pub fn into_inner(self) -> M {
        self.module
    }
}

#[derive(Debug, Error)]
pub enum ShaderModuleError {
    #[error(transparent)]
    SlotMapping(#[from] SlotMappingError),
    #[error("shader stage {0:?} cannot be compiled by this backend")]
    UnsupportedStage(ShaderStage),
    #[error("backend rejected shader module: {message}")]
    Backend { message: String },
}

use std::collections::HashMap;

use thiserror::Error;

use crate::shader::{ResourceKind, ShaderStages};

/// One dense binding produced by [`DescriptorSlotMapping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingInfo {
    pub slot: u32,
    pub binding: u32,
    pub kind: ResourceKind,
    pub stages: ShaderStages,
}

/// Collects resource slots from the shaders of a pipeline and assigns each
/// distinct slot a dense binding index, in first-definition order.
#[derive(Debug, Clone, Default)]
pub struct DescriptorSlotMapping {
    bindings: Vec<BindingInfo>,
    by_slot: HashMap<u32, usize>,
}

impl DescriptorSlotMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `slot`, or widens its stage visibility if it is already defined.
    pub fn define_slot(
        &mut self,
        slot: u32,
        kind: ResourceKind,
        stages: ShaderStages,
    ) -> Result<(), SlotMappingError> {
        if let Some(&idx) = self.by_slot.get(&slot) {
            let existing = &mut self.bindings[idx];
            if existing.kind != kind {
                return Err(SlotMappingError::KindConflict {
                    slot,
                    existing: existing.kind,
                    requested: kind,
                });
            }
            existing.stages |= stages;
            return Ok(());
        }

        let binding = self.bindings.len() as u32;
        self.by_slot.insert(slot, self.bindings.len());
        self.bindings.push(BindingInfo {
            slot,
            binding,
            kind,
            stages,
        });
        Ok(())
    }

    /// Dense binding index of `slot`.
    pub fn get_binding_id(&self, slot: u32) -> Option<u32> {
        self.by_slot.get(&slot).map(|&idx| self.bindings[idx].binding)
    }

    pub fn binding_infos(&self) -> &[BindingInfo] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotMappingError {
    #[error("resource slot {slot} is not defined in the slot mapping")]
    UnmappedSlot { slot: u32 },
    #[error("resource slot {slot} defined as {requested:?} but already mapped as {existing:?}")]
    KindConflict {
        slot: u32,
        existing: ResourceKind,
        requested: ResourceKind,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_are_dense_in_definition_order() {
        let mut mapping = DescriptorSlotMapping::new();
        mapping
            .define_slot(220, ResourceKind::SampledImage, ShaderStages::PIXEL)
            .unwrap();
        mapping
            .define_slot(2, ResourceKind::UniformBuffer, ShaderStages::VERTEX)
            .unwrap();
        assert_eq!(mapping.get_binding_id(220), Some(0));
        assert_eq!(mapping.get_binding_id(2), Some(1));
        assert_eq!(mapping.get_binding_id(3), None);
    }

    #[test]
    fn duplicate_slots_merge_stages() {
        let mut mapping = DescriptorSlotMapping::new();
        mapping
            .define_slot(5, ResourceKind::UniformBuffer, ShaderStages::VERTEX)
            .unwrap();
        mapping
            .define_slot(5, ResourceKind::UniformBuffer, ShaderStages::PIXEL)
            .unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(
            mapping.binding_infos()[0].stages,
            ShaderStages::VERTEX | ShaderStages::PIXEL
        );
    }

    #[test]
    fn conflicting_kinds_are_rejected() {
        let mut mapping = DescriptorSlotMapping::new();
        mapping
            .define_slot(5, ResourceKind::UniformBuffer, ShaderStages::VERTEX)
            .unwrap();
        let err = mapping
            .define_slot(5, ResourceKind::Sampler, ShaderStages::VERTEX)
            .unwrap_err();
        assert!(matches!(err, SlotMappingError::KindConflict { slot: 5, .. }));
    }
}

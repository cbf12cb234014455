use std::collections::HashMap;

use aero_dxbc::{
    ComponentMask, InterpolationMode, OperandType, ResourceDim, ResourceReturnType, SamplerMode,
    ShaderStage, Swizzle, SystemValue,
};
use aero_spirv::spirv::{
    self, BuiltIn, Capability, Decoration, Dim, ExecutionMode, ExecutionModel, FunctionControl,
    ImageFormat, Word,
};
use aero_spirv::SpirvModule;
use tracing::debug;

use super::{
    CodeGen, CodeGenError, CodeGenResult, InterfaceVarDecl, Pointer, PointerType, ScalarType,
    StorageClass, Value, ValueType,
};
use crate::binding_model::{compute_resource_slot_id, ResourceClass};
use crate::options::CompilerOptions;
use crate::shader::{ResourceKind, ResourceSlot, Shader};

const VEC4_F32: ValueType = ValueType::vec4(ScalarType::Float32);

const TEMP_PTR: PointerType = PointerType {
    value: VEC4_F32,
    class: StorageClass::Private,
};

type BinaryOp = fn(&mut SpirvModule, Word, Word, Word) -> Word;

#[derive(Debug, Clone, Copy)]
struct ResourceInfo {
    var: Word,
    image_type: Word,
    dim: ResourceDim,
    sampled: ScalarType,
}

#[derive(Debug, Clone, Copy)]
struct InterfaceVar {
    var: Word,
    class: StorageClass,
}

/// [`CodeGen`] emitting a single-entry-point SPIR-V module.
///
/// Every register is a `vec4<f32>`; integer views are produced with bitcasts.
/// Resources are bound in descriptor set 0 with their slot id (see
/// [`crate::binding_model`]) as the binding number.
#[derive(Debug)]
pub struct SpirvCodeGen {
    stage: ShaderStage,
    model: ExecutionModel,
    module: SpirvModule,
    entry_point: Word,
    entry_point_name: String,
    debug_names: bool,
    block_open: bool,
    thread_group: Option<[u32; 3]>,
    temps: Vec<Word>,
    interface: HashMap<(OperandType, u32), InterfaceVar>,
    interface_ids: Vec<Word>,
    constant_buffers: HashMap<u32, Word>,
    resources: HashMap<u32, ResourceInfo>,
    samplers: HashMap<u32, Word>,
    slots: Vec<ResourceSlot>,
}

impl SpirvCodeGen {
    /// Starts the entry point function for `stage`.
    ///
    /// Only vertex, pixel and compute shaders can be expressed.
    pub fn new(stage: ShaderStage, options: &CompilerOptions) -> CodeGenResult<Self> {
        let model = match stage {
            ShaderStage::Vertex => ExecutionModel::Vertex,
            ShaderStage::Pixel => ExecutionModel::Fragment,
            ShaderStage::Compute => ExecutionModel::GLCompute,
            other => {
                return Err(CodeGenError::not_implemented(format!(
                    "{} shaders",
                    other.short_name()
                )))
            }
        };

        let mut module = SpirvModule::new();
        module.enable_capability(Capability::Shader);
        let void = module.def_void_type();
        let fn_type = module.def_function_type(void, &[]);
        let entry_point = module.allocate_id();
        module.function_begin(void, entry_point, fn_type, FunctionControl::NONE);
        let label = module.allocate_id();
        module.op_label(label);
        if options.debug_names {
            module.set_debug_name(entry_point, &options.entry_point);
        }

        Ok(Self {
            stage,
            model,
            module,
            entry_point,
            entry_point_name: options.entry_point.clone(),
            debug_names: options.debug_names,
            block_open: true,
            thread_group: None,
            temps: Vec::new(),
            interface: HashMap::new(),
            interface_ids: Vec::new(),
            constant_buffers: HashMap::new(),
            resources: HashMap::new(),
            samplers: HashMap::new(),
            slots: Vec::new(),
        })
    }

    /// Function body builder. Opens a fresh block if the last one was closed
    /// by a return.
    fn code(&mut self) -> &mut SpirvModule {
        if !self.block_open {
            let label = self.module.allocate_id();
            self.module.op_label(label);
            self.block_open = true;
        }
        &mut self.module
    }

    fn name(&mut self, id: Word, name: &str) {
        if self.debug_names {
            self.module.set_debug_name(id, name);
        }
    }

    fn scalar_type_id(&mut self, scalar: ScalarType) -> Word {
        match scalar {
            ScalarType::Uint32 => self.module.def_int_type(32, false),
            ScalarType::Sint32 => self.module.def_int_type(32, true),
            ScalarType::Float32 => self.module.def_float_type(32),
        }
    }

    fn value_type_id(&mut self, ty: ValueType) -> Word {
        let scalar = self.scalar_type_id(ty.scalar);
        if ty.count == 1 {
            scalar
        } else {
            self.module.def_vector_type(scalar, ty.count)
        }
    }

    fn pointer_type_id(&mut self, ty: PointerType) -> Word {
        let value = self.value_type_id(ty.value);
        self.module.def_pointer_type(value, spv_storage_class(ty.class))
    }

    fn slot_id(&self, class: ResourceClass, register: u32) -> CodeGenResult<u32> {
        compute_resource_slot_id(self.stage, class, register).ok_or(
            CodeGenError::SlotOutOfRange {
                prefix: class.prefix(),
                register,
            },
        )
    }

    fn const_splat_f32(&mut self, value: f32, count: u32) -> Word {
        let scalar = self.module.const_f32(value);
        if count == 1 {
            return scalar;
        }
        let ty = self.value_type_id(ValueType::new(ScalarType::Float32, count));
        self.module
            .const_composite(ty, &vec![scalar; count as usize])
    }

    /// Packs `components` of `value`; every index must be in range.
    fn select_components(&mut self, value: Value, components: &[u32]) -> Value {
        let ty = ValueType::new(value.ty.scalar, components.len() as u32);
        if value.ty.count == 1 && components.len() == 1 {
            return value;
        }
        let ty_id = self.value_type_id(ty);
        let id = if value.ty.count == 1 {
            let constituents = vec![value.id; components.len()];
            self.code().op_composite_construct(ty_id, &constituents)
        } else if components.len() == 1 {
            self.code().op_composite_extract(ty_id, value.id, components)
        } else {
            self.code()
                .op_vector_shuffle(ty_id, value.id, value.id, components)
        };
        Value { id, ty }
    }

    fn binary(&mut self, a: Value, b: Value, float_op: BinaryOp, int_op: BinaryOp) -> CodeGenResult<Value> {
        expect_same_type(a, b)?;
        let ty = self.value_type_id(a.ty);
        let op = if a.ty.scalar == ScalarType::Float32 {
            float_op
        } else {
            int_op
        };
        let id = op(self.code(), ty, a.id, b.id);
        Ok(Value { id, ty: a.ty })
    }

    fn builtin_for(&self, operand_type: OperandType, system_value: SystemValue) -> Option<BuiltIn> {
        match (self.stage, operand_type, system_value) {
            (ShaderStage::Vertex, OperandType::Output, SystemValue::Position) => {
                Some(BuiltIn::Position)
            }
            (ShaderStage::Pixel, OperandType::Input, SystemValue::Position) => {
                Some(BuiltIn::FragCoord)
            }
            _ => None,
        }
    }

    fn decorate_interpolation(&mut self, var: Word, mode: InterpolationMode) {
        let decorations: &[Decoration] = match mode {
            InterpolationMode::Undefined | InterpolationMode::Linear => &[],
            InterpolationMode::Constant => &[Decoration::Flat],
            InterpolationMode::LinearCentroid => &[Decoration::Centroid],
            InterpolationMode::LinearNoPerspective => &[Decoration::NoPerspective],
            InterpolationMode::LinearNoPerspectiveCentroid => {
                &[Decoration::NoPerspective, Decoration::Centroid]
            }
            InterpolationMode::LinearSample => &[Decoration::Sample],
            InterpolationMode::LinearNoPerspectiveSample => {
                &[Decoration::NoPerspective, Decoration::Sample]
            }
        };
        for &decoration in decorations {
            if decoration == Decoration::Sample {
                self.module.enable_capability(Capability::SampleRateShading);
            }
            self.module.decorate(var, decoration, &[]);
        }
    }
}

fn spv_storage_class(class: StorageClass) -> spirv::StorageClass {
    match class {
        StorageClass::Private => spirv::StorageClass::Private,
        StorageClass::Input => spirv::StorageClass::Input,
        StorageClass::Output => spirv::StorageClass::Output,
        StorageClass::Uniform => spirv::StorageClass::Uniform,
        StorageClass::UniformConstant => spirv::StorageClass::UniformConstant,
    }
}

fn expect_same_type(a: Value, b: Value) -> CodeGenResult<()> {
    if a.ty != b.ty {
        return Err(CodeGenError::TypeMismatch {
            expected: a.ty,
            found: b.ty,
        });
    }
    Ok(())
}

fn expect_float(value: Value) -> CodeGenResult<()> {
    if value.ty.scalar != ScalarType::Float32 {
        return Err(CodeGenError::TypeMismatch {
            expected: value.ty.with_scalar(ScalarType::Float32),
            found: value.ty,
        });
    }
    Ok(())
}

/// Whether `mask` only names components below `count`.
fn mask_fits(mask: ComponentMask, count: u32) -> bool {
    !mask.is_empty() && mask.bits() & !ComponentMask::first_n(count).bits() == 0
}

impl CodeGen for SpirvCodeGen {
    type Output = Shader;

    fn dcl_temps(&mut self, count: u32) -> CodeGenResult<()> {
        let ptr_ty = self.pointer_type_id(TEMP_PTR);
        while (self.temps.len() as u32) < count {
            let var = self.module.new_var(ptr_ty, spirv::StorageClass::Private);
            self.name(var, &format!("r{}", self.temps.len()));
            self.temps.push(var);
        }
        Ok(())
    }

    fn dcl_constant_buffer(&mut self, register: u32, size: u32) -> CodeGenResult<()> {
        let slot = self.slot_id(ResourceClass::ConstantBuffer, register)?;
        if self.constant_buffers.contains_key(&register) {
            return Ok(());
        }

        let vec4 = self.value_type_id(VEC4_F32);
        let length = self.module.const_u32(size.max(1));
        let array = self.module.def_array_type_unique(vec4, length);
        self.module.decorate(array, Decoration::ArrayStride, &[16]);
        let block = self.module.def_struct_type_unique(&[array]);
        self.module.decorate(block, Decoration::Block, &[]);
        self.module
            .member_decorate(block, 0, Decoration::Offset, &[0]);
        let ptr_ty = self
            .module
            .def_pointer_type(block, spirv::StorageClass::Uniform);
        let var = self.module.new_var(ptr_ty, spirv::StorageClass::Uniform);
        self.module.decorate_descriptor_set_binding(var, 0, slot);
        if self.debug_names {
            self.module.set_debug_name(block, &format!("cb{register}_t"));
            self.module.set_debug_member_name(block, 0, "data");
            self.module.set_debug_name(var, &format!("cb{register}"));
        }

        self.constant_buffers.insert(register, var);
        self.slots.push(ResourceSlot {
            slot,
            kind: ResourceKind::UniformBuffer,
        });
        Ok(())
    }

    fn dcl_resource(
        &mut self,
        register: u32,
        dim: ResourceDim,
        return_type: ResourceReturnType,
    ) -> CodeGenResult<()> {
        let slot = self.slot_id(ResourceClass::ShaderResource, register)?;
        let sampled = match return_type {
            ResourceReturnType::Float | ResourceReturnType::Unorm | ResourceReturnType::Snorm => {
                ScalarType::Float32
            }
            ResourceReturnType::Sint => ScalarType::Sint32,
            ResourceReturnType::Uint => ScalarType::Uint32,
            other => {
                return Err(CodeGenError::not_implemented(format!(
                    "{other} resource return type"
                )))
            }
        };
        let (spv_dim, capability) = match dim {
            ResourceDim::Buffer => (Dim::DimBuffer, Some(Capability::SampledBuffer)),
            ResourceDim::Texture1D | ResourceDim::Texture1DArray => {
                (Dim::Dim1D, Some(Capability::Sampled1D))
            }
            ResourceDim::Texture2D
            | ResourceDim::Texture2DArray
            | ResourceDim::Texture2DMs
            | ResourceDim::Texture2DMsArray => (Dim::Dim2D, None),
            ResourceDim::Texture3D => (Dim::Dim3D, None),
            ResourceDim::TextureCube => (Dim::DimCube, None),
            ResourceDim::TextureCubeArray => (Dim::DimCube, Some(Capability::SampledCubeArray)),
            other => {
                return Err(CodeGenError::not_implemented(format!(
                    "{other} resources"
                )))
            }
        };
        if self.resources.contains_key(&register) {
            return Ok(());
        }
        if let Some(capability) = capability {
            self.module.enable_capability(capability);
        }

        let sampled_type = self.scalar_type_id(sampled);
        let image_type = self.module.def_image_type(
            sampled_type,
            spv_dim,
            0,
            dim.is_array(),
            dim.is_multisampled(),
            1,
            ImageFormat::Unknown,
        );
        let ptr_ty = self
            .module
            .def_pointer_type(image_type, spirv::StorageClass::UniformConstant);
        let var = self
            .module
            .new_var(ptr_ty, spirv::StorageClass::UniformConstant);
        self.module.decorate_descriptor_set_binding(var, 0, slot);
        self.name(var, &format!("t{register}"));

        self.resources.insert(
            register,
            ResourceInfo {
                var,
                image_type,
                dim,
                sampled,
            },
        );
        let kind = if dim.is_buffer() {
            ResourceKind::UniformTexelBuffer
        } else {
            ResourceKind::SampledImage
        };
        self.slots.push(ResourceSlot { slot, kind });
        Ok(())
    }

    fn dcl_sampler(&mut self, register: u32, mode: SamplerMode) -> CodeGenResult<()> {
        let slot = self.slot_id(ResourceClass::Sampler, register)?;
        if self.samplers.contains_key(&register) {
            return Ok(());
        }
        if mode == SamplerMode::Comparison {
            debug!(register, "comparison sampler declared as a plain sampler");
        }

        let sampler_ty = self.module.def_sampler_type();
        let ptr_ty = self
            .module
            .def_pointer_type(sampler_ty, spirv::StorageClass::UniformConstant);
        let var = self
            .module
            .new_var(ptr_ty, spirv::StorageClass::UniformConstant);
        self.module.decorate_descriptor_set_binding(var, 0, slot);
        self.name(var, &format!("s{register}"));

        self.samplers.insert(register, var);
        self.slots.push(ResourceSlot {
            slot,
            kind: ResourceKind::Sampler,
        });
        Ok(())
    }

    fn dcl_interface_var(&mut self, decl: &InterfaceVarDecl) -> CodeGenResult<()> {
        let prefix = decl.operand_type.label();
        if let Some(region) = decl.region {
            return Err(CodeGenError::not_implemented(format!(
                "two-dimensional interface register {prefix}[{region}][{}]",
                decl.register
            )));
        }
        let class = match decl.operand_type {
            OperandType::Input => StorageClass::Input,
            OperandType::Output => StorageClass::Output,
            other => {
                return Err(CodeGenError::not_implemented(format!(
                    "interface register type {other}"
                )))
            }
        };
        let key = (decl.operand_type, decl.register);
        if self.interface.contains_key(&key) {
            return Ok(());
        }

        let ptr_ty = self.pointer_type_id(PointerType {
            value: VEC4_F32,
            class,
        });
        let var = self.module.new_var(ptr_ty, spv_storage_class(class));
        match self.builtin_for(decl.operand_type, decl.system_value) {
            Some(builtin) => self.module.decorate_builtin(var, builtin),
            None => {
                self.module.decorate_location(var, decl.register);
                if class == StorageClass::Input && self.stage == ShaderStage::Pixel {
                    self.decorate_interpolation(var, decl.interpolation);
                }
            }
        }
        self.name(var, &format!("{prefix}{}", decl.register));

        self.interface.insert(key, InterfaceVar { var, class });
        self.interface_ids.push(var);
        Ok(())
    }

    fn dcl_thread_group(&mut self, x: u32, y: u32, z: u32) -> CodeGenResult<()> {
        if self.model != ExecutionModel::GLCompute {
            return Err(CodeGenError::not_implemented(
                "thread group size outside compute shaders",
            ));
        }
        self.thread_group = Some([x, y, z]);
        Ok(())
    }

    fn supports_system_value(&self, operand_type: OperandType, system_value: SystemValue) -> bool {
        system_value == SystemValue::Undefined
            || self.builtin_for(operand_type, system_value).is_some()
    }

    fn def_const_scalar(&mut self, scalar: ScalarType, bits: u32) -> CodeGenResult<Value> {
        let ty = self.scalar_type_id(scalar);
        Ok(Value {
            id: self.module.const_bits(ty, bits),
            ty: ValueType::scalar(scalar),
        })
    }

    fn def_const_vector(&mut self, scalar: ScalarType, bits: [u32; 4]) -> CodeGenResult<Value> {
        let scalar_ty = self.scalar_type_id(scalar);
        let components = bits.map(|b| self.module.const_bits(scalar_ty, b));
        let ty = ValueType::vec4(scalar);
        let ty_id = self.value_type_id(ty);
        Ok(Value {
            id: self.module.const_composite(ty_id, &components),
            ty,
        })
    }

    fn ptr_temp_reg(&mut self, index: u32) -> CodeGenResult<Pointer> {
        self.temps
            .get(index as usize)
            .map(|&id| Pointer { id, ty: TEMP_PTR })
            .ok_or(CodeGenError::Undeclared { kind: "r", index })
    }

    fn ptr_interface_var(
        &mut self,
        operand_type: OperandType,
        register: u32,
    ) -> CodeGenResult<Pointer> {
        let var = self
            .interface
            .get(&(operand_type, register))
            .ok_or(CodeGenError::Undeclared {
                kind: operand_type.label(),
                index: register,
            })?;
        Ok(Pointer {
            id: var.var,
            ty: PointerType {
                value: VEC4_F32,
                class: var.class,
            },
        })
    }

    fn ptr_constant_buffer(&mut self, register: u32, element: Value) -> CodeGenResult<Pointer> {
        let var = *self
            .constant_buffers
            .get(&register)
            .ok_or(CodeGenError::Undeclared {
                kind: "cb",
                index: register,
            })?;
        if !element.ty.scalar.is_integer() || element.ty.count != 1 {
            return Err(CodeGenError::TypeMismatch {
                expected: ValueType::scalar(ScalarType::Uint32),
                found: element.ty,
            });
        }

        let ty = PointerType {
            value: VEC4_F32,
            class: StorageClass::Uniform,
        };
        let ptr_ty = self.pointer_type_id(ty);
        let member = self.module.const_u32(0);
        let id = self
            .code()
            .op_access_chain(ptr_ty, var, &[member, element.id]);
        Ok(Pointer { id, ty })
    }

    fn reg_load(&mut self, ptr: Pointer) -> CodeGenResult<Value> {
        let ty = self.value_type_id(ptr.ty.value);
        let id = self.code().op_load(ty, ptr.id);
        Ok(Value {
            id,
            ty: ptr.ty.value,
        })
    }

    fn reg_store(&mut self, ptr: Pointer, value: Value, mask: ComponentMask) -> CodeGenResult<()> {
        if !ptr.ty.class.is_writable() {
            return Err(CodeGenError::ReadOnlyStorage {
                class: ptr.ty.class,
            });
        }
        let target = ptr.ty.value;
        if value.ty.scalar != target.scalar {
            return Err(CodeGenError::TypeMismatch {
                expected: value.ty.with_scalar(target.scalar),
                found: value.ty,
            });
        }
        if !mask_fits(mask, target.count) {
            return Err(CodeGenError::InvalidMask {
                mask,
                count: target.count,
            });
        }
        let positional = value.ty.count == target.count;
        if !positional && value.ty.count != mask.component_count() {
            return Err(CodeGenError::InvalidMask {
                mask,
                count: value.ty.count,
            });
        }

        if positional && mask == ComponentMask::first_n(target.count) {
            self.code().op_store(ptr.id, value.id);
            return Ok(());
        }

        let target_ty = self.value_type_id(target);
        let old = self.code().op_load(target_ty, ptr.id);
        let merged = if value.ty.count == 1 {
            let component = mask.first_component().map_or(0, u32::from);
            self.code()
                .op_composite_insert(target_ty, value.id, old, &[component])
        } else {
            let mut packed = 0;
            let mut indices = Vec::with_capacity(target.count as usize);
            for i in 0..target.count {
                if mask.contains(i as u8) {
                    let source = if positional { i } else { packed };
                    packed += 1;
                    indices.push(target.count + source);
                } else {
                    indices.push(i);
                }
            }
            self.code()
                .op_vector_shuffle(target_ty, old, value.id, &indices)
        };
        self.code().op_store(ptr.id, merged);
        Ok(())
    }

    fn reg_cast(&mut self, value: Value, scalar: ScalarType) -> CodeGenResult<Value> {
        if value.ty.scalar == scalar {
            return Ok(value);
        }
        let ty = value.ty.with_scalar(scalar);
        let ty_id = self.value_type_id(ty);
        let id = self.code().op_bitcast(ty_id, value.id);
        Ok(Value { id, ty })
    }

    fn reg_extract(&mut self, value: Value, mask: ComponentMask) -> CodeGenResult<Value> {
        let count = value.ty.count;
        if !mask_fits(mask, count) {
            return Err(CodeGenError::InvalidMask { mask, count });
        }
        if mask == ComponentMask::first_n(count) {
            return Ok(value);
        }
        let components: Vec<u32> = mask.components().map(u32::from).collect();
        Ok(self.select_components(value, &components))
    }

    fn reg_swizzle(
        &mut self,
        value: Value,
        swizzle: Swizzle,
        mask: ComponentMask,
    ) -> CodeGenResult<Value> {
        let count = value.ty.count;
        if mask.is_empty() {
            return Err(CodeGenError::InvalidMask { mask, count });
        }
        let components: Vec<u32> = mask
            .components()
            .map(|c| u32::from(swizzle.get(c)))
            .collect();
        if let Some(&bad) = components.iter().find(|&&c| c >= count) {
            return Err(CodeGenError::InvalidMask {
                mask: ComponentMask::select(bad as u8),
                count,
            });
        }
        let identity = components.len() as u32 == count
            && components.iter().enumerate().all(|(i, &c)| c == i as u32);
        if identity {
            return Ok(value);
        }
        Ok(self.select_components(value, &components))
    }

    fn reg_vector(&mut self, value: Value, count: u32) -> CodeGenResult<Value> {
        if value.ty.count != 1 {
            return Err(CodeGenError::TypeMismatch {
                expected: ValueType::scalar(value.ty.scalar),
                found: value.ty,
            });
        }
        if count == 1 {
            return Ok(value);
        }
        let components = vec![0; count as usize];
        Ok(self.select_components(value, &components))
    }

    fn op_add(&mut self, a: Value, b: Value) -> CodeGenResult<Value> {
        self.binary(a, b, SpirvModule::op_fadd, SpirvModule::op_iadd)
    }

    fn op_mul(&mut self, a: Value, b: Value) -> CodeGenResult<Value> {
        self.binary(a, b, SpirvModule::op_fmul, SpirvModule::op_imul)
    }

    fn op_dot(&mut self, a: Value, b: Value) -> CodeGenResult<Value> {
        expect_same_type(a, b)?;
        if a.ty.scalar != ScalarType::Float32 {
            return Err(CodeGenError::not_implemented("integer dot product"));
        }
        if a.ty.count == 1 {
            return self.op_mul(a, b);
        }
        let ty = ValueType::scalar(ScalarType::Float32);
        let ty_id = self.value_type_id(ty);
        let id = self.code().op_dot(ty_id, a.id, b.id);
        Ok(Value { id, ty })
    }

    fn op_rsqrt(&mut self, a: Value) -> CodeGenResult<Value> {
        expect_float(a)?;
        let ty = self.value_type_id(a.ty);
        let id = self.code().op_inverse_sqrt(ty, a.id);
        Ok(Value { id, ty: a.ty })
    }

    fn op_abs(&mut self, a: Value) -> CodeGenResult<Value> {
        let ty = self.value_type_id(a.ty);
        let id = match a.ty.scalar {
            ScalarType::Float32 => self.code().op_fabs(ty, a.id),
            ScalarType::Sint32 => self.code().op_sabs(ty, a.id),
            ScalarType::Uint32 => return Ok(a),
        };
        Ok(Value { id, ty: a.ty })
    }

    fn op_neg(&mut self, a: Value) -> CodeGenResult<Value> {
        let ty = self.value_type_id(a.ty);
        let id = match a.ty.scalar {
            ScalarType::Float32 => self.code().op_fnegate(ty, a.id),
            ScalarType::Sint32 | ScalarType::Uint32 => self.code().op_snegate(ty, a.id),
        };
        Ok(Value { id, ty: a.ty })
    }

    fn op_saturate(&mut self, a: Value) -> CodeGenResult<Value> {
        expect_float(a)?;
        let ty = self.value_type_id(a.ty);
        let zero = self.const_splat_f32(0.0, a.ty.count);
        let one = self.const_splat_f32(1.0, a.ty.count);
        let id = self.code().op_fclamp(ty, a.id, zero, one);
        Ok(Value { id, ty: a.ty })
    }

    fn tex_sample(&mut self, texture: u32, sampler: u32, coord: Value) -> CodeGenResult<Value> {
        let resource = *self.resources.get(&texture).ok_or(CodeGenError::Undeclared {
            kind: "t",
            index: texture,
        })?;
        let sampler_var = *self.samplers.get(&sampler).ok_or(CodeGenError::Undeclared {
            kind: "s",
            index: sampler,
        })?;
        let base_count = match resource.dim {
            ResourceDim::Texture1D | ResourceDim::Texture1DArray => 1,
            ResourceDim::Texture2D | ResourceDim::Texture2DArray => 2,
            ResourceDim::Texture3D | ResourceDim::TextureCube | ResourceDim::TextureCubeArray => 3,
            other => {
                return Err(CodeGenError::not_implemented(format!(
                    "sampling {other} resources"
                )))
            }
        };
        // The array layer follows the texel coordinates.
        let coord_count = base_count + u32::from(resource.dim.is_array());
        expect_float(coord)?;
        if coord.ty.count < coord_count {
            return Err(CodeGenError::TypeMismatch {
                expected: ValueType::new(ScalarType::Float32, coord_count),
                found: coord.ty,
            });
        }
        let coord = self.reg_extract(coord, ComponentMask::first_n(coord_count))?;

        let sampler_ty = self.module.def_sampler_type();
        let sampled_image_ty = self.module.def_sampled_image_type(resource.image_type);
        let ty = ValueType::vec4(resource.sampled);
        let ty_id = self.value_type_id(ty);
        // Only fragment shaders have implicit derivatives.
        let lod = (self.model != ExecutionModel::Fragment).then(|| self.module.const_f32(0.0));

        let code = self.code();
        let image = code.op_load(resource.image_type, resource.var);
        let sampler = code.op_load(sampler_ty, sampler_var);
        let combined = code.op_sampled_image(sampled_image_ty, image, sampler);
        let id = match lod {
            Some(lod) => code.op_image_sample_explicit_lod(ty_id, combined, coord.id, lod),
            None => code.op_image_sample_implicit_lod(ty_id, combined, coord.id),
        };
        Ok(Value { id, ty })
    }

    fn fn_return(&mut self) -> CodeGenResult<()> {
        self.code().op_return();
        self.block_open = false;
        Ok(())
    }

    fn finalize(mut self) -> CodeGenResult<Shader> {
        if self.block_open {
            self.module.op_return();
        }
        self.module.function_end();
        self.module.add_entry_point(
            self.model,
            self.entry_point,
            &self.entry_point_name,
            &self.interface_ids,
        );
        match self.model {
            ExecutionModel::Fragment => {
                self.module
                    .set_execution_mode(self.entry_point, ExecutionMode::OriginUpperLeft, &[]);
            }
            ExecutionModel::GLCompute => {
                let size = self.thread_group.unwrap_or([1, 1, 1]);
                self.module
                    .set_execution_mode(self.entry_point, ExecutionMode::LocalSize, &size);
            }
            _ => {}
        }

        let code = self.module.compile();
        debug!(
            stage = self.stage.short_name(),
            words = code.len(),
            slots = self.slots.len(),
            "generated SPIR-V module"
        );
        Ok(Shader::new(self.stage, self.slots, code))
    }
}

use std::collections::HashMap;

use spirv::{
    AddressingModel, BuiltIn, Capability, Decoration, Dim, ExecutionMode, ExecutionModel,
    FunctionControl, GLOp, ImageFormat, ImageOperands, MemoryModel, Op, StorageClass, Word,
};

use crate::code_buffer::{string_words, SpirvCodeBuffer};

/// SPIR-V version emitted in the module header (1.0).
pub const SPIRV_VERSION: Word = 0x0001_0000;

/// Incremental SPIR-V module builder.
///
/// Instructions are appended to the logical-layout section they belong to and
/// concatenated by [`SpirvModule::compile`], so callers may declare types,
/// variables and decorations in any order while emitting function code.
/// Scalar, vector, pointer, function, image and sampler types as well as
/// scalar and composite constants are deduplicated; structs and arrays are
/// always fresh because they carry their own layout decorations.
#[derive(Debug)]
pub struct SpirvModule {
    id_bound: Word,
    capabilities: Vec<Capability>,
    glsl_std_450: Option<Word>,
    ext_imports: SpirvCodeBuffer,
    memory_model: SpirvCodeBuffer,
    entry_points: SpirvCodeBuffer,
    exec_modes: SpirvCodeBuffer,
    debug_names: SpirvCodeBuffer,
    annotations: SpirvCodeBuffer,
    globals: SpirvCodeBuffer,
    code: SpirvCodeBuffer,
    interned: HashMap<(u32, Vec<Word>), Word>,
}

impl Default for SpirvModule {
    fn default() -> Self {
        Self::new()
    }
}

impl SpirvModule {
    /// A module using the logical addressing model and the GLSL450 memory model.
    pub fn new() -> Self {
        let mut module = Self {
            id_bound: 1,
            capabilities: Vec::new(),
            glsl_std_450: None,
            ext_imports: SpirvCodeBuffer::new(),
            memory_model: SpirvCodeBuffer::new(),
            entry_points: SpirvCodeBuffer::new(),
            exec_modes: SpirvCodeBuffer::new(),
            debug_names: SpirvCodeBuffer::new(),
            annotations: SpirvCodeBuffer::new(),
            globals: SpirvCodeBuffer::new(),
            code: SpirvCodeBuffer::new(),
            interned: HashMap::new(),
        };
        module.set_memory_model(AddressingModel::Logical, MemoryModel::GLSL450);
        module
    }

    pub fn allocate_id(&mut self) -> Word {
        let id = self.id_bound;
        self.id_bound += 1;
        id
    }

    /// One past the largest id handed out so far.
    pub fn id_bound(&self) -> Word {
        self.id_bound
    }

    pub fn enable_capability(&mut self, capability: Capability) {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Id of the `GLSL.std.450` instruction set, imported on first use.
    pub fn glsl_std_450(&mut self) -> Word {
        if let Some(id) = self.glsl_std_450 {
            return id;
        }
        let id = self.allocate_id();
        let mut operands = vec![id];
        operands.extend(string_words("GLSL.std.450"));
        self.ext_imports.push_inst(Op::ExtInstImport, &operands);
        self.glsl_std_450 = Some(id);
        id
    }

    pub fn set_memory_model(&mut self, addressing: AddressingModel, memory: MemoryModel) {
        self.memory_model = SpirvCodeBuffer::new();
        self.memory_model
            .push_inst(Op::MemoryModel, &[addressing as u32, memory as u32]);
    }

    pub fn add_entry_point(
        &mut self,
        model: ExecutionModel,
        function: Word,
        name: &str,
        interfaces: &[Word],
    ) {
        let mut operands = vec![model as u32, function];
        operands.extend(string_words(name));
        operands.extend_from_slice(interfaces);
        self.entry_points.push_inst(Op::EntryPoint, &operands);
    }

    pub fn set_execution_mode(&mut self, entry: Word, mode: ExecutionMode, args: &[Word]) {
        let mut operands = vec![entry, mode as u32];
        operands.extend_from_slice(args);
        self.exec_modes.push_inst(Op::ExecutionMode, &operands);
    }

    pub fn set_debug_name(&mut self, id: Word, name: &str) {
        let mut operands = vec![id];
        operands.extend(string_words(name));
        self.debug_names.push_inst(Op::Name, &operands);
    }

    pub fn set_debug_member_name(&mut self, id: Word, member: u32, name: &str) {
        let mut operands = vec![id, member];
        operands.extend(string_words(name));
        self.debug_names.push_inst(Op::MemberName, &operands);
    }

    pub fn decorate(&mut self, id: Word, decoration: Decoration, args: &[Word]) {
        let mut operands = vec![id, decoration as u32];
        operands.extend_from_slice(args);
        self.annotations.push_inst(Op::Decorate, &operands);
    }

    pub fn member_decorate(&mut self, id: Word, member: u32, decoration: Decoration, args: &[Word]) {
        let mut operands = vec![id, member, decoration as u32];
        operands.extend_from_slice(args);
        self.annotations.push_inst(Op::MemberDecorate, &operands);
    }

    pub fn decorate_builtin(&mut self, id: Word, builtin: BuiltIn) {
        self.decorate(id, Decoration::BuiltIn, &[builtin as u32]);
    }

    pub fn decorate_location(&mut self, id: Word, location: u32) {
        self.decorate(id, Decoration::Location, &[location]);
    }

    pub fn decorate_descriptor_set_binding(&mut self, id: Word, set: u32, binding: u32) {
        self.decorate(id, Decoration::DescriptorSet, &[set]);
        self.decorate(id, Decoration::Binding, &[binding]);
    }

    fn intern(&mut self, op: Op, args: &[Word]) -> Word {
        let key = (op as u32, args.to_vec());
        if let Some(&id) = self.interned.get(&key) {
            return id;
        }
        let id = self.allocate_id();
        let mut operands = Vec::with_capacity(args.len() + 1);
        operands.push(id);
        operands.extend_from_slice(args);
        self.globals.push_inst(op, &operands);
        self.interned.insert(key, id);
        id
    }

    /// Like `intern`, for instructions whose result type precedes the result id.
    fn intern_typed(&mut self, op: Op, ty: Word, args: &[Word]) -> Word {
        let mut key_args = Vec::with_capacity(args.len() + 1);
        key_args.push(ty);
        key_args.extend_from_slice(args);
        let key = (op as u32, key_args);
        if let Some(&id) = self.interned.get(&key) {
            return id;
        }
        let id = self.allocate_id();
        let mut operands = Vec::with_capacity(args.len() + 2);
        operands.push(ty);
        operands.push(id);
        operands.extend_from_slice(args);
        self.globals.push_inst(op, &operands);
        self.interned.insert(key, id);
        id
    }

    pub fn def_void_type(&mut self) -> Word {
        self.intern(Op::TypeVoid, &[])
    }

    pub fn def_bool_type(&mut self) -> Word {
        self.intern(Op::TypeBool, &[])
    }

    pub fn def_int_type(&mut self, width: u32, signed: bool) -> Word {
        self.intern(Op::TypeInt, &[width, signed as u32])
    }

    pub fn def_float_type(&mut self, width: u32) -> Word {
        self.intern(Op::TypeFloat, &[width])
    }

    pub fn def_vector_type(&mut self, component: Word, count: u32) -> Word {
        self.intern(Op::TypeVector, &[component, count])
    }

    pub fn def_pointer_type(&mut self, pointee: Word, class: StorageClass) -> Word {
        self.intern(Op::TypePointer, &[class as u32, pointee])
    }

    pub fn def_function_type(&mut self, ret: Word, params: &[Word]) -> Word {
        let mut args = vec![ret];
        args.extend_from_slice(params);
        self.intern(Op::TypeFunction, &args)
    }

    /// Always a new type id, so `ArrayStride` can be decorated once per array.
    pub fn def_array_type_unique(&mut self, element: Word, length: Word) -> Word {
        let id = self.allocate_id();
        self.globals.push_inst(Op::TypeArray, &[id, element, length]);
        id
    }

    /// Always a new type id, so member offsets and `Block` can be decorated.
    pub fn def_struct_type_unique(&mut self, members: &[Word]) -> Word {
        let id = self.allocate_id();
        let mut operands = vec![id];
        operands.extend_from_slice(members);
        self.globals.push_inst(Op::TypeStruct, &operands);
        id
    }

    /// `OpTypeImage`; `depth` and `sampled` use the raw SPIR-V encodings
    /// (0 = no, 1 = yes, 2 = unknown).
    #[allow(clippy::too_many_arguments)]
    pub fn def_image_type(
        &mut self,
        sampled_type: Word,
        dim: Dim,
        depth: u32,
        arrayed: bool,
        multisampled: bool,
        sampled: u32,
        format: ImageFormat,
    ) -> Word {
        self.intern(
            Op::TypeImage,
            &[
                sampled_type,
                dim as u32,
                depth,
                arrayed as u32,
                multisampled as u32,
                sampled,
                format as u32,
            ],
        )
    }

    pub fn def_sampler_type(&mut self) -> Word {
        self.intern(Op::TypeSampler, &[])
    }

    pub fn def_sampled_image_type(&mut self, image: Word) -> Word {
        self.intern(Op::TypeSampledImage, &[image])
    }

    pub fn const_u32(&mut self, value: u32) -> Word {
        let ty = self.def_int_type(32, false);
        self.intern_typed(Op::Constant, ty, &[value])
    }

    pub fn const_i32(&mut self, value: i32) -> Word {
        let ty = self.def_int_type(32, true);
        self.intern_typed(Op::Constant, ty, &[value as u32])
    }

    pub fn const_f32(&mut self, value: f32) -> Word {
        let ty = self.def_float_type(32);
        self.intern_typed(Op::Constant, ty, &[value.to_bits()])
    }

    /// Scalar constant of type `ty` from raw bits.
    pub fn const_bits(&mut self, ty: Word, bits: u32) -> Word {
        self.intern_typed(Op::Constant, ty, &[bits])
    }

    pub fn const_composite(&mut self, ty: Word, constituents: &[Word]) -> Word {
        self.intern_typed(Op::ConstantComposite, ty, constituents)
    }

    /// Global variable of pointer type `pointer_type`.
    pub fn new_var(&mut self, pointer_type: Word, class: StorageClass) -> Word {
        let id = self.allocate_id();
        self.globals
            .push_inst(Op::Variable, &[pointer_type, id, class as u32]);
        id
    }

    pub fn function_begin(&mut self, ret: Word, id: Word, fn_type: Word, control: FunctionControl) {
        self.code
            .push_inst(Op::Function, &[ret, id, control.bits(), fn_type]);
    }

    pub fn function_end(&mut self) {
        self.code.push_inst(Op::FunctionEnd, &[]);
    }

    pub fn op_label(&mut self, id: Word) {
        self.code.push_inst(Op::Label, &[id]);
    }

    pub fn op_return(&mut self) {
        self.code.push_inst(Op::Return, &[]);
    }

    fn emit_typed(&mut self, op: Op, ty: Word, args: &[Word]) -> Word {
        let id = self.allocate_id();
        let mut operands = Vec::with_capacity(args.len() + 2);
        operands.push(ty);
        operands.push(id);
        operands.extend_from_slice(args);
        self.code.push_inst(op, &operands);
        id
    }

    pub fn op_load(&mut self, ty: Word, pointer: Word) -> Word {
        self.emit_typed(Op::Load, ty, &[pointer])
    }

    pub fn op_store(&mut self, pointer: Word, value: Word) {
        self.code.push_inst(Op::Store, &[pointer, value]);
    }

    pub fn op_access_chain(&mut self, ty: Word, base: Word, indices: &[Word]) -> Word {
        let mut args = vec![base];
        args.extend_from_slice(indices);
        self.emit_typed(Op::AccessChain, ty, &args)
    }

    pub fn op_vector_shuffle(&mut self, ty: Word, a: Word, b: Word, components: &[u32]) -> Word {
        let mut args = vec![a, b];
        args.extend_from_slice(components);
        self.emit_typed(Op::VectorShuffle, ty, &args)
    }

    pub fn op_composite_extract(&mut self, ty: Word, composite: Word, indices: &[u32]) -> Word {
        let mut args = vec![composite];
        args.extend_from_slice(indices);
        self.emit_typed(Op::CompositeExtract, ty, &args)
    }

    pub fn op_composite_insert(
        &mut self,
        ty: Word,
        object: Word,
        composite: Word,
        indices: &[u32],
    ) -> Word {
        let mut args = vec![object, composite];
        args.extend_from_slice(indices);
        self.emit_typed(Op::CompositeInsert, ty, &args)
    }

    pub fn op_composite_construct(&mut self, ty: Word, constituents: &[Word]) -> Word {
        self.emit_typed(Op::CompositeConstruct, ty, constituents)
    }

    pub fn op_bitcast(&mut self, ty: Word, value: Word) -> Word {
        self.emit_typed(Op::Bitcast, ty, &[value])
    }

    pub fn op_fadd(&mut self, ty: Word, a: Word, b: Word) -> Word {
        self.emit_typed(Op::FAdd, ty, &[a, b])
    }

    pub fn op_iadd(&mut self, ty: Word, a: Word, b: Word) -> Word {
        self.emit_typed(Op::IAdd, ty, &[a, b])
    }

    pub fn op_fmul(&mut self, ty: Word, a: Word, b: Word) -> Word {
        self.emit_typed(Op::FMul, ty, &[a, b])
    }

    pub fn op_imul(&mut self, ty: Word, a: Word, b: Word) -> Word {
        self.emit_typed(Op::IMul, ty, &[a, b])
    }

    pub fn op_dot(&mut self, ty: Word, a: Word, b: Word) -> Word {
        self.emit_typed(Op::Dot, ty, &[a, b])
    }

    pub fn op_fnegate(&mut self, ty: Word, value: Word) -> Word {
        self.emit_typed(Op::FNegate, ty, &[value])
    }

    pub fn op_snegate(&mut self, ty: Word, value: Word) -> Word {
        self.emit_typed(Op::SNegate, ty, &[value])
    }

    /// `OpExtInst` from the `GLSL.std.450` set.
    pub fn op_glsl(&mut self, ty: Word, op: GLOp, args: &[Word]) -> Word {
        let set = self.glsl_std_450();
        let mut operands = vec![set, op as u32];
        operands.extend_from_slice(args);
        self.emit_typed(Op::ExtInst, ty, &operands)
    }

    pub fn op_fabs(&mut self, ty: Word, value: Word) -> Word {
        self.op_glsl(ty, GLOp::FAbs, &[value])
    }

    pub fn op_sabs(&mut self, ty: Word, value: Word) -> Word {
        self.op_glsl(ty, GLOp::SAbs, &[value])
    }

    pub fn op_inverse_sqrt(&mut self, ty: Word, value: Word) -> Word {
        self.op_glsl(ty, GLOp::InverseSqrt, &[value])
    }

    pub fn op_fclamp(&mut self, ty: Word, value: Word, lo: Word, hi: Word) -> Word {
        self.op_glsl(ty, GLOp::FClamp, &[value, lo, hi])
    }

    pub fn op_sampled_image(&mut self, ty: Word, image: Word, sampler: Word) -> Word {
        self.emit_typed(Op::SampledImage, ty, &[image, sampler])
    }

    pub fn op_image_sample_implicit_lod(
        &mut self,
        ty: Word,
        sampled_image: Word,
        coordinate: Word,
    ) -> Word {
        self.emit_typed(Op::ImageSampleImplicitLod, ty, &[sampled_image, coordinate])
    }

    pub fn op_image_sample_explicit_lod(
        &mut self,
        ty: Word,
        sampled_image: Word,
        coordinate: Word,
        lod: Word,
    ) -> Word {
        self.emit_typed(
            Op::ImageSampleExplicitLod,
            ty,
            &[sampled_image, coordinate, ImageOperands::LOD.bits(), lod],
        )
    }

    /// Serializes the module: header followed by every section in logical
    /// layout order.
    pub fn compile(&self) -> SpirvCodeBuffer {
        let mut out = SpirvCodeBuffer::from_words(vec![
            spirv::MAGIC_NUMBER,
            SPIRV_VERSION,
            0,
            self.id_bound,
            0,
        ]);
        for &cap in &self.capabilities {
            out.push_inst(Op::Capability, &[cap as u32]);
        }
        out.append(&self.ext_imports);
        out.append(&self.memory_model);
        out.append(&self.entry_points);
        out.append(&self.exec_modes);
        out.append(&self.debug_names);
        out.append(&self.annotations);
        out.append(&self.globals);
        out.append(&self.code);
        out
    }
}

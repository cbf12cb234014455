//! Code generator interface driven by the DXBC translator.
//!
//! The translator only sees typed [`Value`]s and [`Pointer`]s; how they map to
//! an output IR is up to the [`CodeGen`] implementation. Values are immutable:
//! every operation returns a new one. Pointers are the only addressable
//! entities and can only be obtained through the `ptr_*` methods.

mod spirv;

use aero_dxbc::{
    ComponentMask, InterpolationMode, OperandType, ResourceDim, ResourceReturnType, SamplerMode,
    Swizzle, SystemValue,
};
use thiserror::Error;

pub use self::spirv::SpirvCodeGen;

/// Component type of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Uint32,
    Sint32,
    Float32,
}

impl ScalarType {
    pub fn is_integer(self) -> bool {
        matches!(self, Self::Uint32 | Self::Sint32)
    }
}

/// Scalar type and component count (1..=4) of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueType {
    pub scalar: ScalarType,
    pub count: u32,
}

impl ValueType {
    pub const fn new(scalar: ScalarType, count: u32) -> Self {
        Self { scalar, count }
    }

    pub const fn scalar(scalar: ScalarType) -> Self {
        Self::new(scalar, 1)
    }

    pub const fn vec4(scalar: ScalarType) -> Self {
        Self::new(scalar, 4)
    }

    pub const fn with_scalar(self, scalar: ScalarType) -> Self {
        Self::new(scalar, self.count)
    }
}

/// An immutable value produced by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Value {
    pub id: u32,
    pub ty: ValueType,
}

/// Storage class of a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    /// Temporary registers.
    Private,
    Input,
    Output,
    /// Constant buffer contents.
    Uniform,
    /// Textures and samplers.
    UniformConstant,
}

impl StorageClass {
    pub fn is_writable(self) -> bool {
        matches!(self, Self::Private | Self::Output)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointerType {
    pub value: ValueType,
    pub class: StorageClass,
}

/// An addressable location holding a value of `ty.value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pointer {
    pub id: u32,
    pub ty: PointerType,
}

/// Everything an interface declaration (`dcl_input*`/`dcl_output*`) carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceVarDecl {
    /// [`OperandType::Input`] or [`OperandType::Output`].
    pub operand_type: OperandType,
    pub register: u32,
    /// Region (vertex) dimension of two-dimensional declarations.
    pub region: Option<u32>,
    pub mask: ComponentMask,
    pub system_value: SystemValue,
    pub interpolation: InterpolationMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeGenError {
    /// The generator does not support this feature yet.
    #[error("not implemented: {what}")]
    NotImplemented { what: String },
    /// `kind` is the register prefix (`r`, `v`, `cb`, ...).
    #[error("{kind}{index} used before it was declared")]
    Undeclared { kind: &'static str, index: u32 },
    #[error("cannot store through a {class:?} pointer")]
    ReadOnlyStorage { class: StorageClass },
    #[error("register {prefix}{register} is outside the per-stage slot range")]
    SlotOutOfRange { prefix: &'static str, register: u32 },
    #[error("type mismatch: expected {expected:?}, found {found:?}")]
    TypeMismatch { expected: ValueType, found: ValueType },
    #[error("component mask .{mask} does not fit a {count}-component value")]
    InvalidMask { mask: ComponentMask, count: u32 },
}

impl CodeGenError {
    pub fn not_implemented(what: impl Into<String>) -> Self {
        Self::NotImplemented { what: what.into() }
    }
}

pub type CodeGenResult<T> = Result<T, CodeGenError>;

/// Operations the translator needs from an output IR.
///
/// Stores follow one rule: a value with as many components as the pointer
/// writes each masked component from the same position, while a value with as
/// many components as the mask writes the masked components in order.
pub trait CodeGen {
    /// Result of [`CodeGen::finalize`].
    type Output;

    fn dcl_temps(&mut self, count: u32) -> CodeGenResult<()>;
    /// Declares `cb{register}` holding `size` 16-byte elements.
    fn dcl_constant_buffer(&mut self, register: u32, size: u32) -> CodeGenResult<()>;
    fn dcl_resource(
        &mut self,
        register: u32,
        dim: ResourceDim,
        return_type: ResourceReturnType,
    ) -> CodeGenResult<()>;
    fn dcl_sampler(&mut self, register: u32, mode: SamplerMode) -> CodeGenResult<()>;
    fn dcl_interface_var(&mut self, decl: &InterfaceVarDecl) -> CodeGenResult<()>;
    fn dcl_thread_group(&mut self, x: u32, y: u32, z: u32) -> CodeGenResult<()>;

    /// Whether `system_value` on a register of `operand_type` can be expressed.
    fn supports_system_value(&self, operand_type: OperandType, system_value: SystemValue) -> bool;

    fn def_const_scalar(&mut self, scalar: ScalarType, bits: u32) -> CodeGenResult<Value>;
    fn def_const_vector(&mut self, scalar: ScalarType, bits: [u32; 4]) -> CodeGenResult<Value>;

    fn ptr_temp_reg(&mut self, index: u32) -> CodeGenResult<Pointer>;
    fn ptr_interface_var(&mut self, operand_type: OperandType, register: u32)
        -> CodeGenResult<Pointer>;
    /// Element `element` (an integer scalar) of `cb{register}`.
    fn ptr_constant_buffer(&mut self, register: u32, element: Value) -> CodeGenResult<Pointer>;

    fn reg_load(&mut self, ptr: Pointer) -> CodeGenResult<Value>;
    fn reg_store(&mut self, ptr: Pointer, value: Value, mask: ComponentMask) -> CodeGenResult<()>;
    /// Reinterprets the bits of `value` as `scalar`, keeping the component count.
    fn reg_cast(&mut self, value: Value, scalar: ScalarType) -> CodeGenResult<Value>;
    /// Packs the components selected by `mask`.
    fn reg_extract(&mut self, value: Value, mask: ComponentMask) -> CodeGenResult<Value>;
    /// Component `swizzle[i]` for each `i` in `mask`, packed.
    fn reg_swizzle(
        &mut self,
        value: Value,
        swizzle: Swizzle,
        mask: ComponentMask,
    ) -> CodeGenResult<Value>;
    /// Replicates a scalar into a `count`-component vector.
    fn reg_vector(&mut self, value: Value, count: u32) -> CodeGenResult<Value>;

    fn op_add(&mut self, a: Value, b: Value) -> CodeGenResult<Value>;
    fn op_mul(&mut self, a: Value, b: Value) -> CodeGenResult<Value>;
    fn op_dot(&mut self, a: Value, b: Value) -> CodeGenResult<Value>;
    fn op_rsqrt(&mut self, a: Value) -> CodeGenResult<Value>;
    fn op_abs(&mut self, a: Value) -> CodeGenResult<Value>;
    fn op_neg(&mut self, a: Value) -> CodeGenResult<Value>;
    /// Clamps to `[0, 1]`.
    fn op_saturate(&mut self, a: Value) -> CodeGenResult<Value>;

    /// Samples `t{texture}` with `s{sampler}`; returns four components.
    fn tex_sample(&mut self, texture: u32, sampler: u32, coord: Value) -> CodeGenResult<Value>;
    fn fn_return(&mut self) -> CodeGenResult<()>;

    fn finalize(self) -> CodeGenResult<Self::Output>;
}

//! DXBC SM4/SM5 to SPIR-V shader translation.
//!
//! [`compile_bytecode`] decodes a token program with `aero-dxbc`, walks its
//! instructions through [`DxbcCompiler`] and emits a SPIR-V module through
//! [`SpirvCodeGen`]. The result is an immutable [`Shader`] that records the
//! resource slots it declares; [`Shader::create_shader_module`] rewrites its
//! binding decorations against a [`DescriptorSlotMapping`] and hands the code
//! to a backend.
//!
//! Translation is deliberately partial. Instructions the translator does not
//! know are skipped and reported as [`Diagnostic`]s unless
//! [`CompilerOptions::strict_coverage`] is set.

#![forbid(unsafe_code)]

pub mod binding_model;
pub mod codegen;
mod compiler;
mod diagnostics;
mod error;
mod options;
pub mod runtime;
mod shader;
mod slot_mapping;

pub use crate::codegen::{
    CodeGen, CodeGenError, CodeGenResult, InterfaceVarDecl, Pointer, PointerType, ScalarType,
    SpirvCodeGen, StorageClass, Value, ValueType,
};
pub use crate::compiler::{
    compile_bytecode, compile_program, translate, DxbcCompiler, MAX_TEMPS,
};
pub use crate::diagnostics::{CompiledShader, Diagnostic, DiagnosticKind};
pub use crate::error::{CompileError, CompileErrorKind};
pub use crate::options::CompilerOptions;
pub use crate::runtime::shader_cache::{
    ShaderCache, ShaderCacheKey, ShaderCacheLookup, ShaderCacheSource, ShaderCacheStats,
};
pub use crate::runtime::state_object_set::StateObjectSet;
pub use crate::shader::{
    ResourceKind, ResourceSlot, Shader, ShaderModule, ShaderModuleError, ShaderModuleFactory,
    ShaderStages,
};
pub use crate::slot_mapping::{BindingInfo, DescriptorSlotMapping, SlotMappingError};

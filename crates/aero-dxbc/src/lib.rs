//! A bounds-checked decoder for SM4/SM5 (`SHDR`/`SHEX`) token programs.
//!
//! Programs are decoded lazily: [`Sm4Program::instructions`] yields one
//! [`Instruction`] at a time and each instruction exposes its operands through
//! a sequential [`OperandReader`]. Every read is checked against the declared
//! instruction and program lengths so malformed or truncated input yields a
//! [`DecodeError`] instead of a panic.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

mod enums;
mod error;
mod opcode;
mod operand;
mod program;
mod reader;
mod types;

/// Helpers for building synthetic SM4/SM5 token streams in tests.
///
/// This module is only available when compiling this crate's own tests, or when
/// the `test-utils` feature is enabled. It is **not** considered part of the
/// stable decoding API.
#[cfg(any(test, feature = "test-utils"))]
#[allow(missing_docs)]
pub mod test_utils;

pub use crate::enums::{
    IndexRepresentation, InterpolationMode, OperandType, ResourceDim, ResourceReturnType,
    SamplerMode, SystemValue,
};
pub use crate::error::{DecodeError, DecodeErrorKind};
pub use crate::opcode::{GlobalFlags, Opcode, OpcodeControl, OpcodeExt, OpcodeExtKind, OpcodeToken};
pub use crate::operand::{
    Operand, OperandExt, OperandExtKind, OperandIndex, OperandModifiers, OperandToken,
    MAX_INDEX_NESTING,
};
pub use crate::program::{decode_version_token, ShaderModel, ShaderStage, Sm4Program};
pub use crate::reader::{Instruction, InstructionReader, OperandReader};
pub use crate::types::{ComponentCount, ComponentMask, ComponentSelection, SelectionMode, Swizzle};

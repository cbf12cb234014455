//! Minimal SPIR-V emission support.
//!
//! [`SpirvModule`] builds a module section by section and
//! [`SpirvCodeBuffer`] holds the serialized words, with just enough
//! instruction-level access to patch binding decorations after the fact.

#![forbid(unsafe_code)]

mod code_buffer;
mod module;

use thiserror::Error;

pub use crate::code_buffer::{string_words, Instruction, Instructions, SpirvCodeBuffer, HEADER_WORDS};
pub use crate::module::{SpirvModule, SPIRV_VERSION};

pub use spirv;

/// Error loading a serialized SPIR-V module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpirvError {
    #[error("SPIR-V byte length {len} is not a multiple of 4")]
    MisalignedBytes { len: usize },
    #[error("SPIR-V module too short for a header ({words} words)")]
    MissingHeader { words: usize },
    #[error("bad SPIR-V magic number {found:#010x}")]
    BadMagic { found: u32 },
    #[error("malformed SPIR-V instruction at word {offset}")]
    MalformedInstruction { offset: usize },
}

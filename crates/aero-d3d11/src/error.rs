use std::fmt;

use aero_dxbc::{
    ComponentCount, DecodeError, IndexRepresentation, Opcode, OperandType, SelectionMode,
    ShaderStage,
};
use thiserror::Error;

use crate::codegen::CodeGenError;
use crate::diagnostics::Diagnostic;

/// Translation failure, positioned at the offending instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    /// Word offset of the opcode token (or of the bad word for decode errors).
    pub at_dword: usize,
    /// `None` when the failure is not tied to a decoded instruction.
    pub opcode: Option<Opcode>,
    pub kind: CompileErrorKind,
}

impl CompileError {
    pub fn new(at_dword: usize, opcode: Option<Opcode>, kind: CompileErrorKind) -> Self {
        Self {
            at_dword,
            opcode,
            kind,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode {
            Some(opcode) => write!(
                f,
                "{} at dword {}: {}",
                opcode.mnemonic(),
                self.at_dword,
                self.kind
            ),
            None => write!(f, "at dword {}: {}", self.at_dword, self.kind),
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            CompileErrorKind::Decode(err) => Some(err),
            CompileErrorKind::CodeGen(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DecodeError> for CompileError {
    fn from(err: DecodeError) -> Self {
        Self::new(err.at_dword, None, CompileErrorKind::Decode(err))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileErrorKind {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    CodeGen(#[from] CodeGenError),
    #[error("{context}: unsupported index dimension {found}")]
    InvalidIndexDimension { context: &'static str, found: usize },
    #[error("{context}: index {index} must be an immediate, found {representation}")]
    InvalidIndexRepresentation {
        context: &'static str,
        index: usize,
        representation: IndexRepresentation,
    },
    #[error("{context}: index {index} has no immediate or relative part")]
    EmptyIndex { context: &'static str, index: usize },
    #[error("{context}: invalid component count {count:?}")]
    InvalidComponentCount {
        context: &'static str,
        count: ComponentCount,
    },
    #[error("{context}: invalid selection mode {mode:?}")]
    InvalidSelectionMode {
        context: &'static str,
        mode: SelectionMode,
    },
    #[error("dcl_temps declares {count} registers, the limit is {max}")]
    TooManyTemps { count: u32, max: u32 },
    #[error("{context}: unexpected operand type {operand_type}")]
    UnexpectedOperandType {
        context: &'static str,
        operand_type: OperandType,
    },
    /// Recognized input the translator cannot express yet. Recorded as a
    /// diagnostic unless coverage is strict.
    #[error("not implemented: {what}")]
    NotImplemented { what: String },
    /// A coverage gap under [`crate::CompilerOptions::strict_coverage`].
    #[error("coverage gap: {0}")]
    CoverageGap(Diagnostic),
    #[error("{} shaders cannot be translated", .0.short_name())]
    UnsupportedStage(ShaderStage),
}

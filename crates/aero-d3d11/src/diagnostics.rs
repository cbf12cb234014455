use std::fmt;
use std::sync::Arc;

use aero_dxbc::{Opcode, OperandType, ResourceReturnType, SystemValue};

use crate::shader::Shader;

/// A coverage gap hit while translating one instruction.
///
/// The instruction was skipped or approximated; the shader still translated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Word offset of the instruction's opcode token.
    pub at_dword: usize,
    pub opcode: Opcode,
    pub kind: DiagnosticKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Known opcode without a translation; the instruction was skipped.
    UnhandledOpcode,
    /// The instruction uses a feature the translator or generator lacks.
    NotImplemented { what: String },
    /// Per-component return types disagree; the `x` type was used.
    MixedReturnTypes {
        register: u32,
        return_types: [ResourceReturnType; 4],
    },
    /// The system value cannot be expressed; the register was declared as a
    /// plain interface variable.
    UnsupportedSystemValue {
        operand_type: OperandType,
        register: u32,
        system_value: SystemValue,
    },
    /// Immediate texel offsets were dropped from a sample.
    IgnoredTexelOffsets { offsets: [i8; 3] },
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnhandledOpcode => f.write_str("unhandled opcode"),
            Self::NotImplemented { what } => write!(f, "not implemented: {what}"),
            Self::MixedReturnTypes {
                register,
                return_types: [x, y, z, w],
            } => write!(
                f,
                "t{register} has mixed return types ({x}, {y}, {z}, {w}); using {x}"
            ),
            Self::UnsupportedSystemValue {
                operand_type,
                register,
                system_value,
            } => write!(
                f,
                "system value {system_value} on {operand_type}{register} is not supported"
            ),
            Self::IgnoredTexelOffsets { offsets: [u, v, w] } => {
                write!(f, "texel offsets ({u}, {v}, {w}) ignored")
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at dword {}: {}",
            self.opcode.mnemonic(),
            self.at_dword,
            self.kind
        )
    }
}

/// Output of a successful translation.
#[derive(Debug, Clone)]
pub struct CompiledShader {
    pub shader: Arc<Shader>,
    /// Coverage gaps, in instruction order.
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledShader {
    /// Whether any instruction was skipped or approximated.
    pub fn is_partial(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

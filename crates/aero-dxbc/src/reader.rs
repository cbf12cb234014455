//! Forward-only instruction reader.

use core::fmt;
use core::iter::FusedIterator;

use crate::enums::{InterpolationMode, ResourceDim, SamplerMode};
use crate::opcode::{GlobalFlags, Opcode, OpcodeControl, OpcodeExt, OpcodeExtKind, OpcodeToken};
use crate::operand::Operand;
use crate::{DecodeError, DecodeErrorKind};

/// Reads instructions from a program's token words.
///
/// Yields `Err` at most once; after a decode error the reader is exhausted
/// until [`InstructionReader::restart`] is called.
#[derive(Debug, Clone)]
pub struct InstructionReader<'a> {
    tokens: &'a [u32],
    start: usize,
    pos: usize,
    failed: bool,
}

impl<'a> InstructionReader<'a> {
    /// Creates a reader over `tokens`, starting at word `start`.
    ///
    /// Offsets reported by instructions and errors are indices into `tokens`.
    pub fn new(tokens: &'a [u32], start: usize) -> Self {
        Self {
            tokens,
            start,
            pos: start,
            failed: false,
        }
    }

    /// Rewinds to the first instruction.
    pub fn restart(&mut self) {
        self.pos = self.start;
        self.failed = false;
    }

    /// Word offset of the next instruction.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn read_one(&mut self) -> Result<Instruction<'a>, DecodeError> {
        let at = self.pos;
        let available = self.tokens.len();
        let token = OpcodeToken(self.tokens[at]);

        let is_custom_data = token.opcode_raw() == Opcode::CustomData.raw();
        let len = if is_custom_data {
            // customdata: class in the control bits, length in the next word.
            let declared = *self
                .tokens
                .get(at + 1)
                .ok_or_else(|| DecodeError::eof(at + 1, 1, 0))?;
            declared as usize
        } else {
            token.length()
        };

        if len == 0 || (is_custom_data && len < 2) {
            return Err(DecodeError::new(at, DecodeErrorKind::InstructionLengthZero));
        }
        if len > available - at {
            return Err(DecodeError::new(
                at,
                DecodeErrorKind::InstructionOutOfBounds {
                    start: at,
                    len,
                    available,
                },
            ));
        }

        let opcode = token.opcode().ok_or_else(|| {
            DecodeError::new(
                at,
                DecodeErrorKind::UnknownOpcode {
                    raw: token.opcode_raw(),
                },
            )
        })?;

        let words = &self.tokens[at..at + len];
        let mut args_start = 1;
        if is_custom_data {
            args_start = 2;
        } else {
            let mut extended = token.is_extended();
            while extended {
                let ext = words.get(args_start).copied().ok_or_else(|| {
                    DecodeError::eof(at + args_start, 1, 0)
                })?;
                extended = OpcodeExt(ext).is_extended();
                args_start += 1;
            }
        }

        self.pos = at + len;
        Ok(Instruction {
            at_dword: at,
            token,
            opcode,
            words,
            args_start,
        })
    }
}

impl<'a> Iterator for InstructionReader<'a> {
    type Item = Result<Instruction<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.tokens.len() {
            return None;
        }
        let result = self.read_one();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

impl FusedIterator for InstructionReader<'_> {}

/// One decoded instruction, borrowing its words from the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction<'a> {
    at_dword: usize,
    token: OpcodeToken,
    opcode: Opcode,
    words: &'a [u32],
    args_start: usize,
}

impl<'a> Instruction<'a> {
    /// Word offset of the opcode token.
    pub fn at_dword(&self) -> usize {
        self.at_dword
    }

    pub fn token(&self) -> OpcodeToken {
        self.token
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn control(&self) -> OpcodeControl {
        self.token.control()
    }

    /// Total length in words.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// All words of the instruction, opcode token included.
    pub fn words(&self) -> &'a [u32] {
        self.words
    }

    /// Words following the opcode token and its extended tokens.
    pub fn args(&self) -> &'a [u32] {
        &self.words[self.args_start..]
    }

    /// Absolute word offset of `args()[0]`.
    pub fn args_at_dword(&self) -> usize {
        self.at_dword + self.args_start
    }

    /// Raw argument word at `offset` within [`Instruction::args`].
    pub fn arg(&self, offset: usize) -> Result<u32, DecodeError> {
        let args = self.args();
        args.get(offset).copied().ok_or_else(|| {
            DecodeError::eof(
                self.args_at_dword() + offset,
                1,
                args.len().saturating_sub(offset),
            )
        })
    }

    /// Parses the operand starting at `offset` within [`Instruction::args`].
    pub fn operand(&self, offset: usize) -> Result<Operand, DecodeError> {
        let args = self.args();
        if offset >= args.len() {
            return Err(DecodeError::eof(self.args_at_dword() + offset, 1, 0));
        }
        Operand::parse(&args[offset..], self.args_at_dword() + offset)
    }

    /// Sequential cursor over the operands.
    pub fn operands(&self) -> OperandReader<'a> {
        OperandReader {
            args: self.args(),
            base: self.args_at_dword(),
            offset: 0,
        }
    }

    /// Extended opcode tokens, in stream order.
    pub fn opcode_ext(&self) -> impl Iterator<Item = OpcodeExt> + 'a {
        let ext = if self.opcode == Opcode::CustomData {
            &[][..]
        } else {
            &self.words[1..self.args_start]
        };
        ext.iter().copied().map(OpcodeExt)
    }

    /// First extended opcode token of `kind`, if present.
    pub fn query_opcode_ext(&self, kind: OpcodeExtKind) -> Option<OpcodeExt> {
        self.opcode_ext().find(|e| e.kind() == Some(kind))
    }

    /// Immediate texel offsets, zero without a sample-controls token.
    pub fn sample_offsets(&self) -> [i8; 3] {
        self.query_opcode_ext(OpcodeExtKind::SampleControls)
            .map(OpcodeExt::sample_offsets)
            .unwrap_or([0; 3])
    }

    pub fn resource_dim(&self) -> Result<ResourceDim, DecodeError> {
        ResourceDim::decode(self.control().resource_dim_raw(), self.at_dword)
    }

    pub fn interpolation_mode(&self) -> Result<InterpolationMode, DecodeError> {
        InterpolationMode::decode(self.control().interpolation_mode_raw(), self.at_dword)
    }

    pub fn sampler_mode(&self) -> Result<SamplerMode, DecodeError> {
        SamplerMode::decode(self.control().sampler_mode_raw(), self.at_dword)
    }

    pub fn global_flags(&self) -> GlobalFlags {
        self.control().global_flags()
    }

    fn has_raw_args_only(&self) -> bool {
        matches!(
            self.opcode,
            Opcode::CustomData
                | Opcode::DclTemps
                | Opcode::DclThreadGroup
                | Opcode::DclMaxOutputVertexCount
                | Opcode::DclGsInstanceCount
                | Opcode::DclInputControlPointCount
                | Opcode::DclOutputControlPointCount
                | Opcode::DclHsMaxTessFactor
                | Opcode::DclHsForkPhaseInstanceCount
                | Opcode::DclHsJoinPhaseInstanceCount
                | Opcode::DclFunctionBody
                | Opcode::DclFunctionTable
                | Opcode::DclInterface
        )
    }
}

impl fmt::Display for Instruction<'_> {
    /// Assembly-like rendering used by dump tools. Trailing words that are not
    /// operands (return types, system values, counts) are printed raw.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.opcode.mnemonic())?;
        if !self.opcode.is_declaration() && self.control().saturate() {
            f.write_str("_sat")?;
        }

        let mut reader = self.operands();
        let mut first = true;
        if !self.has_raw_args_only() {
            while reader.remaining() > 0 {
                let Ok(op) = reader.next_operand() else {
                    break;
                };
                f.write_str(if first { " " } else { ", " })?;
                write!(f, "{op}")?;
                first = false;
            }
        }
        while let Ok(word) = reader.read_arg() {
            f.write_str(if first { " " } else { ", " })?;
            write!(f, "{word:#x}")?;
            first = false;
        }
        Ok(())
    }
}

/// Cursor over the argument words of one instruction.
///
/// Each [`OperandReader::next_operand`] call advances by the decoded operand's
/// own length, so operands are visited strictly left to right.
#[derive(Debug, Clone)]
pub struct OperandReader<'a> {
    args: &'a [u32],
    base: usize,
    offset: usize,
}

impl OperandReader<'_> {
    /// Decodes the next operand and advances past it.
    pub fn next_operand(&mut self) -> Result<Operand, DecodeError> {
        if self.offset >= self.args.len() {
            return Err(DecodeError::eof(self.base + self.offset, 1, 0));
        }
        let op = Operand::parse(&self.args[self.offset..], self.base + self.offset)?;
        self.offset += op.len();
        Ok(op)
    }

    /// Reads the next raw word and advances past it.
    pub fn read_arg(&mut self) -> Result<u32, DecodeError> {
        let word = self
            .args
            .get(self.offset)
            .copied()
            .ok_or_else(|| DecodeError::eof(self.base + self.offset, 1, 0))?;
        self.offset += 1;
        Ok(word)
    }

    /// Words consumed so far, relative to the start of the arguments.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.args.len() - self.offset
    }
}

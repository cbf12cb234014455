use thiserror::Error;

/// Error produced while decoding an SM4/SM5 token stream.
///
/// `at_dword` is the absolute word offset (counting the two program header
/// words) of the token that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("SM4/5 decode error at dword {at_dword}: {kind}")]
pub struct DecodeError {
    /// Absolute word offset of the offending token.
    pub at_dword: usize,
    /// What went wrong.
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    pub(crate) fn new(at_dword: usize, kind: DecodeErrorKind) -> Self {
        Self { at_dword, kind }
    }

    pub(crate) fn eof(at_dword: usize, wanted: usize, remaining: usize) -> Self {
        Self::new(at_dword, DecodeErrorKind::UnexpectedEof { wanted, remaining })
    }
}

/// The specific failure behind a [`DecodeError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    /// Input byte length is not a multiple of four.
    #[error("token stream length {len} is not a multiple of 4 bytes")]
    MisalignedTokens {
        /// Byte length of the input.
        len: usize,
    },
    /// Input is too short to contain the version and length tokens.
    #[error("token stream too short ({words} dwords, need at least 2)")]
    TooShort {
        /// Available word count.
        words: usize,
    },
    /// Program length token is smaller than the header or past the end of input.
    #[error("declared program length {declared} is out of bounds (available {available})")]
    InvalidDeclaredLength {
        /// Declared length in words.
        declared: usize,
        /// Available words.
        available: usize,
    },
    /// An instruction token declared a length of zero.
    #[error("instruction length is zero")]
    InstructionLengthZero,
    /// An instruction's declared length runs past the end of the program.
    #[error("instruction at {start} with length {len} overruns program (available {available})")]
    InstructionOutOfBounds {
        /// Start offset (absolute dwords).
        start: usize,
        /// Declared length.
        len: usize,
        /// Words available in the program.
        available: usize,
    },
    /// Reading a field required more words than remain in the instruction.
    #[error("unexpected end of token stream (wanted {wanted} dwords, {remaining} remaining)")]
    UnexpectedEof {
        /// Words required.
        wanted: usize,
        /// Words left.
        remaining: usize,
    },
    /// The opcode field holds a value outside the known opcode table.
    #[error("unknown opcode {raw}")]
    UnknownOpcode {
        /// Raw opcode number.
        raw: u32,
    },
    /// The operand type field holds an unknown value.
    #[error("unknown operand type {raw}")]
    UnknownOperandType {
        /// Raw operand type number.
        raw: u32,
    },
    /// A numbered field holds a value its enumeration does not define.
    #[error("invalid {what} value {value}")]
    InvalidEnumValue {
        /// Name of the enumeration.
        what: &'static str,
        /// Raw value found in the stream.
        value: u32,
    },
    /// Index dimension field is 3 or an operand has more indices than supported.
    #[error("unsupported index dimension {dim}")]
    InvalidIndexDimension {
        /// Raw index dimension.
        dim: u32,
    },
    /// Index representation field holds a reserved value.
    #[error("unsupported index representation {rep}")]
    InvalidIndexRepresentation {
        /// Raw representation.
        rep: u32,
    },
    /// Relative indices nest deeper than the decoder allows.
    #[error("relative operand indices nest deeper than {limit}")]
    IndexNestingTooDeep {
        /// Maximum nesting depth.
        limit: usize,
    },
    /// An index was requested past the operand's index dimension.
    #[error("operand has no index {index} (index dimension {dim})")]
    MissingIndex {
        /// Requested index.
        index: usize,
        /// Operand's index dimension.
        dim: usize,
    },
    /// An immediate was requested past the operand's immediate count.
    #[error("operand has no immediate {index} ({count} present)")]
    ImmediateOutOfRange {
        /// Requested immediate.
        index: usize,
        /// Number of immediates present.
        count: usize,
    },
}

use core::fmt;

use crate::reader::InstructionReader;
use crate::{DecodeError, DecodeErrorKind};

/// Pipeline stage a program was compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Pixel,
    Vertex,
    Geometry,
    Hull,
    Domain,
    Compute,
    /// Program type not defined by SM4/SM5.
    Unknown(u16),
}

impl ShaderStage {
    pub fn from_program_type(ty: u16) -> Self {
        match ty {
            0 => Self::Pixel,
            1 => Self::Vertex,
            2 => Self::Geometry,
            3 => Self::Hull,
            4 => Self::Domain,
            5 => Self::Compute,
            other => Self::Unknown(other),
        }
    }

    pub fn program_type(self) -> u16 {
        match self {
            Self::Pixel => 0,
            Self::Vertex => 1,
            Self::Geometry => 2,
            Self::Hull => 3,
            Self::Domain => 4,
            Self::Compute => 5,
            Self::Unknown(other) => other,
        }
    }

    /// Two-letter prefix used in shader profile names (`ps`, `vs`, ...).
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Pixel => "ps",
            Self::Vertex => "vs",
            Self::Geometry => "gs",
            Self::Hull => "hs",
            Self::Domain => "ds",
            Self::Compute => "cs",
            Self::Unknown(_) => "??",
        }
    }
}

/// Shader model version from the version token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderModel {
    pub major: u8,
    pub minor: u8,
}

/// Splits a version token into stage and shader model.
pub fn decode_version_token(version: u32) -> (ShaderStage, ShaderModel) {
    let minor = (version & 0xf) as u8;
    let major = ((version >> 4) & 0xf) as u8;
    let ty = (version >> 16) as u16;
    (
        ShaderStage::from_program_type(ty),
        ShaderModel { major, minor },
    )
}

/// An SM4/SM5 token program: version token, length token, instruction words.
///
/// Only the program words themselves are handled here; locating them inside
/// a container blob is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sm4Program {
    pub stage: ShaderStage,
    pub model: ShaderModel,
    /// All program words, header included, truncated to the declared length.
    pub tokens: Vec<u32>,
}

impl Sm4Program {
    /// Number of header words before the first instruction.
    pub const HEADER_WORDS: usize = 2;

    /// Parses little-endian program bytes.
    pub fn parse_program_tokens(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() % 4 != 0 {
            return Err(DecodeError::new(
                0,
                DecodeErrorKind::MisalignedTokens { len: bytes.len() },
            ));
        }
        let tokens = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Self::from_tokens(tokens)
    }

    /// Validates the header of `tokens` and drops words past the declared length.
    pub fn from_tokens(mut tokens: Vec<u32>) -> Result<Self, DecodeError> {
        if tokens.len() < Self::HEADER_WORDS {
            return Err(DecodeError::new(
                0,
                DecodeErrorKind::TooShort {
                    words: tokens.len(),
                },
            ));
        }

        let declared = tokens[1] as usize;
        if declared < Self::HEADER_WORDS || declared > tokens.len() {
            return Err(DecodeError::new(
                1,
                DecodeErrorKind::InvalidDeclaredLength {
                    declared,
                    available: tokens.len(),
                },
            ));
        }
        tokens.truncate(declared);

        let (stage, model) = decode_version_token(tokens[0]);
        Ok(Self {
            stage,
            model,
            tokens,
        })
    }

    /// Reader over the instructions, restartable from the first instruction.
    pub fn instructions(&self) -> InstructionReader<'_> {
        InstructionReader::new(&self.tokens, Self::HEADER_WORDS)
    }

    /// Program words as little-endian bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.tokens.iter().flat_map(|w| w.to_le_bytes()).collect()
    }
}

impl fmt::Display for ShaderModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.major, self.minor)
    }
}

//! Self-describing operand decoding.
//!
//! An operand is a variable-length run of words: the operand token, optional
//! extended operand tokens, one encoded index per index dimension (relative
//! indices embed a whole nested operand), and finally any immediate values.
//! Its length is only known once it has been parsed, so operands of an
//! instruction must be decoded strictly left to right.

use core::fmt;

use bitflags::bitflags;

use crate::enums::{IndexRepresentation, OperandType};
use crate::types::{ComponentCount, ComponentMask, ComponentSelection, SelectionMode, Swizzle};
use crate::{DecodeError, DecodeErrorKind};

/// Relative indices may reference operands that are themselves relatively
/// indexed; real shaders never nest more than once.
pub const MAX_INDEX_NESTING: usize = 4;

const EXTENDED_BIT: u32 = 1 << 31;

/// First word of every operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperandToken(pub u32);

impl OperandToken {
    pub fn component_count(self) -> ComponentCount {
        ComponentCount::from_bits(self.0)
    }

    pub fn selection_mode(self) -> SelectionMode {
        SelectionMode::from_bits(self.0 >> 2)
    }

    /// Write mask (bits 4..7), meaningful in [`SelectionMode::Mask`].
    pub fn component_mask(self) -> ComponentMask {
        ComponentMask::from_bits(((self.0 >> 4) & 0xf) as u8)
    }

    /// Swizzle (bits 4..11), meaningful in [`SelectionMode::Swizzle`].
    pub fn component_swizzle(self) -> Swizzle {
        Swizzle::from_packed(((self.0 >> 4) & 0xff) as u8)
    }

    /// Selected component (bits 4..5), meaningful in [`SelectionMode::Select1`].
    pub fn component_select1(self) -> u8 {
        ((self.0 >> 4) & 0x3) as u8
    }

    pub fn operand_type_raw(self) -> u32 {
        (self.0 >> 12) & 0xff
    }

    pub fn index_dimension(self) -> usize {
        ((self.0 >> 20) & 0x3) as usize
    }

    /// Raw representation field of index `n` (0..=2).
    pub fn index_representation_raw(self, n: usize) -> u32 {
        (self.0 >> (22 + 3 * n as u32)) & 0x7
    }

    pub fn is_extended(self) -> bool {
        self.0 & EXTENDED_BIT != 0
    }
}

numbered_enum! {
    /// Kind of an extended operand token.
    pub enum OperandExtKind("extended operand type") {
        Empty = 0 => "empty",
        Modifier = 1 => "modifier",
    }
}

bitflags! {
    /// Source modifiers carried by an extended operand token.
    ///
    /// The raw modifier field is 1 = neg, 2 = abs, 3 = abs then neg, which
    /// maps directly onto these bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OperandModifiers: u32 {
        const NEG = 1;
        const ABS = 2;
    }
}

/// Extended operand token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperandExt(pub u32);

impl OperandExt {
    pub fn kind_raw(self) -> u32 {
        self.0 & 0x3f
    }

    pub fn kind(self) -> Option<OperandExtKind> {
        OperandExtKind::from_raw(self.kind_raw())
    }

    /// Modifier bits (6..13) of a [`OperandExtKind::Modifier`] token.
    pub fn modifiers(self) -> OperandModifiers {
        OperandModifiers::from_bits_truncate((self.0 >> 6) & 0xff)
    }

    pub fn is_extended(self) -> bool {
        self.0 & EXTENDED_BIT != 0
    }
}

/// One decoded operand index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandIndex {
    repr: IndexRepresentation,
    imm: u64,
    relative: Option<Box<Operand>>,
}

impl OperandIndex {
    pub fn representation(&self) -> IndexRepresentation {
        self.repr
    }

    pub fn has_imm_part(&self) -> bool {
        self.repr.has_imm()
    }

    /// Immediate part, zero when absent.
    pub fn imm_part(&self) -> u64 {
        self.imm
    }

    pub fn has_rel_part(&self) -> bool {
        self.relative.is_some()
    }

    /// Register operand whose value is added to the immediate part.
    pub fn rel_part(&self) -> Option<&Operand> {
        self.relative.as_deref()
    }
}

/// A decoded operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    at_dword: usize,
    token: OperandToken,
    ty: OperandType,
    ext: Vec<OperandExt>,
    indices: Vec<OperandIndex>,
    imm: Vec<u32>,
    len: usize,
}

struct Cursor<'a> {
    words: &'a [u32],
    base: usize,
    pos: usize,
}

impl Cursor<'_> {
    fn read(&mut self) -> Result<u32, DecodeError> {
        let word = self.words.get(self.pos).copied().ok_or_else(|| {
            DecodeError::eof(self.base + self.pos, 1, self.words.len() - self.pos.min(self.words.len()))
        })?;
        self.pos += 1;
        Ok(word)
    }
}

impl Operand {
    /// Parses the operand starting at `words[0]`.
    ///
    /// `at_dword` is the absolute offset of `words[0]`, used for error
    /// reporting. Words past the operand are ignored.
    pub fn parse(words: &[u32], at_dword: usize) -> Result<Self, DecodeError> {
        Self::parse_nested(words, at_dword, 0)
    }

    fn parse_nested(words: &[u32], at_dword: usize, depth: usize) -> Result<Self, DecodeError> {
        if depth > MAX_INDEX_NESTING {
            return Err(DecodeError::new(
                at_dword,
                DecodeErrorKind::IndexNestingTooDeep {
                    limit: MAX_INDEX_NESTING,
                },
            ));
        }

        let mut cur = Cursor {
            words,
            base: at_dword,
            pos: 0,
        };
        let token = OperandToken(cur.read()?);
        let ty = OperandType::from_raw(token.operand_type_raw()).ok_or_else(|| {
            DecodeError::new(
                at_dword,
                DecodeErrorKind::UnknownOperandType {
                    raw: token.operand_type_raw(),
                },
            )
        })?;

        let mut ext = Vec::new();
        let mut extended = token.is_extended();
        while extended {
            let tok = OperandExt(cur.read()?);
            extended = tok.is_extended();
            ext.push(tok);
        }

        let dim = token.index_dimension();
        let mut indices = Vec::with_capacity(dim);
        for n in 0..dim {
            let raw = token.index_representation_raw(n);
            let repr = IndexRepresentation::from_raw(raw).ok_or_else(|| {
                DecodeError::new(
                    at_dword,
                    DecodeErrorKind::InvalidIndexRepresentation { rep: raw },
                )
            })?;

            let imm = match repr.imm_words() {
                0 => 0,
                1 => u64::from(cur.read()?),
                _ => {
                    let hi = cur.read()?;
                    let lo = cur.read()?;
                    (u64::from(hi) << 32) | u64::from(lo)
                }
            };

            let relative = if repr.has_relative() {
                let nested =
                    Self::parse_nested(&words[cur.pos..], at_dword + cur.pos, depth + 1)?;
                cur.pos += nested.len;
                Some(Box::new(nested))
            } else {
                None
            };

            indices.push(OperandIndex { repr, imm, relative });
        }

        let imm_words = match ty {
            OperandType::Imm32 | OperandType::Imm64 => {
                let per_component = if ty == OperandType::Imm64 { 2 } else { 1 };
                match token.component_count() {
                    ComponentCount::One => per_component,
                    ComponentCount::Four => 4 * per_component,
                    _ => 0,
                }
            }
            _ => 0,
        };
        let mut imm = Vec::with_capacity(imm_words);
        for _ in 0..imm_words {
            imm.push(cur.read()?);
        }

        Ok(Self {
            at_dword,
            token,
            ty,
            ext,
            indices,
            imm,
            len: cur.pos,
        })
    }

    /// Absolute word offset of the operand token.
    pub fn at_dword(&self) -> usize {
        self.at_dword
    }

    pub fn token(&self) -> OperandToken {
        self.token
    }

    pub fn operand_type(&self) -> OperandType {
        self.ty
    }

    /// Number of words this operand occupies.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn component_count(&self) -> ComponentCount {
        self.token.component_count()
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.token.selection_mode()
    }

    pub fn component_mask(&self) -> ComponentMask {
        self.token.component_mask()
    }

    pub fn component_swizzle(&self) -> Swizzle {
        self.token.component_swizzle()
    }

    /// Selection of a 4-component operand, `None` for other component counts
    /// or the reserved selection mode.
    pub fn component_selection(&self) -> Option<ComponentSelection> {
        if self.component_count() != ComponentCount::Four {
            return None;
        }
        match self.selection_mode() {
            SelectionMode::Mask => Some(ComponentSelection::Mask(self.component_mask())),
            SelectionMode::Swizzle => Some(ComponentSelection::Swizzle(self.component_swizzle())),
            SelectionMode::Select1 => Some(ComponentSelection::Select1(
                self.token.component_select1(),
            )),
            SelectionMode::Reserved => None,
        }
    }

    pub fn index_dimension(&self) -> usize {
        self.indices.len()
    }

    pub fn index_representation(&self, n: usize) -> Option<IndexRepresentation> {
        self.indices.get(n).map(OperandIndex::representation)
    }

    /// Index `n` (0-based).
    pub fn index(&self, n: usize) -> Result<&OperandIndex, DecodeError> {
        self.indices.get(n).ok_or_else(|| {
            DecodeError::new(
                self.at_dword,
                DecodeErrorKind::MissingIndex {
                    index: n,
                    dim: self.indices.len(),
                },
            )
        })
    }

    pub fn indices(&self) -> &[OperandIndex] {
        &self.indices
    }

    /// Raw immediate word `n` of an immediate operand.
    pub fn imm32(&self, n: usize) -> Result<u32, DecodeError> {
        self.imm.get(n).copied().ok_or_else(|| {
            DecodeError::new(
                self.at_dword,
                DecodeErrorKind::ImmediateOutOfRange {
                    index: n,
                    count: self.imm.len(),
                },
            )
        })
    }

    pub fn imm_words(&self) -> &[u32] {
        &self.imm
    }

    /// First extended token of the given kind, if any. Absence is not an error.
    pub fn query_operand_ext(&self, kind: OperandExtKind) -> Option<OperandExt> {
        self.ext.iter().copied().find(|e| e.kind() == Some(kind))
    }

    /// Source modifiers, empty when no modifier token is present.
    pub fn modifiers(&self) -> OperandModifiers {
        self.query_operand_ext(OperandExtKind::Modifier)
            .map(OperandExt::modifiers)
            .unwrap_or_default()
    }

    /// Immediate part of index `n` when that index is a plain immediate.
    pub fn imm_index(&self, n: usize) -> Option<u32> {
        let index = self.indices.get(n)?;
        (index.repr == IndexRepresentation::Imm32).then_some(index.imm as u32)
    }
}

impl fmt::Display for OperandIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.relative, self.has_imm_part()) {
            (Some(rel), true) if self.imm != 0 => write!(f, "{rel} + {}", self.imm),
            (Some(rel), _) => write!(f, "{rel}"),
            (None, _) => write!(f, "{}", self.imm),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mods = self.modifiers();
        if mods.contains(OperandModifiers::NEG) {
            f.write_str("-")?;
        }
        if mods.contains(OperandModifiers::ABS) {
            f.write_str("|")?;
        }

        match self.ty {
            OperandType::Imm32 => {
                f.write_str("l(")?;
                for (i, word) in self.imm.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:?}", f32::from_bits(*word))?;
                }
                f.write_str(")")?;
            }
            OperandType::Imm64 => {
                f.write_str("d(")?;
                for (i, pair) in self.imm.chunks(2).enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    let bits = (u64::from(pair[0]) << 32) | u64::from(*pair.get(1).unwrap_or(&0));
                    write!(f, "{:?}", f64::from_bits(bits))?;
                }
                f.write_str(")")?;
            }
            ty => {
                f.write_str(ty.label())?;
                for (n, index) in self.indices.iter().enumerate() {
                    if n == 0 && !index.has_rel_part() {
                        write!(f, "{index}")?;
                    } else {
                        write!(f, "[{index}]")?;
                    }
                }
                match self.component_selection() {
                    Some(ComponentSelection::Mask(mask)) if !mask.is_empty() => {
                        write!(f, ".{mask}")?
                    }
                    Some(ComponentSelection::Swizzle(swz)) => write!(f, ".{swz}")?,
                    Some(ComponentSelection::Select1(c)) => {
                        write!(f, ".{}", ComponentMask::select(c))?
                    }
                    _ => {}
                }
            }
        }

        if mods.contains(OperandModifiers::ABS) {
            f.write_str("|")?;
        }
        Ok(())
    }
}

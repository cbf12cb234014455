use spirv::{Op, Word};

use crate::SpirvError;

/// Words in the SPIR-V module header.
pub const HEADER_WORDS: usize = 5;

/// An owned run of SPIR-V words.
///
/// A buffer either holds a single module section (no header) while a module
/// is being built, or a complete module starting with the five header words.
/// Iteration skips the header when one is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SpirvCodeBuffer {
    code: Vec<Word>,
}

impl SpirvCodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_words(code: Vec<Word>) -> Self {
        Self { code }
    }

    /// Loads a complete little-endian module and checks its instruction framing.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SpirvError> {
        if bytes.len() % 4 != 0 {
            return Err(SpirvError::MisalignedBytes { len: bytes.len() });
        }
        let code: Vec<Word> = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        if code.len() < HEADER_WORDS {
            return Err(SpirvError::MissingHeader { words: code.len() });
        }
        if code[0] != spirv::MAGIC_NUMBER {
            return Err(SpirvError::BadMagic { found: code[0] });
        }

        let buffer = Self { code };
        buffer.check_framing()?;
        Ok(buffer)
    }

    fn check_framing(&self) -> Result<(), SpirvError> {
        let mut offset = self.first_instruction();
        while offset < self.code.len() {
            let wc = (self.code[offset] >> 16) as usize;
            if wc == 0 || offset + wc > self.code.len() {
                return Err(SpirvError::MalformedInstruction { offset });
            }
            offset += wc;
        }
        Ok(())
    }

    fn first_instruction(&self) -> usize {
        if self.code.first() == Some(&spirv::MAGIC_NUMBER) {
            HEADER_WORDS
        } else {
            0
        }
    }

    pub fn words(&self) -> &[Word] {
        &self.code
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.code.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Pushes the first word of an instruction with `word_count` words.
    pub fn push_op(&mut self, op: Op, word_count: u16) {
        self.code.push((u32::from(word_count) << 16) | op as u32);
    }

    /// Pushes a complete instruction.
    pub fn push_inst(&mut self, op: Op, operands: &[Word]) {
        let word_count = 1 + operands.len();
        debug_assert!(word_count <= usize::from(u16::MAX));
        self.push_op(op, word_count as u16);
        self.code.extend_from_slice(operands);
    }

    pub fn append(&mut self, other: &SpirvCodeBuffer) {
        self.code.extend_from_slice(&other.code);
    }

    pub fn instructions(&self) -> Instructions<'_> {
        Instructions {
            code: &self.code,
            offset: self.first_instruction(),
        }
    }

    /// Overwrites argument `arg` of the instruction at `offset`.
    ///
    /// Argument 0 is the opcode word itself.
    pub fn set_arg(&mut self, offset: usize, arg: usize, value: Word) {
        self.code[offset + arg] = value;
    }

    /// Passes the literal of every `OpDecorate <id> Binding <n>` through `f`
    /// and returns how many decorations were visited.
    pub fn rewrite_bindings(&mut self, mut f: impl FnMut(Word) -> Word) -> usize {
        let sites: Vec<usize> = self
            .instructions()
            .filter(|ins| {
                ins.opcode() == Op::Decorate as u32
                    && ins.word_count() >= 4
                    && ins.arg(2) == spirv::Decoration::Binding as u32
            })
            .map(|ins| ins.offset())
            .collect();

        for &offset in &sites {
            let old = self.code[offset + 3];
            self.set_arg(offset, 3, f(old));
        }
        sites.len()
    }
}

/// Encodes a literal string: UTF-8 bytes, NUL terminated, padded to a word.
pub fn string_words(s: &str) -> Vec<Word> {
    let bytes = s.as_bytes();
    let mut words = Vec::with_capacity(bytes.len() / 4 + 1);
    for chunk in bytes.chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        words.push(u32::from_le_bytes(word));
    }
    if bytes.len() % 4 == 0 {
        words.push(0);
    }
    words
}

/// One instruction inside a [`SpirvCodeBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction<'a> {
    offset: usize,
    words: &'a [Word],
}

impl<'a> Instruction<'a> {
    /// Word offset of the instruction within its buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn opcode(&self) -> u32 {
        self.words[0] & 0xffff
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Argument `index`, where argument 0 is the opcode word. Out-of-range
    /// arguments read as zero.
    pub fn arg(&self, index: usize) -> Word {
        self.words.get(index).copied().unwrap_or(0)
    }

    pub fn words(&self) -> &'a [Word] {
        self.words
    }
}

/// Iterator over the instructions of a [`SpirvCodeBuffer`].
///
/// Stops at the first instruction with a zero or overlong word count.
#[derive(Debug, Clone)]
pub struct Instructions<'a> {
    code: &'a [Word],
    offset: usize,
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Instruction<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let head = *self.code.get(self.offset)?;
        let wc = (head >> 16) as usize;
        if wc == 0 || self.offset + wc > self.code.len() {
            self.offset = self.code.len();
            return None;
        }
        let ins = Instruction {
            offset: self.offset,
            words: &self.code[self.offset..self.offset + wc],
        };
        self.offset += wc;
        Some(ins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_literals_are_nul_terminated_and_padded() {
        assert_eq!(string_words("main"), vec![u32::from_le_bytes(*b"main"), 0]);
        assert_eq!(
            string_words("GLSL.std.450"),
            vec![
                u32::from_le_bytes(*b"GLSL"),
                u32::from_le_bytes(*b".std"),
                u32::from_le_bytes(*b".450"),
                0
            ]
        );
        assert_eq!(string_words("r0"), vec![u32::from_le_bytes([b'r', b'0', 0, 0])]);
    }

    #[test]
    fn rewrite_touches_only_binding_decorations() {
        let mut buf = SpirvCodeBuffer::new();
        buf.push_inst(Op::Decorate, &[7, spirv::Decoration::DescriptorSet as u32, 0]);
        buf.push_inst(Op::Decorate, &[7, spirv::Decoration::Binding as u32, 40]);
        buf.push_inst(Op::Decorate, &[8, spirv::Decoration::Location as u32, 40]);
        buf.push_inst(Op::Decorate, &[9, spirv::Decoration::Binding as u32, 12]);

        let before = buf.clone();
        let visited = buf.rewrite_bindings(|b| b + 100);
        assert_eq!(visited, 2);
        assert_eq!(buf.words()[7], 140);
        assert_eq!(buf.words()[11], 40);
        assert_eq!(buf.words()[15], 112);
        assert_eq!(buf.len(), before.len());
    }

    #[test]
    fn instructions_stop_on_zero_word_count() {
        let buf = SpirvCodeBuffer::from_words(vec![(1 << 16) | Op::Nop as u32, 0, 5]);
        assert_eq!(buf.instructions().count(), 1);
    }

    #[test]
    fn from_bytes_checks_header_and_framing() {
        assert_eq!(
            SpirvCodeBuffer::from_bytes(&[0; 6]),
            Err(SpirvError::MisalignedBytes { len: 6 })
        );
        assert_eq!(
            SpirvCodeBuffer::from_bytes(&[0; 8]),
            Err(SpirvError::MissingHeader { words: 2 })
        );

        let mut words = vec![spirv::MAGIC_NUMBER, 0x0001_0000, 0, 1, 0];
        words.push((3 << 16) | Op::Capability as u32);
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        assert_eq!(
            SpirvCodeBuffer::from_bytes(&bytes),
            Err(SpirvError::MalformedInstruction { offset: 5 })
        );
    }
}

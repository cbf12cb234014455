//! Builders for synthetic SM4/SM5 token streams.
//!
//! Tests describe instructions with [`InstBuilder`] and [`OperandBuilder`]
//! instead of hand-packing bitfields. The builders never validate; they can
//! produce malformed streams on purpose.

use crate::enums::{
    IndexRepresentation, InterpolationMode, OperandType, ResourceDim, ResourceReturnType,
    SamplerMode, SystemValue,
};
use crate::opcode::Opcode;
use crate::operand::OperandModifiers;
use crate::program::ShaderStage;
use crate::types::{ComponentMask, Swizzle};

#[derive(Debug, Clone)]
enum IndexSpec {
    Imm(u32),
    Relative(Vec<u32>),
    ImmRelative(u32, Vec<u32>),
}

/// Builds the words of a single operand.
#[derive(Debug, Clone)]
pub struct OperandBuilder {
    ty: OperandType,
    count_bits: u32,
    selection_bits: u32,
    component_bits: u32,
    indices: Vec<IndexSpec>,
    modifiers: OperandModifiers,
    imm: Vec<u32>,
}

impl OperandBuilder {
    /// A 4-component operand with an `.xyzw` write mask and no indices.
    pub fn new(ty: OperandType) -> Self {
        Self {
            ty,
            count_bits: 2,
            selection_bits: 0,
            component_bits: u32::from(ComponentMask::XYZW.bits()),
            indices: Vec::new(),
            modifiers: OperandModifiers::empty(),
            imm: Vec::new(),
        }
    }

    pub fn scalar(mut self) -> Self {
        self.count_bits = 1;
        self.selection_bits = 0;
        self.component_bits = 0;
        self
    }

    pub fn no_components(mut self) -> Self {
        self.count_bits = 0;
        self.selection_bits = 0;
        self.component_bits = 0;
        self
    }

    pub fn mask(mut self, mask: ComponentMask) -> Self {
        self.count_bits = 2;
        self.selection_bits = 0;
        self.component_bits = u32::from(mask.bits());
        self
    }

    pub fn swizzle(mut self, swizzle: Swizzle) -> Self {
        self.count_bits = 2;
        self.selection_bits = 1;
        self.component_bits = swizzle
            .0
            .iter()
            .enumerate()
            .map(|(i, c)| u32::from(c & 3) << (2 * i))
            .sum();
        self
    }

    pub fn select1(mut self, component: u8) -> Self {
        self.count_bits = 2;
        self.selection_bits = 2;
        self.component_bits = u32::from(component & 3);
        self
    }

    /// Sets raw selection mode and component bits, valid or not.
    pub fn raw_selection(mut self, count_bits: u32, selection_bits: u32, component_bits: u32) -> Self {
        self.count_bits = count_bits;
        self.selection_bits = selection_bits;
        self.component_bits = component_bits;
        self
    }

    /// Appends an immediate index.
    pub fn index(mut self, value: u32) -> Self {
        self.indices.push(IndexSpec::Imm(value));
        self
    }

    /// Appends a relative index, optionally with an immediate offset. `rel`
    /// holds the words of the register operand being added.
    pub fn relative_index(mut self, imm: Option<u32>, rel: Vec<u32>) -> Self {
        self.indices.push(match imm {
            Some(imm) => IndexSpec::ImmRelative(imm, rel),
            None => IndexSpec::Relative(rel),
        });
        self
    }

    pub fn modifiers(mut self, modifiers: OperandModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Sets immediate payload words (for `l(...)` operands).
    pub fn imm32(mut self, words: &[u32]) -> Self {
        self.imm = words.to_vec();
        self
    }

    pub fn build(&self) -> Vec<u32> {
        let mut token = self.count_bits
            | (self.selection_bits << 2)
            | (self.component_bits << 4)
            | (self.ty.raw() << 12)
            | ((self.indices.len() as u32) << 20);
        for (n, index) in self.indices.iter().enumerate() {
            let repr = match index {
                IndexSpec::Imm(_) => IndexRepresentation::Imm32,
                IndexSpec::Relative(_) => IndexRepresentation::Relative,
                IndexSpec::ImmRelative(..) => IndexRepresentation::Imm32Relative,
            };
            token |= repr.raw() << (22 + 3 * n as u32);
        }
        if !self.modifiers.is_empty() {
            token |= 1 << 31;
        }

        let mut out = vec![token];
        if !self.modifiers.is_empty() {
            out.push(1 | (self.modifiers.bits() << 6));
        }
        for index in &self.indices {
            match index {
                IndexSpec::Imm(v) => out.push(*v),
                IndexSpec::Relative(rel) => out.extend_from_slice(rel),
                IndexSpec::ImmRelative(v, rel) => {
                    out.push(*v);
                    out.extend_from_slice(rel);
                }
            }
        }
        out.extend_from_slice(&self.imm);
        out
    }
}

/// `r{index}` with a write mask.
pub fn temp_dst(index: u32, mask: ComponentMask) -> Vec<u32> {
    OperandBuilder::new(OperandType::Temp)
        .mask(mask)
        .index(index)
        .build()
}

/// `r{index}` read through a swizzle.
pub fn temp_src(index: u32, swizzle: Swizzle) -> Vec<u32> {
    OperandBuilder::new(OperandType::Temp)
        .swizzle(swizzle)
        .index(index)
        .build()
}

/// `r{index}.{c}`, the usual form of a relative index register.
pub fn temp_select(index: u32, component: u8) -> Vec<u32> {
    OperandBuilder::new(OperandType::Temp)
        .select1(component)
        .index(index)
        .build()
}

/// `cb{slot}[{element}]` read through a swizzle.
pub fn cb_src(slot: u32, element: u32, swizzle: Swizzle) -> Vec<u32> {
    OperandBuilder::new(OperandType::ConstantBuffer)
        .swizzle(swizzle)
        .index(slot)
        .index(element)
        .build()
}

/// Scalar `l(value)`.
pub fn imm32_scalar(bits: u32) -> Vec<u32> {
    OperandBuilder::new(OperandType::Imm32)
        .scalar()
        .imm32(&[bits])
        .build()
}

/// Vector `l(a, b, c, d)`.
pub fn imm32_vec4(bits: [u32; 4]) -> Vec<u32> {
    OperandBuilder::new(OperandType::Imm32)
        .imm32(&bits)
        .build()
}

/// Vector `l(a, b, c, d)` from floats.
pub fn imm_f32x4(values: [f32; 4]) -> Vec<u32> {
    imm32_vec4(values.map(f32::to_bits))
}

/// Builds the words of one instruction, computing its length.
#[derive(Debug, Clone)]
pub struct InstBuilder {
    opcode_raw: u32,
    control: u32,
    ext: Vec<u32>,
    args: Vec<u32>,
}

impl InstBuilder {
    pub fn new(opcode: Opcode) -> Self {
        Self::raw(opcode.raw())
    }

    /// Instruction with an arbitrary, possibly unknown, opcode number.
    pub fn raw(opcode_raw: u32) -> Self {
        Self {
            opcode_raw,
            control: 0,
            ext: Vec::new(),
            args: Vec::new(),
        }
    }

    pub fn saturate(mut self) -> Self {
        self.control |= 1 << 13;
        self
    }

    /// ORs `bits` (already at their opcode-token position) into the token.
    pub fn control(mut self, bits: u32) -> Self {
        self.control |= bits;
        self
    }

    /// Appends an extended opcode token; the chaining bit is managed here.
    pub fn ext(mut self, token: u32) -> Self {
        self.ext.push(token & !(1 << 31));
        self
    }

    /// Sample-controls extension with texel offsets.
    pub fn texel_offsets(self, u: i8, v: i8, w: i8) -> Self {
        let pack = |o: i8, shift: u32| ((o as u32) & 0xf) << shift;
        self.ext(1 | pack(u, 9) | pack(v, 13) | pack(w, 17))
    }

    pub fn operand(mut self, words: impl AsRef<[u32]>) -> Self {
        self.args.extend_from_slice(words.as_ref());
        self
    }

    pub fn arg(mut self, word: u32) -> Self {
        self.args.push(word);
        self
    }

    pub fn build(&self) -> Vec<u32> {
        let len = 1 + self.ext.len() + self.args.len();
        let mut token = self.opcode_raw | self.control | ((len as u32 & 0x7f) << 24);
        if !self.ext.is_empty() {
            token |= 1 << 31;
        }
        let mut out = Vec::with_capacity(len);
        out.push(token);
        for (i, ext) in self.ext.iter().enumerate() {
            let chained = if i + 1 < self.ext.len() { 1 << 31 } else { 0 };
            out.push(ext | chained);
        }
        out.extend_from_slice(&self.args);
        out
    }
}

/// Version token for `stage` at shader model `major.minor`.
pub fn version_token(stage: ShaderStage, major: u8, minor: u8) -> u32 {
    (u32::from(stage.program_type()) << 16) | (u32::from(major) << 4) | u32::from(minor)
}

/// Full SM5 program words: header followed by `body` instructions.
pub fn build_program(stage: ShaderStage, body: &[Vec<u32>]) -> Vec<u32> {
    let body_len: usize = body.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(2 + body_len);
    out.push(version_token(stage, 5, 0));
    out.push((2 + body_len) as u32);
    for inst in body {
        out.extend_from_slice(inst);
    }
    out
}

pub fn tokens_to_bytes(tokens: &[u32]) -> Vec<u8> {
    tokens.iter().flat_map(|t| t.to_le_bytes()).collect()
}

pub fn dcl_temps(count: u32) -> Vec<u32> {
    InstBuilder::new(Opcode::DclTemps).arg(count).build()
}

pub fn dcl_global_flags(flags: u32) -> Vec<u32> {
    InstBuilder::new(Opcode::DclGlobalFlags)
        .control(flags << 11)
        .build()
}

/// `dcl_constantbuffer cb{slot}[{size}], immediateIndexed`
pub fn dcl_constant_buffer(slot: u32, size: u32) -> Vec<u32> {
    InstBuilder::new(Opcode::DclConstantBuffer)
        .operand(
            OperandBuilder::new(OperandType::ConstantBuffer)
                .swizzle(Swizzle::XYZW)
                .index(slot)
                .index(size)
                .build(),
        )
        .build()
}

/// Return-type word with one type per component.
pub fn return_type_word(types: [ResourceReturnType; 4]) -> u32 {
    types
        .iter()
        .enumerate()
        .map(|(i, t)| t.raw() << (4 * i))
        .sum()
}

pub fn dcl_resource(slot: u32, dim: ResourceDim, return_types: [ResourceReturnType; 4]) -> Vec<u32> {
    InstBuilder::new(Opcode::DclResource)
        .control(dim.raw() << 11)
        .operand(
            OperandBuilder::new(OperandType::Resource)
                .no_components()
                .index(slot)
                .build(),
        )
        .arg(return_type_word(return_types))
        .build()
}

pub fn dcl_sampler(slot: u32, mode: SamplerMode) -> Vec<u32> {
    InstBuilder::new(Opcode::DclSampler)
        .control(mode.raw() << 11)
        .operand(
            OperandBuilder::new(OperandType::Sampler)
                .no_components()
                .index(slot)
                .build(),
        )
        .build()
}

/// Interface declaration of register `reg`. `system_value` is appended for the
/// `_sgv`/`_siv` opcodes; `interpolation` lands in the control bits.
pub fn dcl_interface(
    opcode: Opcode,
    ty: OperandType,
    reg: u32,
    mask: ComponentMask,
    system_value: Option<SystemValue>,
    interpolation: Option<InterpolationMode>,
) -> Vec<u32> {
    let mut inst = InstBuilder::new(opcode).operand(
        OperandBuilder::new(ty).mask(mask).index(reg).build(),
    );
    if let Some(mode) = interpolation {
        inst = inst.control(mode.raw() << 11);
    }
    if let Some(sv) = system_value {
        inst = inst.arg(sv.raw());
    }
    inst.build()
}

pub fn dcl_thread_group(x: u32, y: u32, z: u32) -> Vec<u32> {
    InstBuilder::new(Opcode::DclThreadGroup)
        .arg(x)
        .arg(y)
        .arg(z)
        .build()
}

pub fn ret() -> Vec<u32> {
    InstBuilder::new(Opcode::Ret).build()
}

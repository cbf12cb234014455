use aero_dxbc::test_utils::*;
use aero_dxbc::{
    ComponentMask, DecodeErrorKind, Opcode, OperandModifiers, OperandType, ResourceDim,
    ResourceReturnType, SamplerMode, ShaderStage, Sm4Program, Swizzle, SystemValue,
};
use pretty_assertions::assert_eq;

fn sample_program() -> Vec<u32> {
    build_program(
        ShaderStage::Pixel,
        &[
            dcl_global_flags(1),
            dcl_constant_buffer(2, 16),
            dcl_resource(4, ResourceDim::Texture2D, [ResourceReturnType::Float; 4]),
            dcl_sampler(1, SamplerMode::Default),
            dcl_temps(3),
            InstBuilder::new(Opcode::Dp3)
                .operand(temp_dst(0, ComponentMask::X))
                .operand(
                    OperandBuilder::new(OperandType::Temp)
                        .swizzle(Swizzle::XYZW)
                        .modifiers(OperandModifiers::NEG | OperandModifiers::ABS)
                        .index(1)
                        .build(),
                )
                .operand(
                    OperandBuilder::new(OperandType::ConstantBuffer)
                        .swizzle(Swizzle::XYZW)
                        .index(2)
                        .relative_index(Some(3), temp_select(2, 0))
                        .build(),
                )
                .build(),
            InstBuilder::new(Opcode::Sample)
                .texel_offsets(1, -1, 0)
                .operand(temp_dst(1, ComponentMask::XY))
                .operand(temp_src(0, Swizzle::XYZW))
                .operand(
                    OperandBuilder::new(OperandType::Resource)
                        .swizzle(Swizzle::XYZW)
                        .index(4)
                        .build(),
                )
                .operand(OperandBuilder::new(OperandType::Sampler).no_components().index(1).build())
                .build(),
            ret(),
        ],
    )
}

/// Renders every instruction with its operands, the way a dump tool would.
fn disassemble(program: &Sm4Program) -> Vec<String> {
    program
        .instructions()
        .map(|inst| inst.expect("decode").to_string())
        .collect()
}

#[test]
fn decoding_is_deterministic_and_restartable() {
    let program = Sm4Program::from_tokens(sample_program()).unwrap();
    let first = disassemble(&program);
    let second = disassemble(&program);
    assert_eq!(first, second);

    let mut reader = program.instructions();
    let a: Vec<usize> = reader.by_ref().map(|i| i.unwrap().at_dword()).collect();
    reader.restart();
    let b: Vec<usize> = reader.map(|i| i.unwrap().at_dword()).collect();
    assert_eq!(a, b);
    assert_eq!(a[0], 2);
}

#[test]
fn disassembly_matches_expected_text() {
    let program = Sm4Program::from_tokens(sample_program()).unwrap();
    assert_eq!(
        disassemble(&program),
        vec![
            "dcl_globalflags".to_owned(),
            "dcl_constantbuffer cb2[16].xyzw".to_owned(),
            "dcl_resource t4, 0x5555".to_owned(),
            "dcl_sampler s1".to_owned(),
            "dcl_temps 0x3".to_owned(),
            "dp3 r0.x, -|r1.xyzw|, cb2[r2.x + 3].xyzw".to_owned(),
            "sample r1.xy, r0.xyzw, t4.xyzw, s1".to_owned(),
            "ret".to_owned(),
        ]
    );
}

#[test]
fn operand_lengths_chain_without_gaps() {
    let program = Sm4Program::from_tokens(sample_program()).unwrap();
    for inst in program.instructions() {
        let inst = inst.unwrap();
        if !matches!(inst.opcode(), Opcode::Dp3 | Opcode::Sample) {
            continue;
        }

        let mut reader = inst.operands();
        let mut forward = Vec::new();
        while reader.remaining() > 0 {
            forward.push(reader.next_operand().unwrap());
        }

        let mut offset = 0;
        for op in &forward {
            let reparsed = inst.operand(offset).unwrap();
            assert_eq!(&reparsed, op);
            offset += reparsed.len();
        }
        assert_eq!(offset, inst.args().len());
    }
}

#[test]
fn relative_index_and_modifiers_are_decoded() {
    let program = Sm4Program::from_tokens(sample_program()).unwrap();
    let dp3 = program
        .instructions()
        .map(Result::unwrap)
        .find(|i| i.opcode() == Opcode::Dp3)
        .unwrap();

    let mut ops = dp3.operands();
    let dst = ops.next_operand().unwrap();
    assert_eq!(dst.component_mask(), ComponentMask::X);

    let src0 = ops.next_operand().unwrap();
    assert_eq!(src0.modifiers(), OperandModifiers::NEG | OperandModifiers::ABS);

    let src1 = ops.next_operand().unwrap();
    assert_eq!(src1.index_dimension(), 2);
    assert_eq!(src1.index(0).unwrap().imm_part(), 2);
    let element = src1.index(1).unwrap();
    assert!(element.has_imm_part() && element.has_rel_part());
    assert_eq!(element.imm_part(), 3);
    assert_eq!(element.rel_part().unwrap().imm_index(0), Some(2));
    assert!(matches!(
        src1.index(2).unwrap_err().kind,
        DecodeErrorKind::MissingIndex { index: 2, dim: 2 }
    ));
}

#[test]
fn sample_offsets_and_declaration_fields() {
    let program = Sm4Program::from_tokens(sample_program()).unwrap();
    let insts: Vec<_> = program.instructions().map(Result::unwrap).collect();

    let dcl_resource = insts.iter().find(|i| i.opcode() == Opcode::DclResource).unwrap();
    assert_eq!(dcl_resource.resource_dim().unwrap(), ResourceDim::Texture2D);

    let sample = insts.iter().find(|i| i.opcode() == Opcode::Sample).unwrap();
    assert_eq!(sample.sample_offsets(), [1, -1, 0]);
}

#[test]
fn instruction_past_end_is_rejected() {
    let mut words = build_program(ShaderStage::Vertex, &[dcl_temps(1), ret()]);
    // Claim dcl_temps is 5 words long.
    words[2] = (words[2] & !(0x7f << 24)) | (5 << 24);
    let program = Sm4Program::from_tokens(words).unwrap();
    let results: Vec<_> = program.instructions().collect();
    assert_eq!(results.len(), 1);
    let err = results[0].clone().unwrap_err();
    assert_eq!(err.at_dword, 2);
    assert_eq!(
        err.kind,
        DecodeErrorKind::InstructionOutOfBounds {
            start: 2,
            len: 5,
            available: 5
        }
    );
}

#[test]
fn zero_length_instruction_is_rejected() {
    let words = build_program(ShaderStage::Vertex, &[vec![Opcode::Nop.raw()]]);
    let program = Sm4Program::from_tokens(words).unwrap();
    let mut reader = program.instructions();
    assert_eq!(
        reader.next().unwrap().unwrap_err().kind,
        DecodeErrorKind::InstructionLengthZero
    );
    assert!(reader.next().is_none());
}

#[test]
fn unknown_opcode_is_a_decode_error() {
    let words = build_program(ShaderStage::Vertex, &[InstBuilder::raw(107).build()]);
    let program = Sm4Program::from_tokens(words).unwrap();
    let err = program.instructions().next().unwrap().unwrap_err();
    assert_eq!(err.kind, DecodeErrorKind::UnknownOpcode { raw: 107 });
}

#[test]
fn customdata_length_comes_from_the_next_word() {
    // Immediate constant buffer: customdata class 3, 4 payload words.
    let icb = vec![Opcode::CustomData.raw() | (3 << 11), 6, 1, 2, 3, 4];
    let words = build_program(ShaderStage::Pixel, &[icb, ret()]);
    let program = Sm4Program::from_tokens(words).unwrap();
    let insts: Vec<_> = program.instructions().map(Result::unwrap).collect();
    assert_eq!(insts.len(), 2);
    assert_eq!(insts[0].opcode(), Opcode::CustomData);
    assert_eq!(insts[0].args(), &[1, 2, 3, 4]);
    assert_eq!(insts[1].opcode(), Opcode::Ret);
}

#[test]
fn customdata_without_length_word_is_rejected() {
    let words = build_program(ShaderStage::Pixel, &[vec![Opcode::CustomData.raw()]]);
    let program = Sm4Program::from_tokens(words).unwrap();
    let err = program.instructions().next().unwrap().unwrap_err();
    assert!(matches!(err.kind, DecodeErrorKind::UnexpectedEof { .. }));
}

#[test]
fn system_value_argument_follows_operand() {
    let words = build_program(
        ShaderStage::Vertex,
        &[dcl_interface(
            Opcode::DclOutputSiv,
            OperandType::Output,
            0,
            ComponentMask::XYZW,
            Some(SystemValue::Position),
            None,
        )],
    );
    let program = Sm4Program::from_tokens(words).unwrap();
    let inst = program.instructions().next().unwrap().unwrap();
    let mut ops = inst.operands();
    let reg = ops.next_operand().unwrap();
    assert_eq!(reg.imm_index(0), Some(0));
    assert_eq!(ops.read_arg().unwrap(), SystemValue::Position.raw());
    assert!(ops.read_arg().is_err());
}

mod common;

use aero_d3d11::binding_model::SLOTS_PER_STAGE;
use aero_d3d11::{
    compile_bytecode, compile_program, CompileErrorKind, CompiledShader, CompilerOptions,
    ResourceKind, ResourceSlot,
};
use aero_dxbc::test_utils::*;
use aero_dxbc::{
    ComponentMask, InterpolationMode, Opcode, OperandType, ResourceDim, ResourceReturnType,
    SamplerMode, ShaderStage, Swizzle, SystemValue,
};
use aero_spirv::spirv::Op;
use pretty_assertions::assert_eq;

use common::program;

fn validate(compiled: &CompiledShader) -> naga::Module {
    let bytes = compiled.shader.code().to_bytes();
    let module = naga::front::spv::parse_u8_slice(&bytes, &naga::front::spv::Options::default())
        .expect("generated SPIR-V should parse");
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    )
    .validate(&module)
    .expect("generated SPIR-V should validate");
    module
}

fn output(register: u32) -> Vec<u32> {
    OperandBuilder::new(OperandType::Output)
        .mask(ComponentMask::XYZW)
        .index(register)
        .build()
}

fn input(register: u32, swizzle: Swizzle) -> Vec<u32> {
    OperandBuilder::new(OperandType::Input)
        .swizzle(swizzle)
        .index(register)
        .build()
}

fn textured_pixel_shader() -> Vec<Vec<u32>> {
    vec![
        dcl_global_flags(1),
        dcl_constant_buffer(0, 4),
        dcl_resource(0, ResourceDim::Texture2D, [ResourceReturnType::Float; 4]),
        dcl_sampler(0, SamplerMode::Default),
        dcl_interface(
            Opcode::DclInputPs,
            OperandType::Input,
            0,
            ComponentMask::XY,
            None,
            Some(InterpolationMode::Linear),
        ),
        dcl_interface(
            Opcode::DclOutput,
            OperandType::Output,
            0,
            ComponentMask::XYZW,
            None,
            None,
        ),
        dcl_temps(2),
        InstBuilder::new(Opcode::Sample)
            .operand(temp_dst(0, ComponentMask::XYZW))
            .operand(input(0, Swizzle([0, 1, 0, 0])))
            .operand(
                OperandBuilder::new(OperandType::Resource)
                    .swizzle(Swizzle::XYZW)
                    .index(0)
                    .build(),
            )
            .operand(
                OperandBuilder::new(OperandType::Sampler)
                    .no_components()
                    .index(0)
                    .build(),
            )
            .build(),
        InstBuilder::new(Opcode::Mad)
            .saturate()
            .operand(temp_dst(1, ComponentMask::XYZW))
            .operand(temp_src(0, Swizzle::XYZW))
            .operand(cb_src(0, 1, Swizzle::XYZW))
            .operand(cb_src(0, 2, Swizzle::XXXX))
            .build(),
        InstBuilder::new(Opcode::Dp3)
            .operand(temp_dst(1, ComponentMask::W))
            .operand(temp_src(1, Swizzle([0, 1, 2, 0])))
            .operand(temp_src(0, Swizzle([0, 1, 2, 0])))
            .build(),
        InstBuilder::new(Opcode::Rsq)
            .operand(temp_dst(1, ComponentMask::W))
            .operand(temp_select(1, 3))
            .build(),
        InstBuilder::new(Opcode::Mov)
            .operand(output(0))
            .operand(temp_src(1, Swizzle::XYZW))
            .build(),
        ret(),
    ]
}

#[test]
fn pixel_shader_translates_to_valid_spirv() {
    let compiled = compile_program(
        &program(ShaderStage::Pixel, &textured_pixel_shader()),
        &CompilerOptions::default(),
    )
    .unwrap();
    assert!(!compiled.is_partial(), "{:?}", compiled.diagnostics);

    let module = validate(&compiled);
    assert_eq!(module.entry_points.len(), 1);
    assert_eq!(module.entry_points[0].name, "main");
    assert_eq!(module.entry_points[0].stage, naga::ShaderStage::Fragment);

    let base = SLOTS_PER_STAGE;
    assert_eq!(
        compiled.shader.slots(),
        [
            ResourceSlot {
                slot: base,
                kind: ResourceKind::UniformBuffer
            },
            ResourceSlot {
                slot: base + 32,
                kind: ResourceKind::SampledImage
            },
            ResourceSlot {
                slot: base + 160,
                kind: ResourceKind::Sampler
            },
        ]
    );
}

#[test]
fn vertex_shader_writes_position_and_indexes_constants() {
    let body = [
        dcl_constant_buffer(0, 4),
        dcl_interface(
            Opcode::DclInput,
            OperandType::Input,
            0,
            ComponentMask::XYZW,
            None,
            None,
        ),
        dcl_interface(
            Opcode::DclOutputSiv,
            OperandType::Output,
            0,
            ComponentMask::XYZW,
            Some(SystemValue::Position),
            None,
        ),
        dcl_interface(
            Opcode::DclOutput,
            OperandType::Output,
            1,
            ComponentMask::XYZW,
            None,
            None,
        ),
        dcl_temps(1),
        InstBuilder::new(Opcode::Mov)
            .operand(output(0))
            .operand(input(0, Swizzle::XYZW))
            .build(),
        InstBuilder::new(Opcode::Mov)
            .operand(temp_dst(0, ComponentMask::X))
            .operand(imm32_scalar(2))
            .build(),
        InstBuilder::new(Opcode::Mul)
            .operand(output(1))
            .operand(input(0, Swizzle::XYZW))
            .operand(
                OperandBuilder::new(OperandType::ConstantBuffer)
                    .swizzle(Swizzle::XYZW)
                    .index(0)
                    .relative_index(Some(1), temp_select(0, 0))
                    .build(),
            )
            .build(),
        ret(),
    ];
    let compiled =
        compile_program(&program(ShaderStage::Vertex, &body), &CompilerOptions::default())
            .unwrap();
    assert!(compiled.diagnostics.is_empty());

    let module = validate(&compiled);
    assert_eq!(module.entry_points[0].stage, naga::ShaderStage::Vertex);
    assert_eq!(compiled.shader.slots()[0].slot, 0);
}

#[test]
fn compute_shader_carries_its_thread_group_size() {
    let body = [
        dcl_thread_group(8, 4, 1),
        dcl_temps(1),
        InstBuilder::new(Opcode::Mov)
            .operand(temp_dst(0, ComponentMask::XYZW))
            .operand(imm_f32x4([1.0, 2.0, 3.0, 4.0]))
            .build(),
        ret(),
    ];
    let compiled =
        compile_program(&program(ShaderStage::Compute, &body), &CompilerOptions::default())
            .unwrap();
    let module = validate(&compiled);
    assert_eq!(module.entry_points[0].stage, naga::ShaderStage::Compute);
    assert_eq!(module.entry_points[0].workgroup_size, [8, 4, 1]);
}

#[test]
fn partial_translations_still_validate() {
    let mut body = textured_pixel_shader();
    let ret = body.pop().unwrap();
    body.push(
        InstBuilder::new(Opcode::Log)
            .operand(temp_dst(1, ComponentMask::XYZW))
            .operand(temp_src(0, Swizzle::XYZW))
            .build(),
    );
    body.push(ret);

    let compiled =
        compile_program(&program(ShaderStage::Pixel, &body), &CompilerOptions::default())
            .unwrap();
    assert!(compiled.is_partial());
    assert_eq!(compiled.diagnostics[0].opcode, Opcode::Log);
    validate(&compiled);

    let err = compile_program(&program(ShaderStage::Pixel, &body), &CompilerOptions::strict())
        .unwrap_err();
    assert!(matches!(err.kind, CompileErrorKind::CoverageGap(_)));
}

#[test]
fn entry_point_name_and_debug_names_follow_options() {
    let body = textured_pixel_shader();
    let options = CompilerOptions {
        entry_point: "ps_main".to_owned(),
        ..CompilerOptions::default()
    };
    let named = compile_program(&program(ShaderStage::Pixel, &body), &options).unwrap();
    assert_eq!(validate(&named).entry_points[0].name, "ps_main");

    let count_names = |compiled: &CompiledShader| {
        compiled
            .shader
            .code()
            .instructions()
            .filter(|i| i.opcode() == Op::Name as u32)
            .count()
    };
    assert!(count_names(&named) > 0);

    let options = CompilerOptions {
        debug_names: false,
        ..CompilerOptions::default()
    };
    let stripped = compile_program(&program(ShaderStage::Pixel, &body), &options).unwrap();
    assert_eq!(count_names(&stripped), 0);
    validate(&stripped);
}

#[test]
fn bytecode_entry_point_reports_decode_and_stage_errors() {
    let err = compile_bytecode(&[0u8; 7], &CompilerOptions::default()).unwrap_err();
    assert!(matches!(err.kind, CompileErrorKind::Decode(_)));
    assert_eq!(err.opcode, None);

    let hull = tokens_to_bytes(&build_program(ShaderStage::Hull, &[ret()]));
    let err = compile_bytecode(&hull, &CompilerOptions::default()).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::UnsupportedStage(ShaderStage::Hull));
}

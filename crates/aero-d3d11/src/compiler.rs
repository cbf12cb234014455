//! SM4/SM5 instruction translation.
//!
//! [`DxbcCompiler`] consumes decoded instructions one at a time and drives a
//! [`CodeGen`]. It keeps no symbol table of its own: declarations are
//! forwarded to the generator as they are seen, and operand shapes are checked
//! against what each opcode requires.

use std::sync::Arc;

use aero_dxbc::{
    ComponentCount, ComponentMask, ComponentSelection, IndexRepresentation, Instruction,
    InterpolationMode, Opcode, Operand, OperandIndex, OperandModifiers, OperandType,
    ResourceReturnType, ShaderStage, Sm4Program, SystemValue,
};
use tracing::{debug, debug_span, trace, warn};

use crate::codegen::{
    CodeGen, CodeGenError, InterfaceVarDecl, Pointer, ScalarType, SpirvCodeGen, Value,
};
use crate::diagnostics::{CompiledShader, Diagnostic, DiagnosticKind};
use crate::error::{CompileError, CompileErrorKind};
use crate::options::CompilerOptions;

type HandlerResult<T = ()> = Result<T, CompileErrorKind>;

/// D3D11 limit on `r#` registers per shader.
pub const MAX_TEMPS: u32 = 4096;

/// Translates one shader program through a [`CodeGen`].
#[derive(Debug)]
pub struct DxbcCompiler<G> {
    stage: ShaderStage,
    gen: G,
    strict_coverage: bool,
    end_dword: usize,
    pending: Vec<DiagnosticKind>,
    diagnostics: Vec<Diagnostic>,
}

impl<G: CodeGen> DxbcCompiler<G> {
    pub fn new(stage: ShaderStage, gen: G, options: &CompilerOptions) -> Self {
        Self {
            stage,
            gen,
            strict_coverage: options.strict_coverage,
            end_dword: 0,
            pending: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Coverage gaps recorded so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Translates one instruction.
    ///
    /// Structural violations abort with an error. Coverage gaps are recorded
    /// as diagnostics and the instruction is skipped, unless coverage is
    /// strict.
    pub fn process_instruction(&mut self, inst: &Instruction<'_>) -> Result<(), CompileError> {
        let opcode = inst.opcode();
        trace!(at_dword = inst.at_dword(), %inst, "translating");
        self.end_dword = inst.at_dword() + inst.len();

        let result = match opcode {
            Opcode::DclGlobalFlags => {
                debug!(flags = ?inst.global_flags(), "global flags ignored");
                Ok(())
            }
            Opcode::DclConstantBuffer => self.dcl_constant_buffer(inst),
            Opcode::DclResource => self.dcl_resource(inst),
            Opcode::DclSampler => self.dcl_sampler(inst),
            Opcode::DclInput
            | Opcode::DclInputSgv
            | Opcode::DclInputSiv
            | Opcode::DclInputPs
            | Opcode::DclInputPsSgv
            | Opcode::DclInputPsSiv
            | Opcode::DclOutput
            | Opcode::DclOutputSgv
            | Opcode::DclOutputSiv => self.dcl_interface_var(inst),
            Opcode::DclTemps => self.dcl_temps(inst),
            Opcode::DclThreadGroup => self.dcl_thread_group(inst),
            Opcode::Add | Opcode::Mul => self.op_arith(inst),
            Opcode::Mad => self.op_mad(inst),
            Opcode::Mov => self.op_mov(inst),
            Opcode::Dp2 => self.op_dot(inst, 2),
            Opcode::Dp3 => self.op_dot(inst, 3),
            Opcode::Dp4 => self.op_dot(inst, 4),
            Opcode::Rsq => self.op_rsq(inst),
            Opcode::Ret => self.gen.fn_return().map_err(CompileErrorKind::from),
            Opcode::Sample => self.op_sample(inst),
            Opcode::Nop | Opcode::CustomData => Ok(()),
            _ => {
                self.pending.push(DiagnosticKind::UnhandledOpcode);
                Ok(())
            }
        };

        let mut pending = std::mem::take(&mut self.pending);
        match result {
            Ok(()) => {}
            Err(CompileErrorKind::NotImplemented { what })
            | Err(CompileErrorKind::CodeGen(CodeGenError::NotImplemented { what })) => {
                pending.push(DiagnosticKind::NotImplemented { what });
            }
            Err(kind) => return Err(CompileError::new(inst.at_dword(), Some(opcode), kind)),
        }
        for kind in pending {
            self.report(inst.at_dword(), opcode, kind)?;
        }
        Ok(())
    }

    /// Finishes the shader.
    pub fn finalize(self) -> Result<(G::Output, Vec<Diagnostic>), CompileError> {
        let output = self
            .gen
            .finalize()
            .map_err(|err| CompileError::new(self.end_dword, None, err.into()))?;
        Ok((output, self.diagnostics))
    }

    fn report(
        &mut self,
        at_dword: usize,
        opcode: Opcode,
        kind: DiagnosticKind,
    ) -> Result<(), CompileError> {
        let diagnostic = Diagnostic {
            at_dword,
            opcode,
            kind,
        };
        warn!(at_dword, opcode = opcode.mnemonic(), "{}", diagnostic.kind);
        if self.strict_coverage {
            return Err(CompileError::new(
                at_dword,
                Some(opcode),
                CompileErrorKind::CoverageGap(diagnostic),
            ));
        }
        self.diagnostics.push(diagnostic);
        Ok(())
    }

    fn dcl_constant_buffer(&mut self, inst: &Instruction<'_>) -> HandlerResult {
        let operand = inst.operand(0)?;
        expect_operand_type(&operand, OperandType::ConstantBuffer, "dcl_constantbuffer")?;
        expect_index_dimension(&operand, 2, "dcl_constantbuffer")?;
        let register = imm_index(&operand, 0, "dcl_constantbuffer")?;
        let size = imm_index(&operand, 1, "dcl_constantbuffer")?;
        debug!(register, size, "constant buffer");
        self.gen.dcl_constant_buffer(register, size)?;
        Ok(())
    }

    fn dcl_resource(&mut self, inst: &Instruction<'_>) -> HandlerResult {
        let operand = inst.operand(0)?;
        expect_operand_type(&operand, OperandType::Resource, "dcl_resource")?;
        expect_index_dimension(&operand, 1, "dcl_resource")?;
        let register = imm_index(&operand, 0, "dcl_resource")?;
        let dim = inst.resource_dim()?;

        // One 4-bit return type per component, after the operand.
        let word = inst.arg(operand.len())?;
        let at_dword = inst.args_at_dword() + operand.len();
        let mut return_types = [ResourceReturnType::Float; 4];
        for (i, ty) in return_types.iter_mut().enumerate() {
            *ty = ResourceReturnType::decode((word >> (4 * i)) & 0xf, at_dword)?;
        }
        let return_type = return_types[0];
        if return_types.iter().any(|&ty| ty != return_type) {
            self.pending.push(DiagnosticKind::MixedReturnTypes {
                register,
                return_types,
            });
        }

        debug!(register, %dim, %return_type, "resource");
        self.gen.dcl_resource(register, dim, return_type)?;
        Ok(())
    }

    fn dcl_sampler(&mut self, inst: &Instruction<'_>) -> HandlerResult {
        let operand = inst.operand(0)?;
        expect_operand_type(&operand, OperandType::Sampler, "dcl_sampler")?;
        expect_index_dimension(&operand, 1, "dcl_sampler")?;
        let register = imm_index(&operand, 0, "dcl_sampler")?;
        let mode = inst.sampler_mode()?;
        debug!(register, %mode, "sampler");
        self.gen.dcl_sampler(register, mode)?;
        Ok(())
    }

    fn dcl_interface_var(&mut self, inst: &Instruction<'_>) -> HandlerResult {
        let opcode = inst.opcode();
        let operand = inst.operand(0)?;
        let operand_type = operand.operand_type();
        if !matches!(operand_type, OperandType::Input | OperandType::Output) {
            return Err(CompileErrorKind::NotImplemented {
                what: format!("{} of {operand}", opcode.mnemonic()),
            });
        }

        let (region, register) = match operand.index_dimension() {
            1 => (None, imm_index(&operand, 0, "interface declaration")?),
            2 => (
                Some(imm_index(&operand, 0, "interface declaration")?),
                imm_index(&operand, 1, "interface declaration")?,
            ),
            found => {
                return Err(CompileErrorKind::InvalidIndexDimension {
                    context: "interface declaration",
                    found,
                })
            }
        };
        let mask = dst_mask(&operand)?;

        let has_system_value = matches!(
            opcode,
            Opcode::DclInputSgv
                | Opcode::DclInputSiv
                | Opcode::DclInputPsSgv
                | Opcode::DclInputPsSiv
                | Opcode::DclOutputSgv
                | Opcode::DclOutputSiv
        );
        let mut system_value = if has_system_value {
            let at_dword = inst.args_at_dword() + operand.len();
            SystemValue::decode(inst.arg(operand.len())?, at_dword)?
        } else {
            SystemValue::Undefined
        };
        if !self.gen.supports_system_value(operand_type, system_value) {
            self.pending.push(DiagnosticKind::UnsupportedSystemValue {
                operand_type,
                register,
                system_value,
            });
            system_value = SystemValue::Undefined;
        }

        let interpolation = if matches!(opcode, Opcode::DclInputPs | Opcode::DclInputPsSiv) {
            inst.interpolation_mode()?
        } else {
            InterpolationMode::Undefined
        };

        let decl = InterfaceVarDecl {
            operand_type,
            register,
            region,
            mask,
            system_value,
            interpolation,
        };
        debug!(?decl, "interface variable");
        self.gen.dcl_interface_var(&decl)?;
        Ok(())
    }

    fn dcl_temps(&mut self, inst: &Instruction<'_>) -> HandlerResult {
        let count = inst.arg(0)?;
        if count > MAX_TEMPS {
            return Err(CompileErrorKind::TooManyTemps {
                count,
                max: MAX_TEMPS,
            });
        }
        debug!(count, "temps");
        self.gen.dcl_temps(count)?;
        Ok(())
    }

    fn dcl_thread_group(&mut self, inst: &Instruction<'_>) -> HandlerResult {
        let (x, y, z) = (inst.arg(0)?, inst.arg(1)?, inst.arg(2)?);
        debug!(x, y, z, "thread group");
        self.gen.dcl_thread_group(x, y, z)?;
        Ok(())
    }

    fn op_arith(&mut self, inst: &Instruction<'_>) -> HandlerResult {
        let mut operands = inst.operands();
        let dst = operands.next_operand()?;
        let src0 = operands.next_operand()?;
        let src1 = operands.next_operand()?;

        let mask = dst_mask(&dst)?;
        let a = self.load_operand(&src0, mask, ScalarType::Float32)?;
        let b = self.load_operand(&src1, mask, ScalarType::Float32)?;
        let value = if inst.opcode() == Opcode::Add {
            self.gen.op_add(a, b)?
        } else {
            self.gen.op_mul(a, b)?
        };
        self.store_result(inst, &dst, value, mask)
    }

    fn op_mad(&mut self, inst: &Instruction<'_>) -> HandlerResult {
        let mut operands = inst.operands();
        let dst = operands.next_operand()?;
        let src0 = operands.next_operand()?;
        let src1 = operands.next_operand()?;
        let src2 = operands.next_operand()?;

        let mask = dst_mask(&dst)?;
        let a = self.load_operand(&src0, mask, ScalarType::Float32)?;
        let b = self.load_operand(&src1, mask, ScalarType::Float32)?;
        let c = self.load_operand(&src2, mask, ScalarType::Float32)?;
        let product = self.gen.op_mul(a, b)?;
        let value = self.gen.op_add(product, c)?;
        self.store_result(inst, &dst, value, mask)
    }

    fn op_mov(&mut self, inst: &Instruction<'_>) -> HandlerResult {
        let mut operands = inst.operands();
        let dst = operands.next_operand()?;
        let src = operands.next_operand()?;

        let mask = dst_mask(&dst)?;
        let value = self.load_operand(&src, mask, ScalarType::Float32)?;
        self.store_result(inst, &dst, value, mask)
    }

    /// `dp2`/`dp3`/`dp4`: sources always read their first `n` components,
    /// whatever the destination writes.
    fn op_dot(&mut self, inst: &Instruction<'_>, n: u32) -> HandlerResult {
        let mut operands = inst.operands();
        let dst = operands.next_operand()?;
        let src0 = operands.next_operand()?;
        let src1 = operands.next_operand()?;

        let mask = dst_mask(&dst)?;
        let src_mask = ComponentMask::first_n(n);
        let a = self.load_operand(&src0, src_mask, ScalarType::Float32)?;
        let b = self.load_operand(&src1, src_mask, ScalarType::Float32)?;
        let value = self.gen.op_dot(a, b)?;
        self.store_result(inst, &dst, value, mask)
    }

    fn op_rsq(&mut self, inst: &Instruction<'_>) -> HandlerResult {
        let mut operands = inst.operands();
        let dst = operands.next_operand()?;
        let src = operands.next_operand()?;

        let mask = dst_mask(&dst)?;
        let value = self.load_operand(&src, mask, ScalarType::Float32)?;
        let value = self.gen.op_rsqrt(value)?;
        self.store_result(inst, &dst, value, mask)
    }

    fn op_sample(&mut self, inst: &Instruction<'_>) -> HandlerResult {
        let mut operands = inst.operands();
        let dst = operands.next_operand()?;
        let coord = operands.next_operand()?;
        let texture = operands.next_operand()?;
        let sampler = operands.next_operand()?;

        expect_operand_type(&texture, OperandType::Resource, "sample texture")?;
        expect_index_dimension(&texture, 1, "sample texture")?;
        expect_operand_type(&sampler, OperandType::Sampler, "sample sampler")?;
        expect_index_dimension(&sampler, 1, "sample sampler")?;
        let texture_register = imm_index(&texture, 0, "sample texture")?;
        let sampler_register = imm_index(&sampler, 0, "sample sampler")?;

        let offsets = inst.sample_offsets();
        if offsets != [0; 3] {
            self.pending
                .push(DiagnosticKind::IgnoredTexelOffsets { offsets });
        }

        let mask = dst_mask(&dst)?;
        let coord = self.load_operand(&coord, ComponentMask::XYZW, ScalarType::Float32)?;
        let value = self
            .gen
            .tex_sample(texture_register, sampler_register, coord)?;
        let value = self.select_operand_components(&texture, value, mask)?;
        self.store_result(inst, &dst, value, mask)
    }

    /// Applies `_sat` and stores.
    fn store_result(
        &mut self,
        inst: &Instruction<'_>,
        dst: &Operand,
        value: Value,
        mask: ComponentMask,
    ) -> HandlerResult {
        let value = if inst.control().saturate() {
            self.gen.op_saturate(value)?
        } else {
            value
        };
        self.store_operand(dst, value, mask)
    }

    /// Loads `operand` as `ty`, narrowed to `mask`.
    ///
    /// A single component is broadcast to the width of `mask`.
    fn load_operand(
        &mut self,
        operand: &Operand,
        mask: ComponentMask,
        ty: ScalarType,
    ) -> HandlerResult<Value> {
        let value = if operand.operand_type() == OperandType::Imm32 {
            match operand.component_count() {
                ComponentCount::One => self.gen.def_const_scalar(ty, operand.imm32(0)?)?,
                ComponentCount::Four => {
                    let bits = [
                        operand.imm32(0)?,
                        operand.imm32(1)?,
                        operand.imm32(2)?,
                        operand.imm32(3)?,
                    ];
                    let value = self.gen.def_const_vector(ty, bits)?;
                    self.gen.reg_extract(value, mask)?
                }
                count => {
                    return Err(CompileErrorKind::InvalidComponentCount {
                        context: "immediate operand",
                        count,
                    })
                }
            }
        } else {
            let ptr = self.operand_ptr(operand)?;
            let value = self.gen.reg_load(ptr)?;
            let value = self.gen.reg_cast(value, ty)?;
            let value = match operand.component_count() {
                ComponentCount::Four => self.select_operand_components(operand, value, mask)?,
                ComponentCount::One => self.gen.reg_extract(value, ComponentMask::X)?,
                count => {
                    return Err(CompileErrorKind::InvalidComponentCount {
                        context: "source operand",
                        count,
                    })
                }
            };
            self.apply_modifiers(value, operand.modifiers())?
        };

        let width = mask.component_count();
        if value.ty.count == 1 && width > 1 {
            return Ok(self.gen.reg_vector(value, width)?);
        }
        Ok(value)
    }

    fn apply_modifiers(&mut self, value: Value, modifiers: OperandModifiers) -> HandlerResult<Value> {
        let mut value = value;
        if modifiers.contains(OperandModifiers::ABS) {
            value = self.gen.op_abs(value)?;
        }
        if modifiers.contains(OperandModifiers::NEG) {
            value = self.gen.op_neg(value)?;
        }
        Ok(value)
    }

    fn select_operand_components(
        &mut self,
        operand: &Operand,
        value: Value,
        mask: ComponentMask,
    ) -> HandlerResult<Value> {
        let value = match operand.component_selection() {
            Some(ComponentSelection::Swizzle(swizzle)) => {
                self.gen.reg_swizzle(value, swizzle, mask)?
            }
            Some(ComponentSelection::Select1(component)) => self
                .gen
                .reg_extract(value, ComponentMask::select(component))?,
            Some(ComponentSelection::Mask(own)) => self.gen.reg_extract(value, own)?,
            None => {
                return Err(CompileErrorKind::InvalidSelectionMode {
                    context: "source operand",
                    mode: operand.selection_mode(),
                })
            }
        };
        Ok(value)
    }

    fn store_operand(&mut self, operand: &Operand, value: Value, mask: ComponentMask) -> HandlerResult {
        let ptr = self.operand_ptr(operand)?;
        let width = mask.component_count();
        let value = if value.ty.count == 1 && width > 1 {
            self.gen.reg_vector(value, width)?
        } else {
            value
        };
        let value = self.gen.reg_cast(value, ptr.ty.value.scalar)?;
        self.gen.reg_store(ptr, value, mask)?;
        Ok(())
    }

    fn operand_ptr(&mut self, operand: &Operand) -> HandlerResult<Pointer> {
        match operand.operand_type() {
            OperandType::Temp => {
                expect_index_dimension(operand, 1, "temp register")?;
                let index = imm_index(operand, 0, "temp register")?;
                Ok(self.gen.ptr_temp_reg(index)?)
            }
            ty @ (OperandType::Input | OperandType::Output) => match operand.index_dimension() {
                1 => {
                    let register = imm_index(operand, 0, "interface register")?;
                    Ok(self.gen.ptr_interface_var(ty, register)?)
                }
                2 => Err(CompileErrorKind::NotImplemented {
                    what: format!("vertex-indexed interface register {operand}"),
                }),
                found => Err(CompileErrorKind::InvalidIndexDimension {
                    context: "interface register",
                    found,
                }),
            },
            OperandType::ConstantBuffer => {
                expect_index_dimension(operand, 2, "constant buffer")?;
                let register = imm_index(operand, 0, "constant buffer")?;
                let element = self.dynamic_index(operand.index(1)?, 1, "constant buffer")?;
                Ok(self.gen.ptr_constant_buffer(register, element)?)
            }
            operand_type => Err(CompileErrorKind::UnexpectedOperandType {
                context: "register operand",
                operand_type,
            }),
        }
    }

    /// Immediate part, relative part, or their sum, as a `u32` value.
    fn dynamic_index(
        &mut self,
        index: &OperandIndex,
        position: usize,
        context: &'static str,
    ) -> HandlerResult<Value> {
        let imm = if index.has_imm_part() {
            Some(
                self.gen
                    .def_const_scalar(ScalarType::Uint32, index.imm_part() as u32)?,
            )
        } else {
            None
        };
        let rel = match index.rel_part() {
            Some(rel) => Some(self.load_operand(rel, ComponentMask::X, ScalarType::Uint32)?),
            None => None,
        };
        match (imm, rel) {
            (Some(imm), None) => Ok(imm),
            (None, Some(rel)) => Ok(rel),
            (Some(imm), Some(rel)) => Ok(self.gen.op_add(rel, imm)?),
            (None, None) => Err(CompileErrorKind::EmptyIndex {
                context,
                index: position,
            }),
        }
    }
}

/// Write mask of a destination operand.
fn dst_mask(operand: &Operand) -> HandlerResult<ComponentMask> {
    match operand.component_count() {
        ComponentCount::One => Ok(ComponentMask::X),
        ComponentCount::Four => match operand.component_selection() {
            Some(ComponentSelection::Mask(mask)) => Ok(mask),
            Some(ComponentSelection::Select1(component)) => Ok(ComponentMask::select(component)),
            _ => Err(CompileErrorKind::InvalidSelectionMode {
                context: "destination operand",
                mode: operand.selection_mode(),
            }),
        },
        count => Err(CompileErrorKind::InvalidComponentCount {
            context: "destination operand",
            count,
        }),
    }
}

fn expect_operand_type(
    operand: &Operand,
    expected: OperandType,
    context: &'static str,
) -> HandlerResult {
    if operand.operand_type() != expected {
        return Err(CompileErrorKind::UnexpectedOperandType {
            context,
            operand_type: operand.operand_type(),
        });
    }
    Ok(())
}

fn expect_index_dimension(operand: &Operand, expected: usize, context: &'static str) -> HandlerResult {
    let found = operand.index_dimension();
    if found != expected {
        return Err(CompileErrorKind::InvalidIndexDimension { context, found });
    }
    Ok(())
}

/// Index `n`, which must be a plain 32-bit immediate.
fn imm_index(operand: &Operand, n: usize, context: &'static str) -> HandlerResult<u32> {
    let index = operand.index(n)?;
    let representation = index.representation();
    if representation != IndexRepresentation::Imm32 {
        return Err(CompileErrorKind::InvalidIndexRepresentation {
            context,
            index: n,
            representation,
        });
    }
    Ok(index.imm_part() as u32)
}

/// Runs a whole program through `gen`.
pub fn translate<G: CodeGen>(
    program: &Sm4Program,
    gen: G,
    options: &CompilerOptions,
) -> Result<(G::Output, Vec<Diagnostic>), CompileError> {
    let _span = debug_span!(
        "translate",
        stage = program.stage.short_name(),
        model = %program.model,
    )
    .entered();

    let mut compiler = DxbcCompiler::new(program.stage, gen, options);
    for inst in program.instructions() {
        compiler.process_instruction(&inst?)?;
    }
    compiler.finalize()
}

/// Translates `program` to SPIR-V.
pub fn compile_program(
    program: &Sm4Program,
    options: &CompilerOptions,
) -> Result<CompiledShader, CompileError> {
    let gen = SpirvCodeGen::new(program.stage, options).map_err(|_| {
        CompileError::new(0, None, CompileErrorKind::UnsupportedStage(program.stage))
    })?;
    let (shader, diagnostics) = translate(program, gen, options)?;
    Ok(CompiledShader {
        shader: Arc::new(shader),
        diagnostics,
    })
}

/// Parses a raw SM4/SM5 token stream and translates it to SPIR-V.
pub fn compile_bytecode(
    bytes: &[u8],
    options: &CompilerOptions,
) -> Result<CompiledShader, CompileError> {
    let program = Sm4Program::parse_program_tokens(bytes)?;
    compile_program(&program, options)
}

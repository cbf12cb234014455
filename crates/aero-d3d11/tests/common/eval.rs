//! A [`CodeGen`] that evaluates one invocation on concrete lanes instead of
//! emitting code.
#![allow(dead_code)]

use std::collections::HashMap;

use aero_d3d11::{
    CodeGen, CodeGenError, CodeGenResult, InterfaceVarDecl, Pointer, PointerType, ScalarType,
    StorageClass, Value, ValueType,
};
use aero_dxbc::{
    ComponentMask, OperandType, ResourceDim, ResourceReturnType, SamplerMode, Swizzle, SystemValue,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Temp(u32),
    Input(u32),
    Output(u32),
    ConstantBuffer { register: u32, element: u32 },
}

/// One `tex_sample` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleCall {
    pub texture: u32,
    pub sampler: u32,
    pub coord: [f32; 4],
}

/// Register file of one invocation, also the generator's output.
#[derive(Debug, Clone, Default)]
pub struct EvalState {
    pub temps: Vec<[u32; 4]>,
    pub inputs: HashMap<u32, [u32; 4]>,
    pub outputs: HashMap<u32, [u32; 4]>,
    pub interface: Vec<InterfaceVarDecl>,
    pub constant_buffers: HashMap<u32, Vec<[u32; 4]>>,
    pub resources: HashMap<u32, (ResourceDim, ResourceReturnType)>,
    pub samplers: HashMap<u32, SamplerMode>,
    /// Texel returned by every sample of a texture register.
    pub texels: HashMap<u32, [f32; 4]>,
    pub samples: Vec<SampleCall>,
    pub thread_group: Option<[u32; 3]>,
    pub returns: usize,
}

impl EvalState {
    pub fn temp_f32(&self, index: usize) -> [f32; 4] {
        self.temps[index].map(f32::from_bits)
    }

    pub fn output_f32(&self, register: u32) -> [f32; 4] {
        self.outputs[&register].map(f32::from_bits)
    }
}

#[derive(Debug, Default)]
pub struct EvalGen {
    state: EvalState,
    values: Vec<(ValueType, [u32; 4])>,
    locations: Vec<Location>,
}

impl EvalGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preloads `cb{register}`. A later declaration keeps the contents.
    pub fn with_constant_buffer(mut self, register: u32, elements: Vec<[f32; 4]>) -> Self {
        self.state.constant_buffers.insert(
            register,
            elements.into_iter().map(|e| e.map(f32::to_bits)).collect(),
        );
        self
    }

    pub fn with_input(mut self, register: u32, value: [f32; 4]) -> Self {
        self.state.inputs.insert(register, value.map(f32::to_bits));
        self
    }

    pub fn with_texel(mut self, texture: u32, texel: [f32; 4]) -> Self {
        self.state.texels.insert(texture, texel);
        self
    }

    fn value(&mut self, ty: ValueType, lanes: [u32; 4]) -> Value {
        let id = self.values.len() as u32;
        self.values.push((ty, lanes));
        Value { id, ty }
    }

    fn lanes(&self, value: Value) -> [u32; 4] {
        self.values[value.id as usize].1
    }

    fn pointer(&mut self, location: Location, class: StorageClass) -> Pointer {
        let id = self.locations.len() as u32;
        self.locations.push(location);
        Pointer {
            id,
            ty: PointerType {
                value: ValueType::vec4(ScalarType::Float32),
                class,
            },
        }
    }

    fn same_type(a: Value, b: Value) -> CodeGenResult<()> {
        if a.ty != b.ty {
            return Err(CodeGenError::TypeMismatch {
                expected: a.ty,
                found: b.ty,
            });
        }
        Ok(())
    }

    fn map1(&mut self, a: Value, f: impl Fn(ScalarType, u32) -> u32) -> Value {
        let lanes = self.lanes(a);
        let mut out = [0; 4];
        for i in 0..a.ty.count as usize {
            out[i] = f(a.ty.scalar, lanes[i]);
        }
        self.value(a.ty, out)
    }

    fn map2(
        &mut self,
        a: Value,
        b: Value,
        f: impl Fn(ScalarType, u32, u32) -> u32,
    ) -> CodeGenResult<Value> {
        Self::same_type(a, b)?;
        let (la, lb) = (self.lanes(a), self.lanes(b));
        let mut out = [0; 4];
        for i in 0..a.ty.count as usize {
            out[i] = f(a.ty.scalar, la[i], lb[i]);
        }
        Ok(self.value(a.ty, out))
    }

    fn check_mask(mask: ComponentMask, count: u32) -> CodeGenResult<()> {
        if mask.is_empty() || mask.components().any(|c| u32::from(c) >= count) {
            return Err(CodeGenError::InvalidMask { mask, count });
        }
        Ok(())
    }
}

fn f32_op(f: impl Fn(f32, f32) -> f32) -> impl Fn(ScalarType, u32, u32) -> u32 {
    move |_, a, b| f(f32::from_bits(a), f32::from_bits(b)).to_bits()
}

impl CodeGen for EvalGen {
    type Output = EvalState;

    fn dcl_temps(&mut self, count: u32) -> CodeGenResult<()> {
        self.state.temps = vec![[0; 4]; count as usize];
        Ok(())
    }

    fn dcl_constant_buffer(&mut self, register: u32, size: u32) -> CodeGenResult<()> {
        self.state
            .constant_buffers
            .entry(register)
            .or_insert_with(|| vec![[0; 4]; size as usize]);
        Ok(())
    }

    fn dcl_resource(
        &mut self,
        register: u32,
        dim: ResourceDim,
        return_type: ResourceReturnType,
    ) -> CodeGenResult<()> {
        self.state.resources.insert(register, (dim, return_type));
        Ok(())
    }

    fn dcl_sampler(&mut self, register: u32, mode: SamplerMode) -> CodeGenResult<()> {
        self.state.samplers.insert(register, mode);
        Ok(())
    }

    fn dcl_interface_var(&mut self, decl: &InterfaceVarDecl) -> CodeGenResult<()> {
        if decl.region.is_some() {
            return Err(CodeGenError::not_implemented("vertex-indexed interface"));
        }
        let map = match decl.operand_type {
            OperandType::Input => &mut self.state.inputs,
            OperandType::Output => &mut self.state.outputs,
            other => return Err(CodeGenError::not_implemented(format!("{other} declaration"))),
        };
        map.entry(decl.register).or_insert([0; 4]);
        self.state.interface.push(*decl);
        Ok(())
    }

    fn dcl_thread_group(&mut self, x: u32, y: u32, z: u32) -> CodeGenResult<()> {
        self.state.thread_group = Some([x, y, z]);
        Ok(())
    }

    fn supports_system_value(&self, _: OperandType, system_value: SystemValue) -> bool {
        matches!(system_value, SystemValue::Undefined | SystemValue::Position)
    }

    fn def_const_scalar(&mut self, scalar: ScalarType, bits: u32) -> CodeGenResult<Value> {
        Ok(self.value(ValueType::scalar(scalar), [bits, 0, 0, 0]))
    }

    fn def_const_vector(&mut self, scalar: ScalarType, bits: [u32; 4]) -> CodeGenResult<Value> {
        Ok(self.value(ValueType::vec4(scalar), bits))
    }

    fn ptr_temp_reg(&mut self, index: u32) -> CodeGenResult<Pointer> {
        if index as usize >= self.state.temps.len() {
            return Err(CodeGenError::Undeclared { kind: "r", index });
        }
        Ok(self.pointer(Location::Temp(index), StorageClass::Private))
    }

    fn ptr_interface_var(
        &mut self,
        operand_type: OperandType,
        register: u32,
    ) -> CodeGenResult<Pointer> {
        let (declared, location, class, kind) = match operand_type {
            OperandType::Input => (
                self.state.inputs.contains_key(&register),
                Location::Input(register),
                StorageClass::Input,
                "v",
            ),
            OperandType::Output => (
                self.state.outputs.contains_key(&register),
                Location::Output(register),
                StorageClass::Output,
                "o",
            ),
            other => return Err(CodeGenError::not_implemented(format!("{other} pointer"))),
        };
        if !declared {
            return Err(CodeGenError::Undeclared {
                kind,
                index: register,
            });
        }
        Ok(self.pointer(location, class))
    }

    fn ptr_constant_buffer(&mut self, register: u32, element: Value) -> CodeGenResult<Pointer> {
        if !self.state.constant_buffers.contains_key(&register) {
            return Err(CodeGenError::Undeclared {
                kind: "cb",
                index: register,
            });
        }
        let element = self.lanes(element)[0];
        Ok(self.pointer(
            Location::ConstantBuffer { register, element },
            StorageClass::Uniform,
        ))
    }

    fn reg_load(&mut self, ptr: Pointer) -> CodeGenResult<Value> {
        let lanes = match self.locations[ptr.id as usize] {
            Location::Temp(i) => self.state.temps[i as usize],
            Location::Input(r) => self.state.inputs[&r],
            Location::Output(r) => self.state.outputs[&r],
            Location::ConstantBuffer { register, element } => self.state.constant_buffers
                [&register]
                .get(element as usize)
                .copied()
                .unwrap_or([0; 4]),
        };
        Ok(self.value(ptr.ty.value, lanes))
    }

    fn reg_store(&mut self, ptr: Pointer, value: Value, mask: ComponentMask) -> CodeGenResult<()> {
        if !ptr.ty.class.is_writable() {
            return Err(CodeGenError::ReadOnlyStorage {
                class: ptr.ty.class,
            });
        }
        if value.ty.scalar != ptr.ty.value.scalar {
            return Err(CodeGenError::TypeMismatch {
                expected: ptr.ty.value.with_scalar(value.ty.scalar),
                found: value.ty,
            });
        }
        Self::check_mask(mask, ptr.ty.value.count)?;
        let src = self.lanes(value);
        let positional = if value.ty.count == ptr.ty.value.count {
            true
        } else if value.ty.count == mask.component_count() {
            false
        } else {
            return Err(CodeGenError::InvalidMask {
                mask,
                count: value.ty.count,
            });
        };

        let dst = match self.locations[ptr.id as usize] {
            Location::Temp(i) => &mut self.state.temps[i as usize],
            Location::Output(r) => self.state.outputs.entry(r).or_insert([0; 4]),
            Location::Input(_) | Location::ConstantBuffer { .. } => {
                return Err(CodeGenError::ReadOnlyStorage {
                    class: ptr.ty.class,
                })
            }
        };
        for (n, c) in mask.components().enumerate() {
            let c = usize::from(c);
            dst[c] = if positional { src[c] } else { src[n] };
        }
        Ok(())
    }

    fn reg_cast(&mut self, value: Value, scalar: ScalarType) -> CodeGenResult<Value> {
        let lanes = self.lanes(value);
        Ok(self.value(value.ty.with_scalar(scalar), lanes))
    }

    fn reg_extract(&mut self, value: Value, mask: ComponentMask) -> CodeGenResult<Value> {
        Self::check_mask(mask, value.ty.count)?;
        let src = self.lanes(value);
        let mut out = [0; 4];
        for (n, c) in mask.components().enumerate() {
            out[n] = src[usize::from(c)];
        }
        Ok(self.value(
            ValueType::new(value.ty.scalar, mask.component_count()),
            out,
        ))
    }

    fn reg_swizzle(
        &mut self,
        value: Value,
        swizzle: Swizzle,
        mask: ComponentMask,
    ) -> CodeGenResult<Value> {
        let src = self.lanes(value);
        let mut out = [0; 4];
        for (n, c) in mask.components().enumerate() {
            let from = swizzle.get(c);
            if u32::from(from) >= value.ty.count {
                return Err(CodeGenError::InvalidMask {
                    mask,
                    count: value.ty.count,
                });
            }
            out[n] = src[usize::from(from)];
        }
        Ok(self.value(
            ValueType::new(value.ty.scalar, mask.component_count()),
            out,
        ))
    }

    fn reg_vector(&mut self, value: Value, count: u32) -> CodeGenResult<Value> {
        let x = self.lanes(value)[0];
        Ok(self.value(ValueType::new(value.ty.scalar, count), [x; 4]))
    }

    fn op_add(&mut self, a: Value, b: Value) -> CodeGenResult<Value> {
        let float = f32_op(|x, y| x + y);
        self.map2(a, b, move |s, x, y| match s {
            ScalarType::Float32 => float(s, x, y),
            _ => x.wrapping_add(y),
        })
    }

    fn op_mul(&mut self, a: Value, b: Value) -> CodeGenResult<Value> {
        let float = f32_op(|x, y| x * y);
        self.map2(a, b, move |s, x, y| match s {
            ScalarType::Float32 => float(s, x, y),
            _ => x.wrapping_mul(y),
        })
    }

    fn op_dot(&mut self, a: Value, b: Value) -> CodeGenResult<Value> {
        Self::same_type(a, b)?;
        let (la, lb) = (self.lanes(a), self.lanes(b));
        let sum: f32 = (0..a.ty.count as usize)
            .map(|i| f32::from_bits(la[i]) * f32::from_bits(lb[i]))
            .sum();
        Ok(self.value(ValueType::scalar(ScalarType::Float32), [sum.to_bits(), 0, 0, 0]))
    }

    fn op_rsqrt(&mut self, a: Value) -> CodeGenResult<Value> {
        Ok(self.map1(a, |_, x| (1.0 / f32::from_bits(x).sqrt()).to_bits()))
    }

    fn op_abs(&mut self, a: Value) -> CodeGenResult<Value> {
        Ok(self.map1(a, |s, x| match s {
            ScalarType::Float32 => f32::from_bits(x).abs().to_bits(),
            _ => (x as i32).wrapping_abs() as u32,
        }))
    }

    fn op_neg(&mut self, a: Value) -> CodeGenResult<Value> {
        Ok(self.map1(a, |s, x| match s {
            ScalarType::Float32 => (-f32::from_bits(x)).to_bits(),
            _ => (x as i32).wrapping_neg() as u32,
        }))
    }

    fn op_saturate(&mut self, a: Value) -> CodeGenResult<Value> {
        Ok(self.map1(a, |_, x| f32::from_bits(x).max(0.0).min(1.0).to_bits()))
    }

    fn tex_sample(&mut self, texture: u32, sampler: u32, coord: Value) -> CodeGenResult<Value> {
        if !self.state.resources.contains_key(&texture) {
            return Err(CodeGenError::Undeclared {
                kind: "t",
                index: texture,
            });
        }
        if !self.state.samplers.contains_key(&sampler) {
            return Err(CodeGenError::Undeclared {
                kind: "s",
                index: sampler,
            });
        }
        let coord = self.lanes(coord).map(f32::from_bits);
        self.state.samples.push(SampleCall {
            texture,
            sampler,
            coord,
        });
        let texel = self.state.texels.get(&texture).copied().unwrap_or([0.0; 4]);
        Ok(self.value(
            ValueType::vec4(ScalarType::Float32),
            texel.map(f32::to_bits),
        ))
    }

    fn fn_return(&mut self) -> CodeGenResult<()> {
        self.state.returns += 1;
        Ok(())
    }

    fn finalize(self) -> CodeGenResult<EvalState> {
        Ok(self.state)
    }
}

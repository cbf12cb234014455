//! Shared helpers for `aero-d3d11` integration tests.
#![allow(dead_code)]

pub mod eval;
pub mod wgpu;

use aero_d3d11::{translate, CompileError, CompilerOptions, Diagnostic};
use aero_dxbc::test_utils::build_program;
use aero_dxbc::{ShaderStage, Sm4Program};

use self::eval::{EvalGen, EvalState};

/// Routes translator logs to the test harness. `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn program(stage: ShaderStage, body: &[Vec<u32>]) -> Sm4Program {
    Sm4Program::from_tokens(build_program(stage, body)).expect("test program should parse")
}

/// Evaluates a pixel shader body with `gen`.
pub fn try_eval(
    gen: EvalGen,
    body: &[Vec<u32>],
    options: &CompilerOptions,
) -> Result<(EvalState, Vec<Diagnostic>), CompileError> {
    init_tracing();
    translate(&program(ShaderStage::Pixel, body), gen, options)
}

pub fn eval(gen: EvalGen, body: &[Vec<u32>]) -> (EvalState, Vec<Diagnostic>) {
    try_eval(gen, body, &CompilerOptions::default()).expect("translation should succeed")
}

/// Word offset of instruction `n` of `body` in a program built by [`program`].
pub fn dword_of(body: &[Vec<u32>], n: usize) -> usize {
    Sm4Program::HEADER_WORDS + body[..n].iter().map(Vec::len).sum::<usize>()
}

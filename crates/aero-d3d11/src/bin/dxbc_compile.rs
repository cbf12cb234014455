use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

use aero_d3d11::{compile_program, CompilerOptions};
use aero_dxbc::Sm4Program;
use anyhow::{bail, Context};
use tracing_subscriber::EnvFilter;

fn usage() -> &'static str {
    "\
dxbc_compile: translate a raw SM4/SM5 token stream to SPIR-V

USAGE:
    cargo run -p aero-d3d11 --bin dxbc_compile -- <program.bin> [-o out.spv] [--strict]
        [--entry-point NAME] [--dump]

FLAGS:
    -o PATH              Write the SPIR-V binary to PATH (default: only report)
    --strict             Fail on the first instruction that cannot be translated
    --entry-point NAME   Name of the generated entry point (default: main)
    --no-debug-names     Do not emit OpName for registers and resources
    --dump               Print the decoded instructions before translating
"
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = real_main() {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

fn real_main() -> anyhow::Result<()> {
    let mut input: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut options = CompilerOptions::default();
    let mut dump = false;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print!("{}", usage());
                return Ok(());
            }
            "-o" => {
                let Some(v) = args.next() else {
                    bail!("-o requires a path");
                };
                output = Some(PathBuf::from(v));
            }
            "--entry-point" => {
                let Some(v) = args.next() else {
                    bail!("--entry-point requires a name");
                };
                options.entry_point = v;
            }
            "--strict" => options.strict_coverage = true,
            "--no-debug-names" => options.debug_names = false,
            "--dump" => dump = true,
            _ if arg.starts_with('-') => {
                bail!("unknown option {arg:?}\n\n{}", usage());
            }
            _ => {
                if input.is_some() {
                    bail!("unexpected positional argument {arg:?}\n\n{}", usage());
                }
                input = Some(PathBuf::from(arg));
            }
        }
    }

    let Some(input) = input else {
        bail!("missing input path\n\n{}", usage());
    };

    let bytes = fs::read(&input).with_context(|| format!("failed to read {}", input.display()))?;
    let program = Sm4Program::parse_program_tokens(&bytes)
        .with_context(|| format!("failed to parse {} as a token program", input.display()))?;
    println!(
        "{}_{} ({} dwords)",
        program.stage.short_name(),
        program.model,
        program.tokens.len()
    );

    if dump {
        for inst in program.instructions() {
            match inst {
                Ok(inst) => println!("  {:5}: {inst}", inst.at_dword()),
                Err(err) => {
                    println!("  decode error: {err}");
                    break;
                }
            }
        }
    }

    let compiled = compile_program(&program, &options)
        .with_context(|| format!("failed to translate {}", input.display()))?;
    for diagnostic in &compiled.diagnostics {
        println!("warning: {diagnostic}");
    }

    let shader = &compiled.shader;
    println!(
        "spirv: {} words, {} resource slots{}",
        shader.code().len(),
        shader.slots().len(),
        if compiled.is_partial() { " (partial)" } else { "" }
    );
    for slot in shader.slots() {
        println!("  slot {:4} {:?}", slot.slot, slot.kind);
    }

    if let Some(output) = output {
        fs::write(&output, shader.code().to_bytes())
            .with_context(|| format!("failed to write {}", output.display()))?;
        println!("wrote {}", output.display());
    }
    Ok(())
}

mod args;

use args::Args;

use snuplc::{codegen, lexer, parser, semantic_analysis, tac};

use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Context, Result};

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(target) = args.target.as_deref() {
        if target != "amd64" {
            return Err(anyhow!("unsupported target '{target}'"));
        }
    }

    for input in &args.inputs {
        compile_file(input, &args)?;
    }
    Ok(())
}

fn compile_file(input: &Path, args: &Args) -> Result<()> {
    let file = input.display();
    let source = fs::read_to_string(input).with_context(|| format!("cannot open {file}"))?;

    let tokens = lexer::lex(&source).map_err(|e| anyhow!("{file}:{e}"))?;
    let (module, syms) = parser::parse(&tokens).map_err(|e| anyhow!("{file}:{e}"))?;

    if args.ast {
        println!("{module:#?}");
        return Ok(());
    }

    semantic_analysis::validate(&module, &syms).map_err(|e| anyhow!("{file}:{e}"))?;

    let tac = tac::emit_module(&module, &syms);
    if args.tac {
        println!("{tac:#?}");
        return Ok(());
    }

    let asm = codegen::codegen(&tac, &syms);
    if args.console {
        print!("{asm}");
        return Ok(());
    }

    let asm_file = input.with_extension("s");
    fs::write(&asm_file, asm.to_string())
        .with_context(|| format!("cannot write {}", asm_file.display()))?;

    if args.exe {
        link(input, &asm_file, args)?;
    }
    Ok(())
}

fn link(input: &Path, asm_file: &Path, args: &Args) -> Result<()> {
    let exe = input.with_extension("");
    let mut cmd = Command::new("gcc");
    cmd.arg(asm_file).arg("-o").arg(&exe);
    if let Some(lib_path) = &args.lib_path {
        cmd.arg(format!("-L{lib_path}"));
    }
    cmd.arg("-lsnupl");

    let status = cmd.status().context("failed to run gcc")?;
    if !status.success() {
        return Err(anyhow!("gcc failed for {}", asm_file.display()));
    }
    Ok(())
}

//! Shared plumbing for the minic drivers
//!
//! The compiler and the diagnostic sub-drivers all read the same way:
//! positional input files (`-` for stdin) parsed independently and
//! concatenated into one program, `-o` redirecting stdout into a file,
//! `-q` silencing non-fatal logging. The pipeline helpers here cover
//! the cut points the individual binaries print at.

use anyhow::{Context, Result};
use clap::Args;
use minic_parser::{canonicalize, parse_program, Program};
use minic_semantic::{build_symbol_table, run_all, StatementScope, SymbolTable};
use std::io::Read;
use std::path::PathBuf;

/// Flags and positionals every driver shares
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Input files; use '-' to read from stdin
    #[arg(required = true, value_name = "FILE")]
    pub inputs: Vec<String>,

    /// Write the output to <FILE> (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Suppress non-fatal warnings
    #[arg(short, long)]
    pub quiet: bool,
}

/// Parse the command line, mapping usage errors to exit code 1 and
/// help/version to exit code 0.
pub fn parse_cli<T: clap::Parser>() -> T {
    match T::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let code = i32::from(error.use_stderr());
            let _ = error.print();
            std::process::exit(code);
        }
    }
}

pub fn init_logging(quiet: bool) {
    let level = if quiet { log::LevelFilter::Error } else { log::LevelFilter::Warn };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();
}

fn read_source(input: &str) -> Result<(String, String)> {
    if input == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("failed to read from stdin")?;
        Ok((source, "<stdin>".to_string()))
    } else {
        let source = std::fs::read_to_string(input)
            .with_context(|| format!("failed to read input file '{}'", input))?;
        Ok((source, input.to_string()))
    }
}

/// Parse every input independently and concatenate the top-level
/// function lists in argument order.
pub fn parse_inputs(inputs: &[String]) -> Result<Program> {
    let mut merged: Option<Program> = None;
    for input in inputs {
        let (source, name) = read_source(input)?;
        let program = parse_program(&source, name.as_str())?;
        merged = Some(match merged {
            None => program,
            Some(mut first) => {
                first.functions.extend(program.functions);
                first
            }
        });
    }
    Ok(merged.expect("clap enforces at least one input"))
}

/// Parse, canonicalize and semantically check the inputs.
pub fn analyzed_program(
    inputs: &[String],
) -> Result<(Program, SymbolTable, Vec<StatementScope>)> {
    let mut program = parse_inputs(inputs)?;
    canonicalize(&mut program);
    let (table, contexts) = build_symbol_table(&program);
    run_all(&program, &table, &contexts)?;
    Ok((program, table, contexts))
}

/// The whole pipeline: source files to assembly text.
pub fn compile(inputs: &[String]) -> Result<String> {
    let (program, _, _) = analyzed_program(inputs)?;
    let ir = minic_ir::generate_ir(&program);
    let annotated = minic_ir::annotate_ir(&ir);
    let asm = minic_asm::generate_asm(&ir, &annotated);
    Ok(minic_asm::asm_to_text(&asm))
}

/// Write to the output file, or to stdout when none was given. The
/// file is created only here, after the producing stage succeeded.
pub fn write_output(output: &Option<PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("failed to write output file '{}'", path.display())),
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}

/// Print the error and terminate with exit code 1.
pub fn fail(error: &anyhow::Error) -> ! {
    eprintln!("{:#}", error);
    std::process::exit(1);
}

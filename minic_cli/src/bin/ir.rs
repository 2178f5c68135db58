//! Dump the three-address IR as a fixed-width table.

use anyhow::anyhow;
use clap::Parser;
use minic_cli::{analyzed_program, fail, init_logging, parse_cli, write_output, CommonArgs};
use minic_ir::{function_ir_to_table, generate_ir, ir_to_table};

/// Print the intermediate representation
#[derive(Parser, Debug)]
#[command(name = "minic_ir", version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Limit the output to a single function
    #[arg(short, long, value_name = "NAME")]
    function: Option<String>,
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let (program, _, _) = analyzed_program(&cli.common.inputs)?;
    let ir = generate_ir(&program);
    let table = match &cli.function {
        Some(name) => function_ir_to_table(&ir, name)
            .ok_or_else(|| anyhow!("function '{}' not found.", name))?,
        None => ir_to_table(&ir),
    };
    write_output(&cli.common.output, &table)
}

fn main() {
    let cli: Cli = parse_cli();
    init_logging(cli.common.quiet);
    if let Err(error) = run(&cli) {
        fail(&error);
    }
}

//! Dump the parsed AST as a DOT digraph.

use anyhow::anyhow;
use clap::Parser;
use minic_cli::{fail, init_logging, parse_cli, parse_inputs, write_output, CommonArgs};
use minic_parser::{ast_to_dot, function_to_dot};

/// Print the abstract syntax tree in the DOT format
#[derive(Parser, Debug)]
#[command(name = "minic_ast_to_dot", version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Limit the output to a single function
    #[arg(short, long, value_name = "NAME")]
    function: Option<String>,
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let program = parse_inputs(&cli.common.inputs)?;
    let dot = match &cli.function {
        Some(name) => function_to_dot(&program, name)
            .ok_or_else(|| anyhow!("function '{}' not found.", name))?,
        None => ast_to_dot(&program),
    };
    write_output(&cli.common.output, &dot)
}

fn main() {
    let cli: Cli = parse_cli();
    init_logging(cli.common.quiet);
    if let Err(error) = run(&cli) {
        fail(&error);
    }
}

//! Dump the symbol table, as an indented text tree or as DOT.

use clap::Parser;
use minic_cli::{fail, init_logging, parse_cli, parse_inputs, write_output, CommonArgs};
use minic_parser::canonicalize;
use minic_semantic::{build_symbol_table, symbol_table_to_dot, symbol_table_to_text};

/// Print the symbol table
#[derive(Parser, Debug)]
#[command(name = "minic_symbol_table", version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Output DOT instead of plain text
    #[arg(long)]
    dot: bool,
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut program = parse_inputs(&cli.common.inputs)?;
    canonicalize(&mut program);
    let (table, _) = build_symbol_table(&program);
    let rendered =
        if cli.dot { symbol_table_to_dot(&table) } else { symbol_table_to_text(&table) };
    write_output(&cli.common.output, &rendered)
}

fn main() {
    let cli: Cli = parse_cli();
    init_logging(cli.common.quiet);
    if let Err(error) = run(&cli) {
        fail(&error);
    }
}

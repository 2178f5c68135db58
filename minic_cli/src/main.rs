//! The minic compiler driver: source programs in, x86 assembly out.

use clap::Parser;
use minic_cli::{compile, fail, init_logging, parse_cli, write_output, CommonArgs};

/// Compile source programs to 32-bit x86 assembly (AT&T syntax)
#[derive(Parser, Debug)]
#[command(name = "minic", version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() {
    let cli: Cli = parse_cli();
    init_logging(cli.common.quiet);

    let assembly = match compile(&cli.common.inputs) {
        Ok(assembly) => assembly,
        Err(error) => fail(&error),
    };
    if let Err(error) = write_output(&cli.common.output, &assembly) {
        fail(&error);
    }
}

//! Dump the control-flow graph as a DOT digraph.

use anyhow::anyhow;
use clap::Parser;
use minic_cli::{analyzed_program, fail, init_logging, parse_cli, write_output, CommonArgs};
use minic_ir::{build_cfg, cfg_to_dot, generate_ir, limit_to_function};

/// Print the control-flow graph in the DOT format
#[derive(Parser, Debug)]
#[command(name = "minic_cfg_to_dot", version)]
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
    let cfg = build_cfg(&ir);
    let cfg = match &cli.function {
        Some(name) => limit_to_function(&cfg, &ir, name)
            .ok_or_else(|| anyhow!("function '{}' not found.", name))?,
        None => cfg,
    };
    write_output(&cli.common.output, &cfg_to_dot(&cfg, &ir))
}

fn main() {
    let cli: Cli = parse_cli();
    init_logging(cli.common.quiet);
    if let Err(error) = run(&cli) {
        fail(&error);
    }
}

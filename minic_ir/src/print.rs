//! IR table and CFG DOT printers

use crate::cfg::Cfg;
use crate::ir::{Ir, IrArg, IrRow};
use std::fmt::Write;

const TABLE_RULE: &str =
    "--------------------------------------------------------------------------------\n";

fn arg_to_string(ir: &Ir, arg: &IrArg) -> String {
    match arg {
        IrArg::LitInt(v) => v.to_string(),
        IrArg::LitFloat(v) => format!("{:?}", v),
        IrArg::LitBool(v) => v.to_string(),
        IrArg::LitString(v) => format!("\"{}\"", v),
        IrArg::Row(r) => format!("({})", ir.row(*r).row_no),
        IrArg::Label(l) => format!("L{}", l),
        IrArg::Ident(name) => name.clone(),
        IrArg::ArrayElem { ident, index } => {
            format!("{}[{}]", ident, arg_to_string(ir, index))
        }
        IrArg::FuncLabel(name) => name.clone(),
    }
}

fn row_to_columns(ir: &Ir, row: &IrRow) -> (String, String, String, String) {
    let arg1 = row.arg1.as_ref().map_or(String::new(), |arg| arg_to_string(ir, arg));
    let arg2 = row.arg2.as_ref().map_or(String::new(), |arg| arg_to_string(ir, arg));
    (format!("({})", row.row_no), row.instr.to_string(), arg1, arg2)
}

/// One row as a compact single line, used inside CFG record nodes.
pub fn ir_row_to_string(ir: &Ir, row: &IrRow) -> String {
    let (no, instr, arg1, arg2) = row_to_columns(ir, row);
    let mut line = format!("{} {}", no, instr);
    if !arg1.is_empty() {
        line.push(' ');
        line.push_str(&arg1);
    }
    if !arg2.is_empty() {
        line.push(' ');
        line.push_str(&arg2);
    }
    line
}

fn write_table(out: &mut String, ir: &Ir, rows: impl Iterator<Item = usize>) {
    out.push_str(TABLE_RULE);
    out.push_str("| Intermediate representation (TAC)                                            |\n");
    out.push_str(TABLE_RULE);
    out.push_str("| line no.  | instruction      | arg1                  | arg2                  |\n");
    out.push_str(TABLE_RULE);
    for i in rows {
        let (no, instr, arg1, arg2) = row_to_columns(ir, &ir.rows[i]);
        writeln!(out, "| {:<7}   | {:<16} | {:<21} | {:<21} |", no, instr, arg1, arg2).unwrap();
    }
    out.push_str(TABLE_RULE);
}

/// The fixed-width IR table for the whole program.
pub fn ir_to_table(ir: &Ir) -> String {
    let mut out = String::new();
    write_table(&mut out, ir, 0..ir.len());
    out
}

/// The IR table limited to one function, or `None` if it does not exist.
pub fn function_ir_to_table(ir: &Ir, name: &str) -> Option<String> {
    let range = ir.function_range(name)?;
    let mut out = String::new();
    write_table(&mut out, ir, range);
    Some(out)
}

// ------------------------------------------------------------------- CFG

/// DOT rendering of a CFG: one record node per basic block holding its
/// rows, edges to the successors.
pub fn cfg_to_dot(cfg: &Cfg, ir: &Ir) -> String {
    let mut out = String::from("digraph A {\n");
    for (i, block) in cfg.blocks.iter().enumerate() {
        writeln!(out, "B{} [shape=record label=\"{{", i).unwrap();
        let rows: Vec<usize> = block.rows().collect();
        for (n, &row) in rows.iter().enumerate() {
            let line = escape_record(&ir_row_to_string(ir, &ir.rows[row]));
            if n + 1 < rows.len() {
                writeln!(out, "{{{}}}|", line).unwrap();
            } else {
                writeln!(out, "{{{}}}", line).unwrap();
            }
        }
        out.push_str("}\n\"];\n");
        if let Some(left) = block.child_left {
            writeln!(out, "B{} -> B{};", i, left.0).unwrap();
        }
        if let Some(right) = block.child_right {
            writeln!(out, "B{} -> B{};", i, right.0).unwrap();
        }
    }
    out.push_str("}\n");
    out
}

fn escape_record(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '{' | '}' | '|' | '<' | '>' | '"' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

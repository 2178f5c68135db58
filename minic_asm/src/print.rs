//! AT&T text emission

use crate::asm::*;
use std::fmt::Write;

/// Render the program as a GAS/AT&T `.s` file: the data section first,
/// then the text section.
pub fn asm_to_text(asm: &Asm) -> String {
    let mut out = String::new();

    out.push_str(".data\n");
    for declaration in &asm.data {
        writeln!(out, "{}:", declaration.label).unwrap();
        match &declaration.value {
            AsmDeclValue::String(value) => writeln!(out, "\t.string \"{}\"", value).unwrap(),
            AsmDeclValue::Float(value) => writeln!(out, "\t.float {:?}", value).unwrap(),
        }
    }

    out.push_str(".text\n");
    for function in &asm.text {
        if function.is_global {
            writeln!(out, ".globl {}", function.label).unwrap();
        }
        writeln!(out, "{}:", function.label).unwrap();
        for line in &function.lines {
            write_line(&mut out, line);
        }
    }
    out
}

fn write_line(out: &mut String, line: &AsmLine) {
    match line {
        AsmLine::Label(n) => writeln!(out, ".L{}:", n).unwrap(),
        // The x87 compare/pop pair carries its operands implicitly.
        AsmLine::Instr { op: AsmOp::Fcomip, .. } => {
            writeln!(out, "\tfcomip %st(1), %st").unwrap()
        }
        AsmLine::Instr { op: AsmOp::FstpSt0, .. } => writeln!(out, "\tfstp %st(0)").unwrap(),
        AsmLine::Instr { op, first: None, .. } => writeln!(out, "\t{}", op).unwrap(),
        AsmLine::Instr { op, first: Some(first), second: None } => {
            writeln!(out, "\t{} {}", op, first).unwrap()
        }
        AsmLine::Instr { op, first: Some(first), second: Some(second) } => {
            writeln!(out, "\t{} {}, {}", op, first, second).unwrap()
        }
    }
}

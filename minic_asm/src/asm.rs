//! Assembly data structures
//!
//! A program is one data section (string and float literals) and one
//! text section (one labeled instruction list per function). Operands
//! cover registers, immediates, base-pointer offsets, computed
//! element addresses and data-section references.

use std::fmt;

/// Registers the emitter works with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsmRegister {
    Eax,
    Ebx,
    Ecx,
    Esp,
    Ebp,
    Al,
}

impl fmt::Display for AsmRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmRegister::Eax => write!(f, "%eax"),
            AsmRegister::Ebx => write!(f, "%ebx"),
            AsmRegister::Ecx => write!(f, "%ecx"),
            AsmRegister::Esp => write!(f, "%esp"),
            AsmRegister::Ebp => write!(f, "%ebp"),
            AsmRegister::Al => write!(f, "%al"),
        }
    }
}

/// Instruction operands
#[derive(Debug, Clone, PartialEq)]
pub enum AsmOperand {
    /// `$n`
    Literal(i64),
    Register(AsmRegister),
    /// `off(%reg)`
    Offset(i32, AsmRegister),
    /// `base(%reg, %ebx, scale)` for runtime-indexed array elements
    ComputedOffset { base: i32, reg: AsmRegister, scale: i32 },
    /// `$label`: the address of a data-section entry
    DataAddress(String),
    /// `label`: a data-section entry as a memory operand
    Data(String),
    /// A callable symbol
    Function(String),
    /// `.L<n>`: a jump target
    LocalLabel(u32),
}

impl fmt::Display for AsmOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmOperand::Literal(v) => write!(f, "${}", v),
            AsmOperand::Register(r) => write!(f, "{}", r),
            AsmOperand::Offset(0, r) => write!(f, "({})", r),
            AsmOperand::Offset(off, r) => write!(f, "{}({})", off, r),
            AsmOperand::ComputedOffset { base: 0, reg, scale } => {
                write!(f, "({}, %ebx, {})", reg, scale)
            }
            AsmOperand::ComputedOffset { base, reg, scale } => {
                write!(f, "{}({}, %ebx, {})", base, reg, scale)
            }
            AsmOperand::DataAddress(label) => write!(f, "${}", label),
            AsmOperand::Data(label) => write!(f, "{}", label),
            AsmOperand::Function(name) => write!(f, "{}", name),
            AsmOperand::LocalLabel(n) => write!(f, ".L{}", n),
        }
    }
}

/// Opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsmOp {
    Movl,
    Movzbl,
    Leal,
    Cmpl,
    Pushl,
    Leave,
    Ret,
    Addl,
    Subl,
    Imull,
    Cltd,
    Idivl,
    Andl,
    Orl,
    Xorl,
    Negl,
    Sete,
    Setne,
    Setl,
    Setg,
    Setle,
    Setge,
    Seta,
    Setae,
    Setb,
    Setbe,
    Call,
    Jmp,
    Je,
    Finit,
    Flds,
    Fstps,
    /// `fstp %st(0)`: drop the x87 top
    FstpSt0,
    Fadds,
    Fsubs,
    Fmuls,
    Fdivs,
    Fchs,
    /// `fcomip %st(1), %st`: compare and pop
    Fcomip,
}

impl fmt::Display for AsmOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AsmOp::Movl => "movl",
            AsmOp::Movzbl => "movzbl",
            AsmOp::Leal => "leal",
            AsmOp::Cmpl => "cmpl",
            AsmOp::Pushl => "pushl",
            AsmOp::Leave => "leave",
            AsmOp::Ret => "ret",
            AsmOp::Addl => "addl",
            AsmOp::Subl => "subl",
            AsmOp::Imull => "imull",
            AsmOp::Cltd => "cltd",
            AsmOp::Idivl => "idivl",
            AsmOp::Andl => "andl",
            AsmOp::Orl => "orl",
            AsmOp::Xorl => "xorl",
            AsmOp::Negl => "negl",
            AsmOp::Sete => "sete",
            AsmOp::Setne => "setne",
            AsmOp::Setl => "setl",
            AsmOp::Setg => "setg",
            AsmOp::Setle => "setle",
            AsmOp::Setge => "setge",
            AsmOp::Seta => "seta",
            AsmOp::Setae => "setae",
            AsmOp::Setb => "setb",
            AsmOp::Setbe => "setbe",
            AsmOp::Call => "call",
            AsmOp::Jmp => "jmp",
            AsmOp::Je => "je",
            AsmOp::Finit => "finit",
            AsmOp::Flds => "flds",
            AsmOp::Fstps => "fstps",
            AsmOp::FstpSt0 => "fstp",
            AsmOp::Fadds => "fadds",
            AsmOp::Fsubs => "fsubs",
            AsmOp::Fmuls => "fmuls",
            AsmOp::Fdivs => "fdivs",
            AsmOp::Fchs => "fchs",
            AsmOp::Fcomip => "fcomip",
        };
        write!(f, "{}", s)
    }
}

/// One line of a function body
#[derive(Debug, Clone, PartialEq)]
pub enum AsmLine {
    /// `.L<n>:`
    Label(u32),
    Instr { op: AsmOp, first: Option<AsmOperand>, second: Option<AsmOperand> },
}

impl AsmLine {
    pub fn nullary(op: AsmOp) -> Self {
        AsmLine::Instr { op, first: None, second: None }
    }

    pub fn unary(op: AsmOp, operand: AsmOperand) -> Self {
        AsmLine::Instr { op, first: Some(operand), second: None }
    }

    pub fn binary(op: AsmOp, first: AsmOperand, second: AsmOperand) -> Self {
        AsmLine::Instr { op, first: Some(first), second: Some(second) }
    }
}

/// A labeled function body
#[derive(Debug, Clone, PartialEq)]
pub struct AsmFunction {
    pub label: String,
    /// Only `main` is externally visible.
    pub is_global: bool,
    pub lines: Vec<AsmLine>,
}

/// Kinds of data-section entries
#[derive(Debug, Clone, PartialEq)]
pub enum AsmDeclValue {
    /// `.string "..."`
    String(String),
    /// `.float ...`
    Float(f64),
}

/// One labeled data-section entry
#[derive(Debug, Clone, PartialEq)]
pub struct AsmDeclaration {
    pub label: String,
    pub value: AsmDeclValue,
}

/// The whole assembly program
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Asm {
    pub data: Vec<AsmDeclaration>,
    pub text: Vec<AsmFunction>,
}

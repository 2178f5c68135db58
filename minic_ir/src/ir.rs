//! Three-address IR data structures
//!
//! The IR is a single flat row sequence for the whole program; rows
//! reference each other through indices into that sequence (a row
//! reference names the temporary the referenced row produces). Row
//! numbers are assigned after generation and only matter for printing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a row in the IR sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowRef(pub usize);

/// IR instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IrInstr {
    Assign,
    Label,
    FuncLabel,
    Jump,
    Jumpfalse,
    Call,
    Push,
    Pop,
    Plus,
    Minus,
    Multiply,
    Divide,
    Equals,
    NotEquals,
    Smaller,
    Greater,
    SmallerEq,
    GreaterEq,
    And,
    Or,
    Not,
    Neg,
    Return,
    Array,
}

impl IrInstr {
    /// Whether a row with this instruction produces a named temporary
    /// (and therefore receives a row number).
    pub fn produces_value(self) -> bool {
        matches!(
            self,
            IrInstr::Plus
                | IrInstr::Minus
                | IrInstr::Multiply
                | IrInstr::Divide
                | IrInstr::Equals
                | IrInstr::NotEquals
                | IrInstr::Smaller
                | IrInstr::Greater
                | IrInstr::SmallerEq
                | IrInstr::GreaterEq
                | IrInstr::And
                | IrInstr::Or
                | IrInstr::Not
                | IrInstr::Neg
                | IrInstr::Call
                | IrInstr::Pop
        )
    }
}

impl fmt::Display for IrInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IrInstr::Assign => "assign",
            IrInstr::Label => "label",
            IrInstr::FuncLabel => "func_label",
            IrInstr::Jump => "jump",
            IrInstr::Jumpfalse => "jumpfalse",
            IrInstr::Call => "call",
            IrInstr::Push => "push",
            IrInstr::Pop => "pop",
            IrInstr::Plus => "plus",
            IrInstr::Minus => "minus",
            IrInstr::Multiply => "multiply",
            IrInstr::Divide => "divide",
            IrInstr::Equals => "equals",
            IrInstr::NotEquals => "not equal",
            IrInstr::Smaller => "smaller",
            IrInstr::Greater => "greater",
            IrInstr::SmallerEq => "smaller eq",
            IrInstr::GreaterEq => "greater eq",
            IrInstr::And => "and",
            IrInstr::Or => "or",
            IrInstr::Not => "not",
            IrInstr::Neg => "neg",
            IrInstr::Return => "return",
            IrInstr::Array => "array",
        };
        write!(f, "{}", s)
    }
}

/// Primitive kind of a row or operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IrTypeKind {
    Int,
    Float,
    Bool,
    String,
    Typeless,
}

/// Row type: primitive kind plus declared element count for arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrRowType {
    pub kind: IrTypeKind,
    /// -1 for non-arrays.
    pub array_size: i64,
}

impl IrRowType {
    pub fn new(kind: IrTypeKind, array_size: i64) -> Self {
        Self { kind, array_size }
    }

    pub fn scalar(kind: IrTypeKind) -> Self {
        Self::new(kind, -1)
    }

    pub fn typeless() -> Self {
        Self::scalar(IrTypeKind::Typeless)
    }
}

/// IR operands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IrArg {
    LitInt(i64),
    LitFloat(f64),
    LitBool(bool),
    LitString(String),
    /// The temporary produced by another row.
    Row(RowRef),
    Label(u32),
    Ident(String),
    ArrayElem { ident: String, index: Box<IrArg> },
    FuncLabel(String),
}

impl IrArg {
    /// The identifier a storage operand refers to, if any.
    pub fn ident(&self) -> Option<&str> {
        match self {
            IrArg::Ident(name) => Some(name),
            IrArg::ArrayElem { ident, .. } => Some(ident),
            _ => None,
        }
    }
}

/// One three-address row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrRow {
    /// Names the temporary this row produces; assigned post-hoc, 0 for
    /// rows that produce none.
    pub row_no: u32,
    pub instr: IrInstr,
    pub arg1: Option<IrArg>,
    pub arg2: Option<IrArg>,
    pub ty: IrRowType,
}

/// The IR of a whole program
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Ir {
    pub rows: Vec<IrRow>,
}

impl Ir {
    pub fn row(&self, r: RowRef) -> &IrRow {
        &self.rows[r.0]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the `FUNC_LABEL` row of the named function.
    pub fn function_start(&self, name: &str) -> Option<usize> {
        self.rows.iter().position(|row| {
            row.instr == IrInstr::FuncLabel
                && matches!(&row.arg1, Some(IrArg::FuncLabel(label)) if label == name)
        })
    }

    /// Row index range `[start, end)` of the named function.
    pub fn function_range(&self, name: &str) -> Option<std::ops::Range<usize>> {
        let start = self.function_start(name)?;
        let end = self.rows[start + 1..]
            .iter()
            .position(|row| row.instr == IrInstr::FuncLabel)
            .map_or(self.rows.len(), |offset| start + 1 + offset);
        Some(start..end)
    }

    /// Index of the enclosing function's `FUNC_LABEL`, scanning backward.
    pub fn enclosing_function(&self, at: usize) -> usize {
        let mut i = at;
        loop {
            if self.rows[i].instr == IrInstr::FuncLabel {
                return i;
            }
            i = i.checked_sub(1).expect("row outside any function");
        }
    }

    /// Assign strictly increasing row numbers to the value-producing
    /// rows; everything else keeps 0.
    pub(crate) fn number_rows(&mut self) {
        let mut next = 0;
        for row in &mut self.rows {
            if row.instr.produces_value() {
                row.row_no = next;
                next += 1;
            }
        }
    }
}

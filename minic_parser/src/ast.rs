//! Abstract syntax tree definitions for the minic source language
//!
//! Every node carries the source region it was parsed from; the location
//! is the only data later stages use to format diagnostics. Nodes are
//! exclusively owned by their parent, the root by the driver.

use minic_common::SourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An identifier together with where it was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    pub loc: SourceLocation,
}

impl Identifier {
    pub fn new(name: impl Into<String>, loc: SourceLocation) -> Self {
        Self { name: name.into(), loc }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Types a variable or array element can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Int,
    Float,
    Bool,
    String,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Bool => write!(f, "bool"),
            Type::String => write!(f, "string"),
        }
    }
}

/// Return types of a function definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionType {
    Int,
    Float,
    Bool,
    String,
    Void,
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionType::Int => write!(f, "int"),
            FunctionType::Float => write!(f, "float"),
            FunctionType::Bool => write!(f, "bool"),
            FunctionType::String => write!(f, "string"),
            FunctionType::Void => write!(f, "void"),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Smaller,
    Greater,
    SmallerEq,
    GreaterEq,
    Conj,
    Disj,
    Equal,
    NotEqual,
}

impl BinaryOp {
    /// Comparisons and logical connectives produce a bool regardless of
    /// their operand type.
    pub fn produces_bool(self) -> bool {
        !matches!(self, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Smaller => "<",
            BinaryOp::Greater => ">",
            BinaryOp::SmallerEq => "<=",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::Conj => "&&",
            BinaryOp::Disj => "||",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
        };
        write!(f, "{}", s)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Minus,
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Minus => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
        }
    }
}

/// Literal values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Payload bytes with the quotes already stripped; escape sequences
    /// are not interpreted.
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Float(v) => write!(f, "{:?}", v),
            Literal::Bool(v) => write!(f, "{}", v),
            Literal::Str(v) => write!(f, "\"{}\"", v),
        }
    }
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Literal {
        literal: Literal,
        loc: SourceLocation,
    },
    BinaryOp {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
        loc: SourceLocation,
    },
    Parenthesized {
        expression: Box<Expression>,
        loc: SourceLocation,
    },
    UnaryOp {
        op: UnaryOp,
        child: Box<Expression>,
        loc: SourceLocation,
    },
    Variable {
        ident: Identifier,
        loc: SourceLocation,
    },
    ArrayElement {
        ident: Identifier,
        index: Box<Expression>,
        loc: SourceLocation,
    },
    FunctionCall {
        ident: Identifier,
        arguments: Vec<Expression>,
        loc: SourceLocation,
    },
}

impl Expression {
    pub fn loc(&self) -> &SourceLocation {
        match self {
            Expression::Literal { loc, .. }
            | Expression::BinaryOp { loc, .. }
            | Expression::Parenthesized { loc, .. }
            | Expression::UnaryOp { loc, .. }
            | Expression::Variable { loc, .. }
            | Expression::ArrayElement { loc, .. }
            | Expression::FunctionCall { loc, .. } => loc,
        }
    }

    /// The expression with any surrounding parentheses removed.
    pub fn unparenthesized(&self) -> &Expression {
        let mut expr = self;
        while let Expression::Parenthesized { expression, .. } = expr {
            expr = expression;
        }
        expr
    }
}

/// Variable and array declarations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Declaration {
    Variable {
        ty: Type,
        ident: Identifier,
        loc: SourceLocation,
    },
    Array {
        ty: Type,
        /// Strictly positive, known at parse time.
        size: i64,
        ident: Identifier,
        loc: SourceLocation,
    },
}

impl Declaration {
    pub fn ident(&self) -> &Identifier {
        match self {
            Declaration::Variable { ident, .. } | Declaration::Array { ident, .. } => ident,
        }
    }

    pub fn ty(&self) -> Type {
        match self {
            Declaration::Variable { ty, .. } | Declaration::Array { ty, .. } => *ty,
        }
    }

    pub fn loc(&self) -> &SourceLocation {
        match self {
            Declaration::Variable { loc, .. } | Declaration::Array { loc, .. } => loc,
        }
    }

    /// Declared element count, or -1 for non-arrays.
    pub fn array_size(&self) -> i64 {
        match self {
            Declaration::Variable { .. } => -1,
            Declaration::Array { size, .. } => *size,
        }
    }
}

/// Assignments to a variable or an array element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Assignment {
    Variable {
        ident: Identifier,
        value: Expression,
        loc: SourceLocation,
    },
    Array {
        ident: Identifier,
        index: Expression,
        value: Expression,
        loc: SourceLocation,
    },
}

impl Assignment {
    pub fn ident(&self) -> &Identifier {
        match self {
            Assignment::Variable { ident, .. } | Assignment::Array { ident, .. } => ident,
        }
    }

    pub fn value(&self) -> &Expression {
        match self {
            Assignment::Variable { value, .. } | Assignment::Array { value, .. } => value,
        }
    }

    pub fn loc(&self) -> &SourceLocation {
        match self {
            Assignment::Variable { loc, .. } | Assignment::Array { loc, .. } => loc,
        }
    }
}

/// Statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    If {
        condition: Expression,
        on_true: Box<Statement>,
        loc: SourceLocation,
    },
    IfElse {
        condition: Expression,
        on_true: Box<Statement>,
        on_false: Box<Statement>,
        loc: SourceLocation,
    },
    While {
        condition: Expression,
        body: Box<Statement>,
        loc: SourceLocation,
    },
    Expression(Expression),
    Declaration(Declaration),
    Assignment(Assignment),
    Return {
        value: Option<Expression>,
        loc: SourceLocation,
    },
    Compound(CompoundStatement),
}

impl Statement {
    pub fn loc(&self) -> &SourceLocation {
        match self {
            Statement::If { loc, .. }
            | Statement::IfElse { loc, .. }
            | Statement::While { loc, .. }
            | Statement::Return { loc, .. } => loc,
            Statement::Expression(e) => e.loc(),
            Statement::Declaration(d) => d.loc(),
            Statement::Assignment(a) => a.loc(),
            Statement::Compound(c) => &c.loc,
        }
    }
}

/// An ordered, possibly empty statement list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundStatement {
    pub statements: Vec<Statement>,
    pub loc: SourceLocation,
}

/// A function definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub return_type: FunctionType,
    pub ident: Identifier,
    pub parameters: Vec<Declaration>,
    pub body: CompoundStatement,
    pub loc: SourceLocation,
}

/// The root node: an ordered list of function definitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub functions: Vec<FunctionDefinition>,
    pub loc: SourceLocation,
}

impl Program {
    pub fn function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.iter().find(|f| f.ident.name == name)
    }
}

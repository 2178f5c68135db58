//! Intermediate representation for the minic compiler
//!
//! Features:
//! - Three-address IR rows with typed operands
//! - IR generation from the canonicalized AST
//! - Control-flow graph construction over the IR
//! - Stack-frame annotation (sizes and offsets relative to the base
//!   pointer)
//! - IR table and CFG DOT printers

pub mod cfg;
pub mod gen;
pub mod ir;
pub mod print;
pub mod stack;

pub use cfg::*;
pub use gen::*;
pub use ir::*;
pub use print::*;
pub use stack::*;

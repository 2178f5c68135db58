//! Semantic analysis for the minic compiler
//!
//! Features:
//! - Symbol table: a tree of scopes with shadowing-aware upward lookup
//! - The semantic check bank run over AST and symbol table
//! - Text and DOT renderings of the symbol table

pub mod checks;
pub mod print;
pub mod symbol_table;

pub use checks::*;
pub use print::*;
pub use symbol_table::*;

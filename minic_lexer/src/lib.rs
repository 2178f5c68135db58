//! Lexical analysis for the minic compiler
//!
//! Turns source text into a token stream with 1-based source positions.
//! Comments and whitespace are skipped; string literals keep their raw
//! bytes with the surrounding quotes stripped.

pub mod lexer;
pub mod token;

pub use lexer::*;
pub use token::*;

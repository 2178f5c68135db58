//! Token definitions for the minic source language

use minic_common::SourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token types of the source language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    // Literals
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),

    // Identifiers
    Identifier(String),

    // Keywords
    KeywordBool,
    KeywordFloat,
    KeywordInt,
    KeywordString,
    KeywordVoid,
    KeywordIf,
    KeywordElse,
    KeywordWhile,
    KeywordReturn,
    KeywordTrue,
    KeywordFalse,

    // Operators
    Plus,         // +
    Minus,        // -
    Asterisk,     // *
    Slash,        // /
    Smaller,      // <
    Greater,      // >
    SmallerEq,    // <=
    GreaterEq,    // >=
    And,          // &&
    Or,           // ||
    Equal,        // ==
    NotEqual,     // !=
    Assign,       // =
    Not,          // !

    // Delimiters
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]
    LeftBrace,    // {
    RightBrace,   // }
    Comma,        // ,
    Semicolon,    // ;

    EndOfFile,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::IntLiteral(n) => write!(f, "{}", n),
            TokenKind::FloatLiteral(n) => write!(f, "{}", n),
            TokenKind::StringLiteral(s) => write!(f, "\"{}\"", s),
            TokenKind::Identifier(name) => write!(f, "{}", name),
            TokenKind::KeywordBool => write!(f, "bool"),
            TokenKind::KeywordFloat => write!(f, "float"),
            TokenKind::KeywordInt => write!(f, "int"),
            TokenKind::KeywordString => write!(f, "string"),
            TokenKind::KeywordVoid => write!(f, "void"),
            TokenKind::KeywordIf => write!(f, "if"),
            TokenKind::KeywordElse => write!(f, "else"),
            TokenKind::KeywordWhile => write!(f, "while"),
            TokenKind::KeywordReturn => write!(f, "return"),
            TokenKind::KeywordTrue => write!(f, "true"),
            TokenKind::KeywordFalse => write!(f, "false"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Asterisk => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Smaller => write!(f, "<"),
            TokenKind::Greater => write!(f, ">"),
            TokenKind::SmallerEq => write!(f, "<="),
            TokenKind::GreaterEq => write!(f, ">="),
            TokenKind::And => write!(f, "&&"),
            TokenKind::Or => write!(f, "||"),
            TokenKind::Equal => write!(f, "=="),
            TokenKind::NotEqual => write!(f, "!="),
            TokenKind::Assign => write!(f, "="),
            TokenKind::Not => write!(f, "!"),
            TokenKind::LeftParen => write!(f, "("),
            TokenKind::RightParen => write!(f, ")"),
            TokenKind::LeftBracket => write!(f, "["),
            TokenKind::RightBracket => write!(f, "]"),
            TokenKind::LeftBrace => write!(f, "{{"),
            TokenKind::RightBrace => write!(f, "}}"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::EndOfFile => write!(f, "end of file"),
        }
    }
}

/// A token together with the source region it was scanned from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, loc: SourceLocation) -> Self {
        Self { kind, loc }
    }
}

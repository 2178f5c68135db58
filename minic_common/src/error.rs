//! Error handling utilities for the minic compiler

use thiserror::Error;

/// The main error type for the minic compiler.
///
/// Lex, parse and semantic errors carry a pre-formatted
/// `file:line:col: message` diagnostic; internal errors indicate a broken
/// invariant and are never caught on the way out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MinicError {
    #[error("{message}")]
    Input { message: String },

    #[error("{message}")]
    Lex { message: String },

    #[error("{message}")]
    Parse { message: String },

    #[error("{message}")]
    Semantic { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Result type alias for minic compiler operations
pub type MinicResult<T> = Result<T, MinicError>;

impl MinicError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input { message: message.into() }
    }

    pub fn lex(message: impl Into<String>) -> Self {
        Self::Lex { message: message.into() }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse { message: message.into() }
    }

    pub fn semantic(message: impl Into<String>) -> Self {
        Self::Semantic { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// The diagnostic text as shown to the user.
    pub fn message(&self) -> &str {
        match self {
            MinicError::Input { message }
            | MinicError::Lex { message }
            | MinicError::Parse { message }
            | MinicError::Semantic { message }
            | MinicError::Internal { message } => message,
        }
    }
}

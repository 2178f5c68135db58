//! Source location tracking for the minic compiler

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A region of source text, carried by every AST node.
///
/// Lines and columns are 1-based. The filename is shared between all
/// locations of one translation unit; diagnostics are formatted from the
/// start position only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub file: Arc<str>,
}

impl SourceLocation {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32, file: Arc<str>) -> Self {
        Self { start_line, start_col, end_line, end_col, file }
    }

    /// A location that does not point into user-written source, e.g. for
    /// injected built-in declarations.
    pub fn synthetic(file: Arc<str>) -> Self {
        Self::new(0, 0, 0, 0, file)
    }

    /// Smallest location covering both `self` and `other`.
    pub fn merge(&self, other: &SourceLocation) -> SourceLocation {
        let (start_line, start_col) =
            if (self.start_line, self.start_col) <= (other.start_line, other.start_col) {
                (self.start_line, self.start_col)
            } else {
                (other.start_line, other.start_col)
            };
        let (end_line, end_col) = if (self.end_line, self.end_col) >= (other.end_line, other.end_col) {
            (self.end_line, self.end_col)
        } else {
            (other.end_line, other.end_col)
        };
        SourceLocation::new(start_line, start_col, end_line, end_col, Arc::clone(&self.file))
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.start_line, self.start_col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(sl: u32, sc: u32, el: u32, ec: u32) -> SourceLocation {
        SourceLocation::new(sl, sc, el, ec, "test.mc".into())
    }

    #[test]
    fn display_uses_start_position() {
        assert_eq!(loc(3, 14, 3, 20).to_string(), "test.mc:3:14");
    }

    #[test]
    fn merge_covers_both_spans() {
        let merged = loc(2, 5, 2, 9).merge(&loc(1, 7, 4, 1));
        assert_eq!((merged.start_line, merged.start_col), (1, 7));
        assert_eq!((merged.end_line, merged.end_col), (4, 1));
    }
}

//! Editor-side positions and ranges.
//!
//! The compiler counts lines and columns from 1; editors count from 0.
//! Conversion saturates so a malformed `0` coordinate lands on the first
//! line or column instead of wrapping.

use serde::{Deserialize, Serialize};

use crate::model::SourceRange;

/// A zero-based (line, character) position in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Position { line, character }
    }

    /// The 1-based (line, column) pair the compiler expects.
    pub fn to_compiler(self) -> (u32, u32) {
        (self.line + 1, self.character + 1)
    }
}

/// A zero-based, end-exclusive range in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Range { start, end }
    }

    /// Whether the two ranges share at least one position. Touching ranges
    /// count as overlapping so a cursor placed right after a span still
    /// finds it.
    pub fn overlaps(&self, other: &Range) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl From<SourceRange> for Range {
    fn from(span: SourceRange) -> Self {
        Range {
            start: Position::new(
                span.start_line.saturating_sub(1),
                span.start_col.saturating_sub(1),
            ),
            end: Position::new(
                span.end_line.saturating_sub(1),
                span.end_col.saturating_sub(1),
            ),
        }
    }
}

use crate::level::LintLevel;
use crate::lint::LintDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single finding produced by a checker, after level resolution.
#[derive(Debug, Clone)]
#[must_use]
pub struct Diagnostic {
    pub lint: &'static LintDescriptor,
    pub level: LintLevel,
    pub file: Option<String>,
    /// Function whose body produced the finding.
    pub function: Option<String>,
    pub span: Span,
    pub message: String,
    /// Analysis path the finding was first observed on.
    pub path: u32,
}

/// Span in an analyzed source file (1-based row/column positions).
///
/// A zeroed span means the front-end did not supply a location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// Single position in an analyzed source file (1-based row/column).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl Span {
    /// A span covering `[start, end)` on a single line.
    #[must_use]
    pub fn on_line(row: usize, start_column: usize, end_column: usize) -> Self {
        Self {
            start: Position {
                row,
                column: start_column,
            },
            end: Position {
                row,
                column: end_column,
            },
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.start.row == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start.row, self.start.column)
    }
}

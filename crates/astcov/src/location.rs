//! Source locations
//!
//! Positions use 1-based lines and 0-based columns, the convention the
//! reference runtime uses when it reports branch coverage.

use crate::range::ByteRange;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A line/column position in a source buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// 1-based line number
    pub line: u32,
    /// 0-based column
    pub column: u32,
}

impl Position {
    /// Create a new position
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A character range together with its line/column endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    /// Character offsets
    pub range: ByteRange,
    /// Position of `range.start`
    pub start: Position,
    /// Position of `range.end`
    pub end: Position,
}

impl SourceSpan {
    /// First line of the span
    #[must_use]
    pub const fn first_line(&self) -> u32 {
        self.start.line
    }

    /// Last line of the span
    #[must_use]
    pub const fn last_line(&self) -> u32 {
        self.end.line
    }

    /// `[first_line, first_column, last_line, last_column]`
    #[must_use]
    pub const fn to_tuple(&self) -> [u32; 4] {
        [
            self.start.line,
            self.start.column,
            self.end.line,
            self.end.column,
        ]
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line, self.start.column, self.end.line, self.end.column
        )
    }
}

/// Location of a raw node
///
/// `expression` covers the whole construct. `selector` tells a call's dispatch
/// apart from its receiver, which shares the same start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// The whole expression
    pub expression: SourceSpan,
    /// Method name of a call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<SourceSpan>,
}

impl Location {
    /// Location with only an expression span
    #[must_use]
    pub const fn new(expression: SourceSpan) -> Self {
        Self {
            expression,
            selector: None,
        }
    }

    /// Set the selector span
    #[must_use]
    pub const fn with_selector(mut self, selector: SourceSpan) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Character range of the expression
    #[must_use]
    pub const fn range(&self) -> ByteRange {
        self.expression.range
    }
}

/// Maps character offsets of one source buffer to line/column positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    /// Offset of the first character of every line
    line_starts: Vec<u32>,
    /// Total number of characters
    len: u32,
}

impl LineIndex {
    /// Index the lines of `text`
    ///
    /// Offsets count characters, not bytes.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let mut len = 0u32;
        for ch in text.chars() {
            len += 1;
            if ch == '\n' {
                line_starts.push(len);
            }
        }
        Self { line_starts, len }
    }

    /// Number of lines (a trailing newline opens an empty last line)
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Total character count
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.len
    }

    /// True for an empty buffer
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Position of a character offset; offsets past the end clamp to the end
    #[must_use]
    pub fn position(&self, offset: u32) -> Position {
        let offset = offset.min(self.len);
        let line_idx = self.line_starts.partition_point(|&s| s <= offset) - 1;
        Position {
            line: line_idx as u32 + 1,
            column: offset - self.line_starts[line_idx],
        }
    }

    /// Offset of a position, if it lies on its line
    ///
    /// A line's last column is its newline; on the last line it is the end
    /// of the buffer.
    #[must_use]
    pub fn offset(&self, position: Position) -> Option<u32> {
        let idx = position.line.checked_sub(1)? as usize;
        let start = *self.line_starts.get(idx)?;
        let offset = start.checked_add(position.column)?;
        let within = match self.line_starts.get(idx + 1) {
            Some(&next) => offset < next,
            None => offset <= self.len,
        };
        within.then_some(offset)
    }

    /// Span for a character range
    #[must_use]
    pub fn span(&self, range: ByteRange) -> SourceSpan {
        SourceSpan {
            range,
            start: self.position(range.start),
            end: self.position(range.end),
        }
    }
}

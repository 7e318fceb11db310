//! Source-anchored fixtures
//!
//! Builds raw nodes and hit tables by locating snippets in a source text, so
//! trees can be assembled in tests without a parser. Lookups panic on a
//! missing snippet, so the module is only built for tests and behind the
//! `fixture` feature.
//!
//! ```ignore
//! let fx = SourceFixture::new("123 && 45");
//! let tree = fx.node("and", "123 && 45")
//!     .child(fx.node("int", "123"))
//!     .child(fx.node("int", "45"));
//! let hits = fx.hits().at("123 && 45", 1).at("123", 1).at("45", 1).build();
//! ```

#![allow(clippy::panic)]

use crate::hits::HitTable;
use crate::location::{LineIndex, Location, SourceSpan};
use crate::range::ByteRange;
use crate::raw::RawNode;

/// A source text with snippet lookup
#[derive(Debug, Clone)]
pub struct SourceFixture {
    text: String,
    index: LineIndex,
}

impl SourceFixture {
    /// Wrap a source text
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let index = LineIndex::new(&text);
        Self { text, index }
    }

    /// The source text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The line index of the text
    #[must_use]
    pub fn line_index(&self) -> &LineIndex {
        &self.index
    }

    /// Span of the `n`th (0-based) occurrence of `needle`
    #[must_use]
    pub fn find_nth(&self, needle: &str, n: usize) -> Option<SourceSpan> {
        let (byte, _) = self.text.match_indices(needle).nth(n)?;
        let start = self.text[..byte].chars().count() as u32;
        let end = start + needle.chars().count() as u32;
        Some(self.index.span(ByteRange { start, end }))
    }

    /// Span of the first occurrence of `needle`
    ///
    /// # Panics
    ///
    /// Panics if `needle` does not occur in the text.
    #[must_use]
    pub fn span(&self, needle: &str) -> SourceSpan {
        self.span_nth(needle, 0)
    }

    /// Span of the `n`th occurrence of `needle`
    ///
    /// # Panics
    ///
    /// Panics if there are fewer than `n + 1` occurrences.
    #[must_use]
    pub fn span_nth(&self, needle: &str, n: usize) -> SourceSpan {
        self.find_nth(needle, n)
            .unwrap_or_else(|| panic!("occurrence {n} of {needle:?} not found in fixture"))
    }

    /// Span covering the first occurrence of `from` through the end of the
    /// first subsequent occurrence of `to`
    ///
    /// # Panics
    ///
    /// Panics if either snippet is missing.
    #[must_use]
    pub fn span_between(&self, from: &str, to: &str) -> SourceSpan {
        let start = self.span(from);
        let tail = self
            .text
            .char_indices()
            .nth(start.range.start as usize)
            .map_or(self.text.len(), |(b, _)| b);
        let rel = self.text[tail..]
            .find(to)
            .unwrap_or_else(|| panic!("{to:?} not found after {from:?}"));
        let end = self.text[..tail + rel].chars().count() as u32 + to.chars().count() as u32;
        self.index.span(ByteRange {
            start: start.range.start,
            end,
        })
    }

    /// Raw node located at the first occurrence of `needle`
    #[must_use]
    pub fn node(&self, kind: &str, needle: &str) -> RawNode {
        RawNode::new(kind).at(Location::new(self.span(needle)))
    }

    /// Raw node located at the `n`th occurrence of `needle`
    #[must_use]
    pub fn node_nth(&self, kind: &str, needle: &str, n: usize) -> RawNode {
        RawNode::new(kind).at(Location::new(self.span_nth(needle, n)))
    }

    /// Raw node located at an explicit span
    #[must_use]
    pub fn node_at(&self, kind: &str, span: SourceSpan) -> RawNode {
        RawNode::new(kind).at(Location::new(span))
    }

    /// Start recording hits against this text
    #[must_use]
    pub fn hits(&self) -> HitRecorder<'_> {
        HitRecorder {
            fixture: self,
            table: HitTable::new().with_line_index(self.index.clone()),
        }
    }
}

/// Builder for a [`HitTable`] anchored on a fixture
#[derive(Debug)]
pub struct HitRecorder<'f> {
    fixture: &'f SourceFixture,
    table: HitTable,
}

impl HitRecorder<'_> {
    /// Record hits at the first occurrence of `needle`
    #[must_use]
    pub fn at(self, needle: &str, hits: u64) -> Self {
        let span = self.fixture.span(needle);
        self.span(span, hits)
    }

    /// Record hits at the `n`th occurrence of `needle`
    #[must_use]
    pub fn at_nth(self, needle: &str, n: usize, hits: u64) -> Self {
        let span = self.fixture.span_nth(needle, n);
        self.span(span, hits)
    }

    /// Record hits at an explicit span
    #[must_use]
    pub fn span(mut self, span: SourceSpan, hits: u64) -> Self {
        self.table.record(span.range, hits);
        self
    }

    /// Record completions at the first occurrence of `needle`
    #[must_use]
    pub fn completions(mut self, needle: &str, completions: u64) -> Self {
        let span = self.fixture.span(needle);
        self.table.record_completions(span.range, completions);
        self
    }

    /// Finish recording
    #[must_use]
    pub fn build(self) -> HitTable {
        self.table
    }
}

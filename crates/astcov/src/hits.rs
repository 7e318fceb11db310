//! Raw execution hit-count source
//!
//! The coverage core never captures execution counts itself. Whatever
//! instrumented the program hands over a [`HitSource`] answering "how many
//! times was control at this range", and the core derives everything else.

use crate::location::{LineIndex, Position};
use crate::range::ByteRange;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised by a hit-count source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HitSourceError {
    /// The recorded counts could not be read
    #[error("Hit counts unreadable: {message}")]
    Unreadable {
        /// Error message
        message: String,
    },

    /// Instrumented output had an encoding problem
    #[error("Incompatible encoding: {message}")]
    Encoding {
        /// Error message
        message: String,
    },

    /// The queried range lies outside the instrumented buffer
    #[error("Range {start}..{end} outside the instrumented source")]
    OutOfBounds {
        /// Range start
        start: u32,
        /// Range end
        end: u32,
    },
}

/// Query interface over recorded execution counts
///
/// Ranges are matched exactly: two ranges sharing a start but differing in
/// end are distinct positions (a loop modifier's body and the whole loop,
/// for instance). `Ok(None)` means the position was not instrumented.
pub trait HitSource {
    /// Number of times control reached `range`
    fn hits_for_range(&self, range: ByteRange) -> Result<Option<u64>, HitSourceError>;

    /// Count of the outermost instrumented range starting at a position
    fn hits_at(&self, line: u32, column: u32) -> Result<Option<u64>, HitSourceError>;

    /// Number of times control left `range` normally
    ///
    /// Sources that do not track completions keep the default, and every
    /// run is then considered complete.
    fn completions_for_range(&self, _range: ByteRange) -> Result<Option<u64>, HitSourceError> {
        Ok(None)
    }
}

/// One recorded position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitRecord {
    /// Instrumented range
    pub range: ByteRange,
    /// Times control reached the range
    pub hits: u64,
    /// Times control left the range normally, when tracked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completions: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counts {
    hits: u64,
    completions: Option<u64>,
}

/// In-memory hit-count source keyed by exact range
#[derive(Debug, Clone, Default)]
pub struct HitTable {
    counts: BTreeMap<ByteRange, Counts>,
    index: Option<LineIndex>,
}

impl HitTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a line index so `hits_at` can translate positions
    #[must_use]
    pub fn with_line_index(mut self, index: LineIndex) -> Self {
        self.index = Some(index);
        self
    }

    /// Build a table from records
    #[must_use]
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = HitRecord>,
    {
        let mut table = Self::new();
        for record in records {
            table.record(record.range, record.hits);
            if let Some(completions) = record.completions {
                table.record_completions(record.range, completions);
            }
        }
        table
    }

    /// Parse a JSON list of records
    pub fn from_json(json: &str) -> crate::result::CovResult<Self> {
        let records: Vec<HitRecord> = serde_json::from_str(json)?;
        Ok(Self::from_records(records))
    }

    /// Add hits for a range
    pub fn record(&mut self, range: ByteRange, hits: u64) {
        let entry = self.counts.entry(range).or_default();
        entry.hits = entry.hits.saturating_add(hits);
    }

    /// Add completions for a range
    pub fn record_completions(&mut self, range: ByteRange, completions: u64) {
        let entry = self.counts.entry(range).or_default();
        entry.completions = Some(entry.completions.unwrap_or(0).saturating_add(completions));
    }

    /// Merge another table's counts into this one
    pub fn merge(&mut self, other: &Self) {
        for (range, counts) in &other.counts {
            self.record(*range, counts.hits);
            if let Some(completions) = counts.completions {
                self.record_completions(*range, completions);
            }
        }
        if self.index.is_none() {
            self.index.clone_from(&other.index);
        }
    }

    /// Number of recorded ranges
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// True if nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// All records in range order
    #[must_use]
    pub fn records(&self) -> Vec<HitRecord> {
        self.counts
            .iter()
            .map(|(range, counts)| HitRecord {
                range: *range,
                hits: counts.hits,
                completions: counts.completions,
            })
            .collect()
    }

    fn check_bounds(&self, range: ByteRange) -> Result<(), HitSourceError> {
        match &self.index {
            Some(index) if range.end > index.len() => Err(HitSourceError::OutOfBounds {
                start: range.start,
                end: range.end,
            }),
            _ => Ok(()),
        }
    }
}

impl HitSource for HitTable {
    fn hits_for_range(&self, range: ByteRange) -> Result<Option<u64>, HitSourceError> {
        self.check_bounds(range)?;
        Ok(self.counts.get(&range).map(|c| c.hits))
    }

    fn hits_at(&self, line: u32, column: u32) -> Result<Option<u64>, HitSourceError> {
        let Some(index) = &self.index else {
            return Err(HitSourceError::Unreadable {
                message: "no line index attached to hit table".to_string(),
            });
        };
        let Some(offset) = index.offset(Position::new(line, column)) else {
            return Ok(None);
        };
        // ranges sharing a start sort by end, so the outermost one is last
        let lo = ByteRange {
            start: offset,
            end: offset,
        };
        let hi = ByteRange {
            start: offset,
            end: u32::MAX,
        };
        Ok(self.counts.range(lo..=hi).next_back().map(|(_, c)| c.hits))
    }

    fn completions_for_range(&self, range: ByteRange) -> Result<Option<u64>, HitSourceError> {
        self.check_bounds(range)?;
        Ok(self.counts.get(&range).and_then(|c| c.completions))
    }
}

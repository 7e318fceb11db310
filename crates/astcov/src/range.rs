//! Range Utilities
//!
//! Interval arithmetic over source character offsets. A node's proper range
//! is its own range minus the union of its direct children's ranges, and is
//! expressed as a [`RangeSet`] rather than a flat list of offsets.

use crate::result::{CovError, CovResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open range `[start, end)` over character offsets
///
/// Decoding goes through [`ByteRange::new`], so persisted trees and hit
/// tables cannot carry a reversed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Bounds")]
pub struct ByteRange {
    /// First offset in the range
    pub start: u32,
    /// One past the last offset in the range
    pub end: u32,
}

#[derive(Deserialize)]
struct Bounds {
    start: u32,
    end: u32,
}

impl TryFrom<Bounds> for ByteRange {
    type Error = CovError;

    fn try_from(bounds: Bounds) -> CovResult<Self> {
        Self::new(bounds.start, bounds.end)
    }
}

impl ByteRange {
    /// Create a range, rejecting `end < start`
    pub fn new(start: u32, end: u32) -> CovResult<Self> {
        if end < start {
            return Err(CovError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Build a range from two offsets in either order
    #[must_use]
    pub fn spanning(a: u32, b: u32) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    /// Number of offsets covered
    #[inline]
    #[must_use]
    pub const fn len(self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// True for zero-width ranges
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Check if an offset falls inside the range
    #[inline]
    #[must_use]
    pub const fn contains(self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }

}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A set of offsets stored as sorted, disjoint, non-adjacent ranges
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<ByteRange>,
}

impl RangeSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a normalized set from arbitrary ranges
    #[must_use]
    pub fn from_ranges<I>(ranges: I) -> Self
    where
        I: IntoIterator<Item = ByteRange>,
    {
        let mut sorted: Vec<ByteRange> = ranges.into_iter().filter(|r| !r.is_empty()).collect();
        sorted.sort();

        let mut merged: Vec<ByteRange> = Vec::with_capacity(sorted.len());
        for range in sorted {
            match merged.last_mut() {
                Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
                _ => merged.push(range),
            }
        }
        Self { ranges: merged }
    }

    /// The normalized ranges
    #[must_use]
    pub fn ranges(&self) -> &[ByteRange] {
        &self.ranges
    }

    /// Number of offsets in the set
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.iter().map(|r| r.len() as usize).sum()
    }

    /// True if the set holds no offsets
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Check if an offset belongs to the set
    #[must_use]
    pub fn contains(&self, offset: u32) -> bool {
        // ranges are sorted and disjoint
        let idx = self.ranges.partition_point(|r| r.end <= offset);
        self.ranges.get(idx).is_some_and(|r| r.contains(offset))
    }

    /// Offsets of `self` that are not in `other`
    #[must_use]
    pub fn subtract(&self, other: &Self) -> Self {
        let mut out = Vec::new();
        let mut holes = other.ranges.iter().peekable();

        for range in &self.ranges {
            let mut cursor = range.start;
            while let Some(hole) = holes.peek() {
                if hole.end <= cursor {
                    holes.next();
                    continue;
                }
                if hole.start >= range.end {
                    break;
                }
                if hole.start > cursor {
                    out.push(ByteRange {
                        start: cursor,
                        end: hole.start,
                    });
                }
                cursor = cursor.max(hole.end);
                if hole.end > range.end {
                    break;
                }
                holes.next();
            }
            if cursor < range.end {
                out.push(ByteRange {
                    start: cursor,
                    end: range.end,
                });
            }
        }
        Self { ranges: out }
    }

}

impl From<ByteRange> for RangeSet {
    fn from(range: ByteRange) -> Self {
        Self::from_ranges([range])
    }
}

/// `range` minus the union of `others`
///
/// Used to compute a node's proper range from its own range and the ranges of
/// its located children.
#[must_use]
pub fn subtract<I>(range: ByteRange, others: I) -> RangeSet
where
    I: IntoIterator<Item = ByteRange>,
{
    RangeSet::from(range).subtract(&RangeSet::from_ranges(others))
}

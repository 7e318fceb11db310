//! Coverage Results
//!
//! The structure handed to reporting collaborators: line hits, branch
//! entries and the node count of the analysed tree.

use crate::location::SourceSpan;
use crate::node::{BranchKind, NodeId};
use crate::range::ByteRange;
use crate::result::{CovError, CovResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Line hit counts, ascending by line
///
/// Lines holding no executable node are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineCoverage {
    lines: BTreeMap<u32, u64>,
}

impl LineCoverage {
    /// Create an empty projection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the count of a line
    pub fn insert(&mut self, line: u32, hits: u64) {
        let _ = self.lines.insert(line, hits);
    }

    /// Iterate `(line, hits)`; each call starts over
    pub fn iter(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.lines.iter().map(|(line, hits)| (*line, *hits))
    }

    /// Count for a line, absent for non-executable lines
    #[must_use]
    pub fn get(&self, line: u32) -> Option<u64> {
        self.lines.get(&line).copied()
    }

    /// Lines with at least one executable node
    #[must_use]
    pub fn relevant_lines(&self) -> usize {
        self.lines.len()
    }

    /// Relevant lines hit at least once
    #[must_use]
    pub fn covered_lines(&self) -> usize {
        self.lines.values().filter(|&&h| h > 0).count()
    }

    /// One slot per line of a `line_count`-line buffer, `None` for
    /// non-executable lines
    #[must_use]
    pub fn to_dense(&self, line_count: usize) -> Vec<Option<u64>> {
        let mut dense = vec![None; line_count];
        for (line, hits) in self.iter() {
            if let Some(slot) = (line as usize).checked_sub(1).and_then(|i| dense.get_mut(i)) {
                *slot = Some(hits);
            }
        }
        dense
    }

    /// True if no line is relevant
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Outcome label of a branch construct
///
/// Labels are part of the persisted format: add variants, never rename them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchLabel {
    /// Condition held, or short-circuit operand was truthy
    Then,
    /// The other path, reported even when the clause is absent
    Else,
    /// `when` clause, by 0-based source position
    When(usize),
    /// Loop body iterations
    Body,
    /// Pre-test loop entered without running its body
    ///
    /// Derived as entries minus body runs, so it is exact for a loop entered
    /// once and a lower bound when some entries iterate and others do not.
    Skip,
}

impl BranchLabel {
    /// Label tag
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Then => "then",
            Self::Else => "else",
            Self::When(_) => "when",
            Self::Body => "body",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for BranchLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::When(i) => write!(f, "when[{i}]"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Discriminator of one branch construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchKey {
    /// Normalized construct kind
    pub kind: BranchKind,
    /// Node id of the construct; tie-breaks identical ranges
    pub id: NodeId,
    /// Span of the construct
    pub span: SourceSpan,
}

impl BranchKey {
    /// Character range of the construct
    #[must_use]
    pub const fn range(&self) -> ByteRange {
        self.span.range
    }
}

/// One outcome of a branch construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchOutcome {
    /// Outcome label
    pub label: BranchLabel,
    /// Index, unique together with every key id
    pub id: u32,
    /// Span of the clause, or of the construct for implicit paths
    pub span: SourceSpan,
    /// Times this outcome was taken
    pub hits: u64,
}

/// A construct key with its outcomes in canonical label order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchEntry {
    /// Discriminator
    pub key: BranchKey,
    /// Outcomes
    pub outcomes: Vec<BranchOutcome>,
}

impl BranchEntry {
    /// Outcome with the given label
    #[must_use]
    pub fn outcome(&self, label: BranchLabel) -> Option<&BranchOutcome> {
        self.outcomes.iter().find(|o| o.label == label)
    }

    /// `(label, hits)` pairs in canonical order
    #[must_use]
    pub fn hits_by_label(&self) -> Vec<(BranchLabel, u64)> {
        self.outcomes.iter().map(|o| (o.label, o.hits)).collect()
    }

    /// Outcomes taken at least once
    #[must_use]
    pub fn covered_outcomes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.hits > 0).count()
    }
}

/// Branch entries of one unit, in emission order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchCoverage {
    entries: Vec<BranchEntry>,
}

impl BranchCoverage {
    /// Create an empty set of entries
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap entries as emitted
    #[must_use]
    pub fn from_entries(entries: Vec<BranchEntry>) -> Self {
        Self { entries }
    }

    /// Append an entry
    pub fn push(&mut self, entry: BranchEntry) {
        self.entries.push(entry);
    }

    /// Entry keyed on a construct
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&BranchEntry> {
        self.entries.iter().find(|e| e.key.id == id)
    }

    /// Iterate the entries; each call starts over
    pub fn iter(&self) -> impl Iterator<Item = &BranchEntry> + '_ {
        self.entries.iter()
    }

    /// Entries of one kind
    pub fn of_kind(&self, kind: BranchKind) -> impl Iterator<Item = &BranchEntry> + '_ {
        self.entries.iter().filter(move |e| e.key.kind == kind)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no construct was reported
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total outcomes across all entries
    #[must_use]
    pub fn total_outcomes(&self) -> usize {
        self.entries.iter().map(|e| e.outcomes.len()).sum()
    }

    /// Outcomes taken at least once, across all entries
    #[must_use]
    pub fn covered_outcomes(&self) -> usize {
        self.entries.iter().map(BranchEntry::covered_outcomes).sum()
    }

    /// Closing consistency check
    ///
    /// Fails when two entries share a discriminator `(kind, range, id)`, or
    /// when any index appears twice across keys and outcomes.
    pub fn verify_unique(&self) -> CovResult<()> {
        let mut keys: HashMap<(BranchKind, ByteRange, NodeId), usize> = HashMap::new();
        let mut indices: HashMap<u32, usize> = HashMap::new();

        for (position, entry) in self.entries.iter().enumerate() {
            let key = entry.key;
            if let Some(&first) = keys.get(&(key.kind, key.range(), key.id)) {
                return Err(CovError::DiscriminatorCollision {
                    kind: key.kind.to_string(),
                    range: key.range().to_string(),
                    node: key.id.as_u32(),
                    first,
                    second: position,
                });
            }
            let _ = keys.insert((key.kind, key.range(), key.id), position);

            let ids = std::iter::once(key.id.as_u32()).chain(entry.outcomes.iter().map(|o| o.id));
            for index in ids {
                if indices.insert(index, position).is_some() {
                    return Err(CovError::DuplicateBranchIndex { index });
                }
            }
        }
        Ok(())
    }
}

/// `(kind, id, first_line, first_column, last_line, last_column)`
pub type RubyLikeKey = (String, u32, u32, u32, u32, u32);

fn ruby_like_key(tag: &str, id: u32, span: &SourceSpan) -> RubyLikeKey {
    let [l1, c1, l2, c2] = span.to_tuple();
    (tag.to_string(), id, l1, c1, l2, c2)
}

/// Aggregate figures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSummary {
    /// Lines with executable code
    pub lines_relevant: usize,
    /// Relevant lines hit at least once
    pub lines_covered: usize,
    /// Branch outcomes reported
    pub branches_total: usize,
    /// Outcomes taken at least once
    pub branches_covered: usize,
}

impl CoverageSummary {
    /// Line coverage percentage; vacuously 100 without relevant lines
    #[must_use]
    pub fn line_percent(&self) -> f64 {
        percent(self.lines_covered, self.lines_relevant)
    }

    /// Branch coverage percentage; vacuously 100 without outcomes
    #[must_use]
    pub fn branch_percent(&self) -> f64 {
        percent(self.branches_covered, self.branches_total)
    }

    /// Add another summary's figures
    pub fn merge(&mut self, other: &Self) {
        self.lines_relevant += other.lines_relevant;
        self.lines_covered += other.lines_covered;
        self.branches_total += other.branches_total;
        self.branches_covered += other.branches_covered;
    }
}

fn percent(covered: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (covered as f64 / total as f64) * 100.0
}

/// Coverage of one analysed unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageResult {
    /// Line hits
    pub lines: LineCoverage,
    /// Branch entries
    pub branches: BranchCoverage,
    /// Nodes in the augmented tree
    pub node_count: usize,
}

impl CoverageResult {
    /// Aggregate figures
    #[must_use]
    pub fn summary(&self) -> CoverageSummary {
        CoverageSummary {
            lines_relevant: self.lines.relevant_lines(),
            lines_covered: self.lines.covered_lines(),
            branches_total: self.branches.total_outcomes(),
            branches_covered: self.branches.covered_outcomes(),
        }
    }

    /// Persisted JSON encoding
    pub fn to_json(&self) -> CovResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode the persisted JSON encoding
    pub fn from_json(json: &str) -> CovResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Branches in the tuple form the reference runtime reports
    ///
    /// `when` labels drop their clause position, so two `when` outcomes of
    /// one `case` differ only by outcome id. Use [`BranchLabel::When`] on the
    /// entry for the position.
    #[must_use]
    pub fn ruby_like_branches(&self) -> BTreeMap<RubyLikeKey, BTreeMap<RubyLikeKey, u64>> {
        self.branches
            .iter()
            .map(|entry| {
                let key = ruby_like_key(entry.key.kind.as_str(), entry.key.id.as_u32(), &entry.key.span);
                let outcomes = entry
                    .outcomes
                    .iter()
                    .map(|o| (ruby_like_key(o.label.as_str(), o.id, &o.span), o.hits))
                    .collect();
                (key, outcomes)
            })
            .collect()
    }
}

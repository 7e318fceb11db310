//! astcov: syntax-tree coverage analysis over runtime hit counts
//!
//! Given a parsed tree and a record of how often control reached each source
//! range, astcov derives line coverage and branch coverage that match what a
//! language runtime reports, across spelling variants such as `if`/`unless`,
//! `while`/`until` and post-tested `begin ... end while` loops.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌─────────────┐   ┌────────────────┐
//! │ RawNode  │──►│ TreeBuilder  │──►│ CoveredTree │──►│ LineProjector  │──┐
//! │ (parser) │   │ + Context    │   │ (arena)     │   │ BranchAnalyser │  │
//! └──────────┘   └──────────────┘   └─────────────┘   └────────────────┘  │
//!                                          ▲                              ▼
//!                               ┌──────────┴──┐                 ┌────────────────┐
//!                               │ HitSource   │                 │ CoverageResult │
//!                               └─────────────┘                 └────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use astcov::prelude::*;
//!
//! // `123 && 45`
//! let index = LineIndex::new("123 && 45");
//! let at = |start, end| Location::new(index.span(ByteRange { start, end }));
//! let tree = RawNode::new("and")
//!     .at(at(0, 9))
//!     .child(RawNode::new("int").at(at(0, 3)))
//!     .child(RawNode::new("int").at(at(7, 9)));
//!
//! let mut hits = HitTable::new();
//! for range in [(0, 9), (0, 3), (7, 9)] {
//!     hits.record(ByteRange { start: range.0, end: range.1 }, 1);
//! }
//!
//! let result = Analysis::default().run(&tree, &hits).unwrap();
//! let entry = result.branches.iter().next().unwrap();
//! assert_eq!(entry.outcome(BranchLabel::Then).unwrap().hits, 1);
//! assert_eq!(entry.outcome(BranchLabel::Else).unwrap().hits, 0);
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

/// Branch analysis, line projection and the one-call pipeline
pub mod analyser;
/// Analysis options
pub mod config;
/// Source-anchored builders for trees and hit tables
#[cfg(any(test, feature = "fixture"))]
pub mod fixture;
/// Raw hit-count source interface
pub mod hits;
/// Positions, spans and line indexing
pub mod location;
/// Augmented nodes, variants and the tree builder
pub mod node;
/// Range utilities
pub mod range;
/// The raw tree handed over by a parser
pub mod raw;
/// Coverage result structures
pub mod report;
mod result;
/// Multi-unit analysis runs
pub mod session;

pub use analyser::{Analysis, BranchAnalyser, LineProjector};
pub use config::{AnalysisConfig, AnalysisConfigBuilder};
pub use hits::{HitRecord, HitSource, HitSourceError, HitTable};
pub use location::{LineIndex, Location, Position, SourceSpan};
pub use node::{
    BranchKind, Context, CoveredNode, CoveredTree, NodeFactory, NodeId, Order, TreeBuilder,
    Variant,
};
pub use range::{ByteRange, RangeSet};
pub use raw::{Leaf, RawChild, RawNode};
pub use report::{
    BranchCoverage, BranchEntry, BranchKey, BranchLabel, BranchOutcome, CoverageResult,
    CoverageSummary, LineCoverage,
};
pub use result::{CovError, CovResult};
pub use session::{CoverageSession, UnitOutcome, UnitReport};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::analyser::*;
    pub use super::config::*;
    #[cfg(any(test, feature = "fixture"))]
    pub use super::fixture::*;
    pub use super::hits::*;
    pub use super::location::*;
    pub use super::node::*;
    pub use super::range::{ByteRange, RangeSet};
    pub use super::raw::*;
    pub use super::report::*;
    pub use super::result::*;
    pub use super::session::*;
}

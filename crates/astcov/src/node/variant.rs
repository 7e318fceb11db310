//! Node variants
//!
//! A closed set of construct shapes with specialized coverage semantics.
//! Clause positions are stored on the variant as child slots, so spellings
//! with different child layouts (`if`/`unless`, `and`/`binary`) share one
//! variant and one analysis.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Short-circuit operator family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShortCircuitOp {
    /// `&&` / `and`
    And,
    /// `||` / `or`
    Or,
}

/// Where a loop tests its condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoopTest {
    /// `while c; body; end`: condition first
    PreTest,
    /// `begin; body; end while c`: body first
    PostTest,
}

/// Specialized node variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variant {
    /// Any construct without specialized semantics
    #[default]
    Generic,
    /// Syntactic marker that never registers a hit on its own
    Marker,
    /// Statement sequence; flows through its children
    Sequence,
    /// `if`, `unless`, ternary and modifier forms
    Conditional {
        /// Slot of the clause run when the condition holds
        then_slot: usize,
        /// Slot of the clause run otherwise
        else_slot: usize,
    },
    /// `case` with `when` clauses
    Case,
    /// A `when` clause of a `case`
    When,
    /// `&&` and `||` in any spelling
    ShortCircuit {
        /// Operator family
        op: ShortCircuitOp,
        /// Slot of the left operand
        lhs: usize,
        /// Slot of the right operand
        rhs: usize,
    },
    /// `recv&.method`
    SafeNavigation {
        /// Slot of the receiver
        receiver: usize,
    },
    /// `while`/`until`, pre- or post-tested
    Loop {
        /// Pre- or post-test
        test: LoopTest,
        /// `until` spelling: the loop runs while the condition is false
        negated: bool,
    },
}

impl Variant {
    /// `if c; a; end`
    pub const IF: Self = Self::Conditional {
        then_slot: 1,
        else_slot: 2,
    };

    /// `unless c; a; else; b; end` with children in source order
    pub const UNLESS: Self = Self::Conditional {
        then_slot: 2,
        else_slot: 1,
    };

    /// Name used in debug rendering
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Generic => "Generic",
            Self::Marker => "Marker",
            Self::Sequence => "Sequence",
            Self::Conditional { .. } => "Conditional",
            Self::Case => "Case",
            Self::When => "When",
            Self::ShortCircuit {
                op: ShortCircuitOp::And,
                ..
            } => "And",
            Self::ShortCircuit {
                op: ShortCircuitOp::Or,
                ..
            } => "Or",
            Self::SafeNavigation { .. } => "SafeNavigation",
            Self::Loop {
                test: LoopTest::PreTest,
                negated: false,
            } => "While",
            Self::Loop {
                test: LoopTest::PreTest,
                negated: true,
            } => "Until",
            Self::Loop {
                test: LoopTest::PostTest,
                negated: false,
            } => "WhilePost",
            Self::Loop {
                test: LoopTest::PostTest,
                negated: true,
            } => "UntilPost",
        }
    }

    /// Keywords and markers are not executable; literals and calls are
    #[must_use]
    pub const fn is_executable(&self) -> bool {
        !matches!(self, Self::Marker | Self::Sequence)
    }

    /// Branch kind, for constructs that participate in branch coverage
    #[must_use]
    pub const fn branch_kind(&self) -> Option<BranchKind> {
        match self {
            Self::Conditional { .. } => Some(BranchKind::If),
            Self::Case => Some(BranchKind::Case),
            Self::ShortCircuit {
                op: ShortCircuitOp::And,
                ..
            } => Some(BranchKind::And),
            Self::ShortCircuit {
                op: ShortCircuitOp::Or,
                ..
            } => Some(BranchKind::Or),
            Self::SafeNavigation { .. } => Some(BranchKind::SafeNavigation),
            Self::Loop {
                test: LoopTest::PreTest,
                ..
            } => Some(BranchKind::While),
            Self::Loop {
                test: LoopTest::PostTest,
                ..
            } => Some(BranchKind::WhilePost),
            Self::Generic | Self::Marker | Self::Sequence | Self::When => None,
        }
    }

    /// True for constructs with the branch capability
    #[must_use]
    pub const fn is_branch(&self) -> bool {
        self.branch_kind().is_some()
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalized construct kind of a branch result entry
///
/// `unless` reports as `if` and `until` as `while`, so spelling-equivalent
/// source yields the same key kind. Tags are part of the persisted format:
/// add variants, never rename them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchKind {
    /// Conditionals
    If,
    /// Multi-way conditionals
    Case,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `&.`
    #[serde(rename = "csend")]
    SafeNavigation,
    /// Pre-test loops
    While,
    /// Post-test loops
    WhilePost,
}

impl BranchKind {
    /// Stable tag
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::If => "if",
            Self::Case => "case",
            Self::And => "and",
            Self::Or => "or",
            Self::SafeNavigation => "csend",
            Self::While => "while",
            Self::WhilePost => "while_post",
        }
    }
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

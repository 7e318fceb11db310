//! Branch Coverage Analyser
//!
//! Walks the branch constructs of a tree in post-order and emits one
//! [`BranchEntry`] per located construct. Spelling variants were already
//! folded into shared variants by the factory, so `unless` and `until`
//! come out with the same outcome maps as `if` and `while`.
//!
//! Counts are derived from the hit source only:
//!
//! | construct | outcomes |
//! |---|---|
//! | conditional | `then`, `else` (always both) |
//! | case | one `when` per clause, `else` only when present |
//! | `&&` `\|\|` `&.` | `then` (operand truthy), `else` |
//! | pre-test loop | `body`, `skip` |
//! | post-test loop | `body` |

use crate::config::AnalysisConfig;
use crate::hits::{HitSource, HitSourceError};
use crate::location::SourceSpan;
use crate::node::{Context, CoveredNode, CoveredTree, LoopTest, Order, ShortCircuitOp, Variant};
use crate::report::{BranchCoverage, BranchEntry, BranchKey, BranchLabel, BranchOutcome};

type Counted<T> = Result<T, HitSourceError>;

/// An outcome before its id is allocated
#[derive(Debug, Clone, Copy)]
struct Path {
    label: BranchLabel,
    span: SourceSpan,
    hits: u64,
}

const fn path(label: BranchLabel, span: SourceSpan, hits: u64) -> Path {
    Path { label, span, hits }
}

/// Derives branch entries from a tree and a hit source
#[derive(Clone, Copy)]
pub struct BranchAnalyser<'a> {
    config: &'a AnalysisConfig,
    hits: &'a dyn HitSource,
}

impl std::fmt::Debug for BranchAnalyser<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BranchAnalyser")
            .field("config", self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> BranchAnalyser<'a> {
    /// Create an analyser reading counts from `hits`
    #[must_use]
    pub fn new(config: &'a AnalysisConfig, hits: &'a dyn HitSource) -> Self {
        Self { config, hits }
    }

    /// Analyse every branch construct of `tree`
    ///
    /// Outcome ids are allocated from `ctx`, which must be the context the
    /// tree was built under.
    pub fn analyse(&self, tree: &CoveredTree, ctx: &mut Context) -> Counted<BranchCoverage> {
        let mut branches = BranchCoverage::new();
        for node in tree.walk_branches(Order::Post) {
            if let Some(entry) = self.entry(node, ctx)? {
                branches.push(entry);
            }
        }
        Ok(branches)
    }

    /// Entry for a single construct; `None` for non-branches and for
    /// constructs without a location
    pub fn entry(&self, node: CoveredNode<'_>, ctx: &mut Context) -> Counted<Option<BranchEntry>> {
        let Some(kind) = node.variant().branch_kind() else {
            return Ok(None);
        };
        let Some(span) = node.span() else {
            tracing::debug!(node = %node.id(), kind = node.kind(), "branch construct without location skipped");
            return Ok(None);
        };

        let outcomes = self
            .paths(node, span)?
            .into_iter()
            .map(|p| BranchOutcome {
                label: p.label,
                id: ctx.allocate_id(),
                span: p.span,
                hits: p.hits,
            })
            .collect();

        Ok(Some(BranchEntry {
            key: BranchKey {
                kind,
                id: node.id(),
                span,
            },
            outcomes,
        }))
    }

    fn paths(&self, node: CoveredNode<'_>, span: SourceSpan) -> Counted<Vec<Path>> {
        match node.variant() {
            Variant::Conditional {
                then_slot,
                else_slot,
            } => self.conditional(node, span, then_slot, else_slot),
            Variant::Case => self.case(node, span),
            Variant::ShortCircuit { op, lhs, rhs } => self.short_circuit(node, span, op, lhs, rhs),
            Variant::SafeNavigation { receiver } => self.safe_navigation(node, span, receiver),
            Variant::Loop {
                test: LoopTest::PreTest,
                ..
            } => self.pre_test_loop(node, span),
            Variant::Loop {
                test: LoopTest::PostTest,
                ..
            } => self.post_test_loop(node, span),
            Variant::Generic | Variant::Marker | Variant::Sequence | Variant::When => {
                Ok(Vec::new())
            }
        }
    }

    fn conditional(
        &self,
        node: CoveredNode<'_>,
        span: SourceSpan,
        then_slot: usize,
        else_slot: usize,
    ) -> Counted<Vec<Path>> {
        let evaluations = self.evaluations(node, clause(node, 0))?;
        let then_clause = clause(node, then_slot);
        let else_clause = clause(node, else_slot);
        let then_runs = self.runs_of(then_clause)?;
        let else_runs = self.runs_of(else_clause)?;

        let then_hits = match (then_runs, else_runs) {
            (Some(hits), _) => hits,
            (None, Some(other)) => remainder(node, BranchLabel::Then, evaluations, other),
            (None, None) => 0,
        };
        let else_hits = match else_runs {
            Some(hits) => hits,
            None => remainder(node, BranchLabel::Else, evaluations, then_hits),
        };

        Ok(vec![
            path(BranchLabel::Then, span_or(then_clause, span), then_hits),
            path(BranchLabel::Else, span_or(else_clause, span), else_hits),
        ])
    }

    fn short_circuit(
        &self,
        node: CoveredNode<'_>,
        span: SourceSpan,
        op: ShortCircuitOp,
        lhs: usize,
        rhs: usize,
    ) -> Counted<Vec<Path>> {
        let evaluations = self.evaluations(node, clause(node, lhs))?;
        let right = clause(node, rhs);
        let right_runs = self.runs_of(right)?.unwrap_or(0);
        let right_span = span_or(right, span);

        // `then` means the left operand was truthy
        Ok(match op {
            ShortCircuitOp::And => vec![
                path(BranchLabel::Then, right_span, right_runs),
                path(
                    BranchLabel::Else,
                    span,
                    remainder(node, BranchLabel::Else, evaluations, right_runs),
                ),
            ],
            ShortCircuitOp::Or => vec![
                path(
                    BranchLabel::Then,
                    span,
                    remainder(node, BranchLabel::Then, evaluations, right_runs),
                ),
                path(BranchLabel::Else, right_span, right_runs),
            ],
        })
    }

    fn safe_navigation(
        &self,
        node: CoveredNode<'_>,
        span: SourceSpan,
        receiver: usize,
    ) -> Counted<Vec<Path>> {
        let evaluations = self.evaluations(node, clause(node, receiver))?;
        let dispatched = match node.location().and_then(|l| l.selector) {
            Some(selector) => self.hits.hits_for_range(selector.range)?.unwrap_or(0),
            None => {
                tracing::debug!(node = %node.id(), "safe navigation without selector span");
                0
            }
        };
        Ok(vec![
            path(BranchLabel::Then, span, dispatched),
            path(
                BranchLabel::Else,
                span,
                remainder(node, BranchLabel::Else, evaluations, dispatched),
            ),
        ])
    }

    fn case(&self, node: CoveredNode<'_>, span: SourceSpan) -> Counted<Vec<Path>> {
        let whens: Vec<CoveredNode<'_>> = node
            .children_nodes()
            .filter(|c| c.variant() == Variant::When)
            .collect();
        let else_body = node
            .children()
            .len()
            .checked_sub(1)
            .filter(|&last| last >= 1)
            .and_then(|last| clause(node, last))
            .filter(|c| c.variant() != Variant::When);

        let mut paths = Vec::with_capacity(whens.len() + 1);
        for (i, when) in whens.iter().enumerate() {
            let label = BranchLabel::When(i);
            let body = when
                .children()
                .len()
                .checked_sub(1)
                .filter(|&last| last >= 1)
                .and_then(|last| clause(*when, last));

            if let Some(body) = body {
                paths.push(path(label, span_or(Some(body), span), self.runs(body)?));
                continue;
            }

            let next = match whens.get(i + 1) {
                Some(next) => Some(self.reach(*next)?),
                None => self.runs_of(else_body)?,
            };
            let hits = match next {
                Some(next) => remainder(*when, label, self.reach(*when)?, next),
                None => 0,
            };
            paths.push(path(label, span_or(Some(*when), span), hits));
        }

        if let Some(else_body) = else_body {
            paths.push(path(
                BranchLabel::Else,
                span_or(Some(else_body), span),
                self.runs(else_body)?,
            ));
        }
        Ok(paths)
    }

    fn pre_test_loop(&self, node: CoveredNode<'_>, span: SourceSpan) -> Counted<Vec<Path>> {
        let entries = self.runs(node)?;
        let body = clause(node, 1);
        let iterations = match body {
            Some(body) => self.runs(body)?,
            None => {
                let evaluations = self.evaluations(node, clause(node, 0))?;
                remainder(node, BranchLabel::Body, evaluations, entries)
            }
        };

        let mut paths = vec![path(BranchLabel::Body, span_or(body, span), iterations)];
        if self.config.include_skip {
            paths.push(path(BranchLabel::Skip, span, entries.saturating_sub(iterations)));
        }
        Ok(paths)
    }

    fn post_test_loop(&self, node: CoveredNode<'_>, span: SourceSpan) -> Counted<Vec<Path>> {
        let body = clause(node, 1);
        let iterations = match body {
            Some(body) if body.children_nodes().any(|c| c.location().is_some()) => {
                self.runs(body)?
            }
            Some(body) => match body.recorded_hits(self.hits)? {
                Some(hits) => hits,
                None => self.runs(node)?,
            },
            None => self.runs(node)?,
        };
        Ok(vec![path(BranchLabel::Body, span_or(body, span), iterations)])
    }

    fn runs(&self, node: CoveredNode<'_>) -> Counted<u64> {
        node.run_count(self.hits)
    }

    fn runs_of(&self, node: Option<CoveredNode<'_>>) -> Counted<Option<u64>> {
        node.map(|n| self.runs(n)).transpose()
    }

    /// Times the controlling operand was evaluated
    fn evaluations(
        &self,
        construct: CoveredNode<'_>,
        operand: Option<CoveredNode<'_>>,
    ) -> Counted<u64> {
        if let Some(operand) = operand {
            if operand.recorded_hits(self.hits)?.is_some() {
                return operand.full_run_count(self.hits);
            }
        }
        self.runs(construct)
    }

    /// Times control reached a `when` clause's first test
    fn reach(&self, when: CoveredNode<'_>) -> Counted<u64> {
        match clause(when, 0) {
            Some(test) => self.runs(test),
            None => self.runs(when),
        }
    }
}

/// Located node in `slot`
fn clause(node: CoveredNode<'_>, slot: usize) -> Option<CoveredNode<'_>> {
    node.child_at(slot).filter(|c| c.location().is_some())
}

fn span_or(node: Option<CoveredNode<'_>>, fallback: SourceSpan) -> SourceSpan {
    node.and_then(|n| n.span()).unwrap_or(fallback)
}

fn remainder(node: CoveredNode<'_>, label: BranchLabel, total: u64, taken: u64) -> u64 {
    total.checked_sub(taken).unwrap_or_else(|| {
        tracing::warn!(
            node = %node.id(),
            kind = node.kind(),
            %label,
            total,
            taken,
            "inconsistent hit counts, clamping outcome to zero"
        );
        0
    })
}

//! Line Coverage Projector

use crate::config::AnalysisConfig;
use crate::hits::{HitSource, HitSourceError};
use crate::node::{Context, CoveredTree, Order};
use crate::report::LineCoverage;

/// Projects node run counts onto the first line of each node
#[derive(Clone, Copy)]
pub struct LineProjector<'a> {
    config: &'a AnalysisConfig,
    hits: &'a dyn HitSource,
}

impl std::fmt::Debug for LineProjector<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineProjector")
            .field("config", self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> LineProjector<'a> {
    /// Create a projector reading counts from `hits`
    #[must_use]
    pub fn new(config: &'a AnalysisConfig, hits: &'a dyn HitSource) -> Self {
        Self { config, hits }
    }

    /// Feed every located executable node into the context's line table
    ///
    /// Lines merge by maximum, so a child on its parent's line never adds
    /// to the parent's count.
    pub fn record(&self, tree: &CoveredTree, ctx: &mut Context) -> Result<(), HitSourceError> {
        for node in tree.walk(Order::Pre) {
            if !node.is_executable() {
                continue;
            }
            let Some(span) = node.span() else {
                continue;
            };
            let runs = node.run_count(self.hits)?;
            let line = span.first_line();
            ctx.line_hit(line, runs);
            if !self.config.allow_partial && runs == 0 {
                ctx.mark_uncovered(line);
            }
        }
        Ok(())
    }

    /// Record `tree` and drain the context's line table
    pub fn project(
        &self,
        tree: &CoveredTree,
        ctx: &mut Context,
    ) -> Result<LineCoverage, HitSourceError> {
        self.record(tree, ctx)?;
        let mut lines = LineCoverage::new();
        for (line, hit) in ctx.take_line_hits() {
            if line < self.config.first_line {
                continue;
            }
            lines.insert(line, if hit.partial { 0 } else { hit.hits });
        }
        Ok(lines)
    }
}

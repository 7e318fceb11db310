//! Coverage analysis
//!
//! [`Analysis`] runs the whole pipeline for one unit: augment the raw tree,
//! project line hits, analyse branches and verify the result.

mod branch;
mod line;

pub use branch::BranchAnalyser;
pub use line::LineProjector;

use crate::config::AnalysisConfig;
use crate::hits::HitSource;
use crate::node::{Context, CoveredTree, TreeBuilder};
use crate::raw::RawNode;
use crate::report::CoverageResult;
use crate::result::{CovError, CovResult};

/// Name used for units analysed through [`Analysis::run`]
pub const ANONYMOUS_UNIT: &str = "<unit>";

/// One-call analysis pipeline
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    config: AnalysisConfig,
}

impl Analysis {
    /// Create a pipeline with the given configuration
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyse an anonymous unit
    pub fn run(&self, raw: &RawNode, hits: &dyn HitSource) -> CovResult<CoverageResult> {
        self.run_unit(ANONYMOUS_UNIT, raw, hits)
    }

    /// Analyse a named unit; the name appears in hit-source errors
    pub fn run_unit(
        &self,
        unit: &str,
        raw: &RawNode,
        hits: &dyn HitSource,
    ) -> CovResult<CoverageResult> {
        self.config.validate()?;
        let mut ctx = Context::new();
        let tree = TreeBuilder::new(&mut ctx).build(raw);
        self.analyse_tree(unit, &tree, &mut ctx, hits)
    }

    /// Analyse an already augmented tree built under `ctx`
    pub fn analyse_tree(
        &self,
        unit: &str,
        tree: &CoveredTree,
        ctx: &mut Context,
        hits: &dyn HitSource,
    ) -> CovResult<CoverageResult> {
        let lines = LineProjector::new(&self.config, hits)
            .project(tree, ctx)
            .map_err(|e| CovError::hit_source(unit, e))?;
        let branches = BranchAnalyser::new(&self.config, hits)
            .analyse(tree, ctx)
            .map_err(|e| CovError::hit_source(unit, e))?;

        if self.config.verify_unique {
            branches.verify_unique()?;
        }

        tracing::debug!(
            unit,
            nodes = tree.len(),
            branches = branches.len(),
            lines = lines.relevant_lines(),
            "analysed unit"
        );
        Ok(CoverageResult {
            lines,
            branches,
            node_count: tree.len(),
        })
    }
}

#[cfg(test)]
mod tests;

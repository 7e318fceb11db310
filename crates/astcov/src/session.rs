//! Coverage Sessions
//!
//! Analyses many source units in one run. Every unit gets its own
//! [`Context`](crate::node::Context) and its own outcome, so a hit source
//! that fails for one unit leaves the others untouched.

use crate::analyser::Analysis;
use crate::config::AnalysisConfig;
use crate::hits::HitSource;
use crate::raw::RawNode;
use crate::report::{CoverageResult, CoverageSummary};
use crate::result::CovError;

/// What became of one unit
#[derive(Debug)]
pub enum UnitOutcome {
    /// Analysis completed
    Covered(CoverageResult),
    /// Analysis was abandoned for this unit only
    Abandoned(CovError),
}

impl UnitOutcome {
    /// The result, if the unit was covered
    #[must_use]
    pub fn result(&self) -> Option<&CoverageResult> {
        match self {
            Self::Covered(result) => Some(result),
            Self::Abandoned(_) => None,
        }
    }

    /// The error, if the unit was abandoned
    #[must_use]
    pub fn error(&self) -> Option<&CovError> {
        match self {
            Self::Covered(_) => None,
            Self::Abandoned(err) => Some(err),
        }
    }
}

/// A named unit and its outcome
#[derive(Debug)]
pub struct UnitReport {
    /// Unit name, usually a file path
    pub name: String,
    /// Outcome of the analysis
    pub outcome: UnitOutcome,
}

/// Multi-unit analysis run
#[derive(Debug, Default)]
pub struct CoverageSession {
    analysis: Analysis,
    units: Vec<UnitReport>,
}

impl CoverageSession {
    /// Create a session analysing every unit with `config`
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            analysis: Analysis::new(config),
            units: Vec::new(),
        }
    }

    /// Analyse one unit and keep its outcome
    pub fn add_unit(
        &mut self,
        name: impl Into<String>,
        raw: &RawNode,
        hits: &dyn HitSource,
    ) -> &UnitOutcome {
        let name = name.into();
        let outcome = match self.analysis.run_unit(&name, raw, hits) {
            Ok(result) => UnitOutcome::Covered(result),
            Err(err) => {
                tracing::warn!(unit = %name, fatal = err.is_fatal(), error = %err, "abandoning unit");
                UnitOutcome::Abandoned(err)
            }
        };
        self.units.push(UnitReport { name, outcome });
        &self.units[self.units.len() - 1].outcome
    }

    /// All units in insertion order
    #[must_use]
    pub fn units(&self) -> &[UnitReport] {
        &self.units
    }

    /// Outcome of a unit by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&UnitOutcome> {
        self.units.iter().find(|u| u.name == name).map(|u| &u.outcome)
    }

    /// Covered units with their results
    pub fn covered(&self) -> impl Iterator<Item = (&str, &CoverageResult)> + '_ {
        self.units
            .iter()
            .filter_map(|u| u.outcome.result().map(|r| (u.name.as_str(), r)))
    }

    /// Abandoned units with their errors
    pub fn abandoned(&self) -> impl Iterator<Item = (&str, &CovError)> + '_ {
        self.units
            .iter()
            .filter_map(|u| u.outcome.error().map(|e| (u.name.as_str(), e)))
    }

    /// True if any unit hit a consistency failure
    #[must_use]
    pub fn has_fatal(&self) -> bool {
        self.abandoned().any(|(_, err)| err.is_fatal())
    }

    /// Figures aggregated over covered units
    #[must_use]
    pub fn summary(&self) -> CoverageSummary {
        let mut summary = CoverageSummary::default();
        for (_, result) in self.covered() {
            summary.merge(&result.summary());
        }
        summary
    }

    /// Take the unit reports out of the session
    #[must_use]
    pub fn into_units(self) -> Vec<UnitReport> {
        self.units
    }
}

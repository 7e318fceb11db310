//! Result and error types for astcov.

use crate::hits::HitSourceError;
use thiserror::Error;

/// Result type for astcov operations
pub type CovResult<T> = Result<T, CovError>;

/// Errors that can occur while analysing a source unit
#[derive(Debug, Error)]
pub enum CovError {
    /// The raw hit-count source could not be queried for a unit
    #[error("Hit-count source failed for {unit}: {source}")]
    HitSource {
        /// Name of the analysed unit
        unit: String,
        /// Underlying collaborator error
        #[source]
        source: HitSourceError,
    },

    /// Two branch entries produced the same discriminator key
    #[error("Discriminator collision on {kind} {range}: entries {first} and {second} share node {node}")]
    DiscriminatorCollision {
        /// Construct kind tag
        kind: String,
        /// Construct range, rendered as `start..end`
        range: String,
        /// Node id both entries were keyed on
        node: u32,
        /// Emission position of the first entry
        first: usize,
        /// Emission position of the second entry
        second: usize,
    },

    /// A branch index was emitted twice (keys and outcomes share one index space)
    #[error("Branch index {index} emitted twice")]
    DuplicateBranchIndex {
        /// The repeated index
        index: u32,
    },

    /// A range whose end precedes its start
    #[error("Invalid range {start}..{end}")]
    InvalidRange {
        /// Range start offset
        start: u32,
        /// Range end offset
        end: u32,
    },

    /// Configuration rejected by validation
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl CovError {
    /// Wrap a collaborator error with the unit it was raised for
    #[must_use]
    pub fn hit_source(unit: impl Into<String>, source: HitSourceError) -> Self {
        Self::HitSource {
            unit: unit.into(),
            source,
        }
    }

    /// Consistency failures point at an id-assignment or range bug and must
    /// never be treated as a recoverable analysis outcome.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DiscriminatorCollision { .. } | Self::DuplicateBranchIndex { .. }
        )
    }
}

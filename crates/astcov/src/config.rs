//! Analysis configuration

use crate::result::{CovError, CovResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options of one analysis pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// When false, a line holding an executable node that never ran
    /// reports 0 even if another node on it ran
    pub allow_partial: bool,
    /// Line at which the unit starts inside its file
    pub first_line: u32,
    /// Run the closing discriminator uniqueness check
    pub verify_unique: bool,
    /// Emit the `skip` outcome of pre-test loops
    pub include_skip: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            allow_partial: true,
            first_line: 1,
            verify_unique: true,
            include_skip: true,
        }
    }
}

impl AnalysisConfig {
    /// Create a builder for analysis config
    #[must_use]
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }

    /// Parse from YAML
    pub fn from_yaml_str(yaml: &str) -> CovResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from JSON
    pub fn from_json_str(json: &str) -> CovResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: &Path) -> CovResult<Self> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            Some("yaml" | "yml") => Self::from_yaml_str(&text),
            other => Err(CovError::InvalidConfig {
                message: format!(
                    "unsupported config extension {:?} for {}",
                    other.unwrap_or(""),
                    path.display()
                ),
            }),
        }
    }

    /// Reject settings no analysis can honour
    pub fn validate(&self) -> CovResult<()> {
        if self.first_line == 0 {
            return Err(CovError::InvalidConfig {
                message: "first_line is 1-based and must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for analysis configuration
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl Default for AnalysisConfigBuilder {
    fn default() -> Self {
        Self {
            config: AnalysisConfig::default(),
        }
    }
}

impl AnalysisConfigBuilder {
    /// Allow partially executed lines to report their hits
    #[must_use]
    pub fn allow_partial(mut self, enabled: bool) -> Self {
        self.config.allow_partial = enabled;
        self
    }

    /// Set the first line of the unit
    #[must_use]
    pub fn first_line(mut self, line: u32) -> Self {
        self.config.first_line = line;
        self
    }

    /// Enable the closing uniqueness check
    #[must_use]
    pub fn verify_unique(mut self, enabled: bool) -> Self {
        self.config.verify_unique = enabled;
        self
    }

    /// Emit `skip` outcomes for pre-test loops
    #[must_use]
    pub fn include_skip(mut self, enabled: bool) -> Self {
        self.config.include_skip = enabled;
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> AnalysisConfig {
        self.config
    }
}

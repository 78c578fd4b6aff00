//! Reconciliation configuration
//!
//! Every section has serde defaults, so a TOML file only needs the values it
//! changes:
//!
//! ```toml
//! [assembly]
//! time_sensitive_window_days = 14
//! ```

use docplan_extract::{GroundingPolicy, ScoringWeights};
use docplan_workflow::AssemblyPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pipeline execution settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Score and ground entities on the rayon pool
    pub parallel_scoring: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { parallel_scoring: true }
    }
}

/// Full configuration of the reconciliation core
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub scoring: ScoringWeights,
    pub grounding: GroundingPolicy,
    pub assembly: AssemblyPolicy,
    pub pipeline: PipelineConfig,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML did not parse
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be rendered
    #[error("cannot render config: {0}")]
    Render(#[from] toml::ser::Error),

    /// A value is out of range
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dotted path of the field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

impl ReconcileConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With scoring weights
    #[inline]
    #[must_use]
    pub fn with_scoring(mut self, scoring: ScoringWeights) -> Self {
        self.scoring = scoring;
        self
    }

    /// With invalid-citation downgrade factor
    #[inline]
    #[must_use]
    pub fn with_invalid_citation_factor(mut self, factor: f64) -> Self {
        self.grounding.invalid_citation_factor = factor;
        self
    }

    /// With ambiguity discount
    #[inline]
    #[must_use]
    pub fn with_ambiguity_factor(mut self, factor: f64) -> Self {
        self.assembly.ambiguity_factor = factor;
        self
    }

    /// With time-sensitivity window
    #[inline]
    #[must_use]
    pub fn with_time_sensitive_window(mut self, days: u32) -> Self {
        self.assembly.time_sensitive_window_days = days;
        self
    }

    /// With parallel scoring on or off
    #[inline]
    #[must_use]
    pub fn with_parallel_scoring(mut self, parallel: bool) -> Self {
        self.pipeline.parallel_scoring = parallel;
        self
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// `Parse` on bad syntax, `InvalidValue` on out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// `Io` if unreadable, otherwise as [`Self::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML
    ///
    /// # Errors
    /// `Render` if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit_fields = [
            ("scoring.retrieval_weight", self.scoring.retrieval_weight),
            ("scoring.model_weight", self.scoring.model_weight),
            ("scoring.fallback_model_likelihood", self.scoring.fallback_model_likelihood),
            ("scoring.explicit_bonus", self.scoring.explicit_bonus),
            ("scoring.cross_validation_bonus", self.scoring.cross_validation_bonus),
            ("grounding.invalid_citation_factor", self.grounding.invalid_citation_factor),
            ("assembly.ambiguity_factor", self.assembly.ambiguity_factor),
        ];
        for (field, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("{value} is outside [0, 1]"),
                });
            }
        }
        // an invalid citation must strictly lower confidence
        if self.grounding.invalid_citation_factor >= 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "grounding.invalid_citation_factor",
                reason: "must be below 1".to_string(),
            });
        }
        if self.assembly.time_sensitive_window_days == 0 {
            return Err(ConfigError::InvalidValue {
                field: "assembly.time_sensitive_window_days",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_constants() {
        let config = ReconcileConfig::new();
        assert_eq!(config.scoring.retrieval_weight, 0.4);
        assert_eq!(config.scoring.fallback_model_likelihood, 0.7);
        assert_eq!(config.grounding.invalid_citation_factor, 0.2);
        assert_eq!(config.assembly.ambiguity_factor, 0.9);
        assert_eq!(config.assembly.time_sensitive_window_days, 30);
        assert!(config.pipeline.parallel_scoring);
        config.validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = ReconcileConfig::from_toml_str("[assembly]\ntime_sensitive_window_days = 14\n").unwrap();
        assert_eq!(config.assembly.time_sensitive_window_days, 14);
        assert_eq!(config.assembly.ambiguity_factor, 0.9);
        assert_eq!(config.scoring, ScoringWeights::default());
    }

    #[test]
    fn rendered_toml_parses_back() {
        let config = ReconcileConfig::new().with_time_sensitive_window(7).with_parallel_scoring(false);
        let text = config.to_toml_string().unwrap();
        assert_eq!(ReconcileConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = ReconcileConfig::from_toml_str("[scoring]\nmodel_weight = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "scoring.model_weight", .. }));

        let err = ReconcileConfig::new().with_time_sensitive_window(0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "assembly.time_sensitive_window_days", .. }));

        let err = ReconcileConfig::new().with_invalid_citation_factor(1.0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "grounding.invalid_citation_factor", .. }));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[grounding]\ninvalid_citation_factor = 0.5").unwrap();
        let config = ReconcileConfig::from_file(file.path()).unwrap();
        assert_eq!(config.grounding.invalid_citation_factor, 0.5);

        let missing = ReconcileConfig::from_file(file.path().with_extension("absent"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}

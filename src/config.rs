//! Pipeline configuration
//!
//! Every field has a default matching the production dashboard, so an empty
//! JSON object is a valid configuration.

use crate::counterfactual::IdealProfile;
use crate::error::ComputeError;
use crate::metrics::{MetricsConfig, MAX_GRADE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default rounding applied to potential grades
pub const DEFAULT_POTENTIAL_DECIMALS: u32 = 2;

/// Settings for a dashboard run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Habit values used to build the counterfactual profile
    pub ideal_profile: IdealProfile,
    /// Top of the grade scale
    pub max_grade: f64,
    /// Decimals kept on potential grades before metrics; `None` keeps full precision
    pub potential_decimals: Option<u32>,
    pub clamp_complexity: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ideal_profile: IdealProfile::default(),
            max_grade: MAX_GRADE,
            potential_decimals: Some(DEFAULT_POTENTIAL_DECIMALS),
            clamp_complexity: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ComputeError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ComputeError> {
        let json = fs::read_to_string(path)
            .map_err(|e| ComputeError::ConfigError(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn metrics(&self) -> MetricsConfig {
        MetricsConfig {
            max_grade: self.max_grade,
            clamp_complexity: self.clamp_complexity,
        }
    }

    fn validate(&self) -> Result<(), ComputeError> {
        if !(self.max_grade.is_finite() && self.max_grade > 0.0) {
            return Err(ComputeError::ConfigError(format!(
                "max_grade must be positive, got {}",
                self.max_grade
            )));
        }
        if let Some(decimals) = self.potential_decimals {
            if decimals > 10 {
                return Err(ComputeError::ConfigError(format!(
                    "potential_decimals must be at most 10, got {decimals}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(PipelineConfig::from_json("{}").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = PipelineConfig::from_json(
            r#"{"potential_decimals": null, "ideal_profile": {"goout": 1}}"#,
        )
        .unwrap();
        assert_eq!(config.potential_decimals, None);
        assert_eq!(config.ideal_profile.goout, 1.0);
        assert_eq!(config.ideal_profile.studytime, 4.0);
        assert_eq!(config.max_grade, 20.0);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            PipelineConfig::from_json(r#"{"max_grade": 0}"#),
            Err(ComputeError::ConfigError(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json(r#"{"potential_decimals": 40}"#),
            Err(ComputeError::ConfigError(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json("[1, 2]"),
            Err(ComputeError::ConfigError(_))
        ));
    }

    #[test]
    fn test_metrics_view() {
        let config = PipelineConfig {
            clamp_complexity: false,
            ..Default::default()
        };
        let metrics = config.metrics();
        assert_eq!(metrics.max_grade, 20.0);
        assert!(!metrics.clamp_complexity);
    }
}

//! Dashboard metrics
//!
//! Combines recorded and potential grades into the two prioritization metrics:
//! - Improvability margin: how many points better habits could add (never negative)
//! - Complexity score: 1 minus the margin as a share of the grade scale

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};

/// Fixed maximum of the grade scale
pub const MAX_GRADE: f64 = 20.0;

/// Settings for metric computation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub max_grade: f64,
    /// Clamp the complexity score into [0, 1]
    pub clamp_complexity: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            max_grade: MAX_GRADE,
            clamp_complexity: true,
        }
    }
}

/// Compute improvability margins and complexity scores with default settings
pub fn compute_metrics(
    actual_grades: &[f64],
    potential_grades: &[f64],
) -> Result<(Vec<f64>, Vec<f64>), ComputeError> {
    compute_metrics_with(actual_grades, potential_grades, &MetricsConfig::default())
}

/// Compute improvability margins and complexity scores.
///
/// Inputs are parallel arrays; a length mismatch is rejected.
pub fn compute_metrics_with(
    actual_grades: &[f64],
    potential_grades: &[f64],
    config: &MetricsConfig,
) -> Result<(Vec<f64>, Vec<f64>), ComputeError> {
    if actual_grades.len() != potential_grades.len() {
        return Err(ComputeError::DimensionMismatch {
            actual: actual_grades.len(),
            potential: potential_grades.len(),
        });
    }

    let margins: Vec<f64> = actual_grades
        .iter()
        .zip(potential_grades)
        .map(|(actual, potential)| improvability_margin(*actual, *potential))
        .collect();

    let complexity = margins
        .iter()
        .map(|margin| complexity_score(*margin, config))
        .collect();

    Ok((margins, complexity))
}

/// Students already beating their simulated potential get 0, not a negative margin
fn improvability_margin(actual: f64, potential: f64) -> f64 {
    (potential - actual).max(0.0)
}

fn complexity_score(margin: f64, config: &MetricsConfig) -> f64 {
    let score = 1.0 - margin / config.max_grade;
    if config.clamp_complexity {
        score.clamp(0.0, 1.0)
    } else {
        score
    }
}

/// Round to a fixed number of decimals.
///
/// Exact ties go to the even neighbour after scaling, so 14.125 becomes 14.12.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round_ties_even() / factor
}

/// Aggregate view over a batch of computed metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub students: usize,
    pub mean_improvability_margin: Option<f64>,
    pub mean_complexity_score: Option<f64>,
    /// Students with room to improve (margin above zero)
    pub improvable_students: usize,
}

impl MetricsSummary {
    pub fn from_metrics(margins: &[f64], complexity: &[f64]) -> Self {
        Self {
            students: margins.len(),
            mean_improvability_margin: mean(margins),
            mean_complexity_score: mean(complexity),
            improvable_students: margins.iter().filter(|m| **m > 0.0).count(),
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

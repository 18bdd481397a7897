//! Offline training configuration
//!
//! Training happens outside this crate. The hyperparameters it used are kept
//! as a record so a persisted model can carry its own provenance.

use serde::{Deserialize, Serialize};

/// Random forest hyperparameters chosen by the offline grid search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of trees in the forest
    pub n_estimators: usize,
    /// Maximum tree depth; `None` grows until the leaf constraints stop it
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub random_state: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 300,
            max_depth: None,
            min_samples_split: 10,
            min_samples_leaf: 2,
            random_state: 42,
        }
    }
}

//! Persisted random forest regressor
//!
//! Each tree is stored as a flat node array rooted at index 0. A split node
//! sends a row to `left` when `row[feature] <= threshold` and to `right`
//! otherwise; the forest prediction is the mean of the reached leaf values.

use super::{Regressor, TrainingConfig};
use crate::error::ComputeError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// A single node of a regression tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A regression tree as a flat node array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    /// A tree that always predicts `value`
    pub fn leaf(value: f64) -> Self {
        Self::new(vec![TreeNode::Leaf { value }])
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Children must point forward, which also rules out cycles
    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= n_features {
                        return Err(format!(
                            "node {idx} splits on feature {feature} of {n_features}"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {idx} has a non-finite threshold"));
                    }
                    for child in [left, right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {idx} has invalid child {child}"));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {idx} has a non-finite value"));
                    }
                }
            }
        }
        Ok(())
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

/// Random forest regressor loaded from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    n_features: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feature_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    training: Option<TrainingConfig>,
    trees: Vec<RegressionTree>,
}

impl ForestModel {
    /// Build and validate a forest
    pub fn new(n_features: usize, trees: Vec<RegressionTree>) -> Result<Self, ComputeError> {
        let model = Self {
            n_features,
            feature_names: None,
            training: None,
            trees,
        };
        model.validate()?;
        Ok(model)
    }

    /// Record the feature names the forest was trained on
    pub fn with_feature_names(mut self, names: Vec<String>) -> Result<Self, ComputeError> {
        self.feature_names = Some(names);
        self.validate()?;
        Ok(self)
    }

    pub fn with_training_config(mut self, config: TrainingConfig) -> Self {
        self.training = Some(config);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let model: Self = serde_json::from_str(json)
            .map_err(|e| ComputeError::ModelUnavailable(format!("invalid model: {e}")))?;
        model.validate()?;
        Ok(model)
    }

    pub fn load(path: &Path) -> Result<Self, ComputeError> {
        let json = fs::read_to_string(path).map_err(|e| {
            ComputeError::ModelUnavailable(format!("cannot read model {}: {e}", path.display()))
        })?;
        let model = Self::from_json(&json)?;
        debug!(
            path = %path.display(),
            trees = model.trees.len(),
            features = model.n_features,
            "loaded forest model"
        );
        Ok(model)
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ComputeError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    pub fn training_config(&self) -> Option<&TrainingConfig> {
        self.training.as_ref()
    }

    fn validate(&self) -> Result<(), ComputeError> {
        if self.trees.is_empty() {
            return Err(ComputeError::ModelUnavailable(
                "forest has no trees".to_string(),
            ));
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.n_features {
                return Err(ComputeError::ModelUnavailable(format!(
                    "model lists {} feature names for {} features",
                    names.len(),
                    self.n_features
                )));
            }
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| ComputeError::ModelUnavailable(format!("tree {idx}: {e}")))?;
        }
        Ok(())
    }
}

impl Regressor for ForestModel {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|tree| tree.predict_row(row)).sum();
        total / self.trees.len() as f64
    }
}

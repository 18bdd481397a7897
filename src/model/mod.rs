//! Regression model interface
//!
//! The pipeline treats the trained model as an opaque regressor over feature
//! rows ordered by the training schema. This module defines that contract,
//! the shape-checked batch prediction entry point, and the persisted forest
//! model used in production.

mod forest;
mod training;

pub use forest::{ForestModel, RegressionTree, TreeNode};
pub use training::TrainingConfig;

use crate::error::ComputeError;
use crate::types::FeatureTable;
use std::path::Path;
use tracing::debug;

/// A trained regressor mapping one feature row to a predicted grade
pub trait Regressor {
    /// Number of features each row must carry
    fn n_features(&self) -> usize;

    /// Feature names in training order, when the model recorded them
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Predict a single row; callers guarantee `row.len() == n_features()`
    fn predict_row(&self, row: &[f64]) -> f64;
}

/// Predict one value per row, in row order.
///
/// The table must match the model's width exactly and, if the model knows
/// its feature names, their order too; anything else is a schema error.
pub fn predict(model: &dyn Regressor, table: &FeatureTable) -> Result<Vec<f64>, ComputeError> {
    if table.width() != model.n_features() {
        return Err(ComputeError::ShapeMismatch {
            expected: format!("{} columns", model.n_features()),
            actual: format!("{} columns", table.width()),
        });
    }

    if let Some(names) = model.feature_names() {
        if let Some(idx) = names.iter().zip(&table.columns).position(|(a, b)| a != b) {
            return Err(ComputeError::ShapeMismatch {
                expected: format!("column {idx} '{}'", names[idx]),
                actual: format!("column {idx} '{}'", table.columns[idx]),
            });
        }
    }

    let predictions = table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            if row.len() != model.n_features() {
                return Err(ComputeError::ShapeMismatch {
                    expected: format!("{} values", model.n_features()),
                    actual: format!("{} values in row {idx}", row.len()),
                });
            }
            Ok(model.predict_row(row))
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(rows = predictions.len(), "predicted feature table");
    Ok(predictions)
}

/// Load a persisted forest model
pub fn load_model(path: &Path) -> Result<ForestModel, ComputeError> {
    ForestModel::load(path)
}

/// Load a persisted training column schema
pub fn load_schema(path: &Path) -> Result<crate::schema::FeatureSchema, ComputeError> {
    crate::schema::FeatureSchema::load(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sums its inputs; enough to check plumbing
    struct SumModel {
        names: Option<Vec<String>>,
        width: usize,
    }

    impl Regressor for SumModel {
        fn n_features(&self) -> usize {
            self.width
        }

        fn feature_names(&self) -> Option<&[String]> {
            self.names.as_deref()
        }

        fn predict_row(&self, row: &[f64]) -> f64 {
            row.iter().sum()
        }
    }

    fn table(columns: &[&str], rows: Vec<Vec<f64>>) -> FeatureTable {
        FeatureTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn test_predict_preserves_order() {
        let model = SumModel { names: None, width: 2 };
        let table = table(&["a", "b"], vec![vec![1.0, 2.0], vec![5.0, 5.0], vec![0.0, 0.5]]);
        assert_eq!(predict(&model, &table).unwrap(), vec![3.0, 10.0, 0.5]);
    }

    #[test]
    fn test_width_mismatch() {
        let model = SumModel { names: None, width: 3 };
        let table = table(&["a", "b"], vec![vec![1.0, 2.0]]);
        assert!(matches!(
            predict(&model, &table),
            Err(ComputeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_column_order_mismatch() {
        let model = SumModel {
            names: Some(vec!["a".into(), "b".into()]),
            width: 2,
        };
        let swapped = table(&["b", "a"], vec![vec![1.0, 2.0]]);
        let err = predict(&model, &swapped).unwrap_err();
        assert!(matches!(err, ComputeError::ShapeMismatch { expected, .. } if expected.contains("'a'")));
    }

    #[test]
    fn test_ragged_row() {
        let model = SumModel { names: None, width: 2 };
        let ragged = table(&["a", "b"], vec![vec![1.0, 2.0], vec![1.0]]);
        assert!(matches!(
            predict(&model, &ragged),
            Err(ComputeError::ShapeMismatch { actual, .. }) if actual.contains("row 1")
        ));
    }

    #[test]
    fn test_forest_prediction_is_deterministic() {
        let tree = RegressionTree::new(vec![
            TreeNode::Split { feature: 1, threshold: 2.5, left: 1, right: 2 },
            TreeNode::Leaf { value: 8.0 },
            TreeNode::Leaf { value: 15.0 },
        ]);
        let model = ForestModel::new(2, vec![tree, RegressionTree::leaf(11.0)]).unwrap();
        let table = table(&["a", "b"], vec![vec![0.0, 1.0], vec![3.0, 4.0], vec![1.0, 2.5]]);

        let first = predict(&model, &table).unwrap();
        let second = predict(&model, &table).unwrap();
        assert_eq!(first, vec![9.5, 13.0, 9.5]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_load_model_missing_file() {
        assert!(matches!(
            load_model(Path::new("/nonexistent/model.json")),
            Err(ComputeError::ModelUnavailable(_))
        ));
    }
}

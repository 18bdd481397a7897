//! Training column schema and reconciliation
//!
//! A `FeatureSchema` is the ordered list of feature columns fixed when the
//! model was trained. Reconciliation forces any freshly encoded table onto
//! exactly that column set and order.

use crate::error::ComputeError;
use crate::types::{EncodedColumn, FeatureTable};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Ordered feature column names a trained model expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    /// Build a schema, rejecting empty or duplicate-bearing column lists
    pub fn new(columns: Vec<String>) -> Result<Self, ComputeError> {
        if columns.is_empty() {
            return Err(ComputeError::ModelUnavailable(
                "feature schema has no columns".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(ComputeError::ModelUnavailable(format!(
                    "feature schema lists column '{column}' twice"
                )));
            }
        }
        Ok(Self { columns })
    }

    /// Parse a schema from a JSON array of column names
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        serde_json::from_str(json)
            .map_err(|e| ComputeError::ModelUnavailable(format!("invalid feature schema: {e}")))
    }

    /// Load a persisted schema
    pub fn load(path: &Path) -> Result<Self, ComputeError> {
        let json = fs::read_to_string(path).map_err(|e| {
            ComputeError::ModelUnavailable(format!(
                "cannot read feature schema {}: {e}",
                path.display()
            ))
        })?;
        let schema = Self::from_json(&json)?;
        debug!(path = %path.display(), columns = schema.len(), "loaded feature schema");
        Ok(schema)
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ComputeError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Align encoded columns to this schema.
    ///
    /// Schema columns that were not produced are filled with 0, produced
    /// columns the schema does not name are dropped, and the result follows
    /// schema order exactly.
    pub fn reconcile(&self, encoded: Vec<EncodedColumn>, n_rows: usize) -> FeatureTable {
        let mut by_name: HashMap<String, Vec<f64>> = HashMap::with_capacity(encoded.len());
        let mut dropped = Vec::new();
        for column in encoded {
            if !self.contains(&column.name) {
                dropped.push(column.name);
            } else if !by_name.contains_key(&column.name) {
                by_name.insert(column.name, column.values);
            }
        }

        let mut filled = 0usize;
        let aligned: Vec<EncodedColumn> = self
            .columns
            .iter()
            .map(|name| {
                let values = by_name.remove(name).unwrap_or_else(|| {
                    filled += 1;
                    vec![0.0; n_rows]
                });
                EncodedColumn::new(name.clone(), values)
            })
            .collect();

        if !dropped.is_empty() || filled > 0 {
            debug!(
                dropped = ?dropped,
                filled,
                "reconciled encoded columns to feature schema"
            );
        }

        FeatureTable::from_columns(aligned, n_rows)
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = ComputeError;

    fn try_from(columns: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(columns)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn schema(columns: &[&str]) -> FeatureSchema {
        FeatureSchema::new(columns.iter().map(|c| c.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_reconcile_fills_drops_and_orders() {
        let schema = schema(&["b", "missing", "a"]);
        let encoded = vec![
            EncodedColumn::new("a", vec![1.0, 2.0]),
            EncodedColumn::new("extra", vec![9.0, 9.0]),
            EncodedColumn::new("b", vec![3.0, 4.0]),
        ];

        let table = schema.reconcile(encoded, 2);

        assert_eq!(table.columns, vec!["b", "missing", "a"]);
        assert_eq!(table.rows, vec![vec![3.0, 0.0, 1.0], vec![4.0, 0.0, 2.0]]);
    }

    #[test]
    fn test_reconcile_empty_batch() {
        let table = schema(&["a", "b"]).reconcile(Vec::new(), 0);
        assert_eq!(table.width(), 2);
        assert!(table.is_empty());
    }

    #[test]
    fn test_rejects_bad_schemas() {
        assert!(matches!(
            FeatureSchema::new(Vec::new()),
            Err(ComputeError::ModelUnavailable(_))
        ));
        assert!(matches!(
            FeatureSchema::from_json(r#"["a", "a"]"#),
            Err(ComputeError::ModelUnavailable(_))
        ));
        assert!(matches!(
            FeatureSchema::from_json("{not json"),
            Err(ComputeError::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_deserialize_checks_columns() {
        assert!(serde_json::from_str::<FeatureSchema>("[]").is_err());
        assert!(serde_json::from_str::<FeatureSchema>(r#"["a", "b", "a"]"#).is_err());

        let parsed: FeatureSchema = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        assert_eq!(parsed.columns().to_vec(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_json_roundtrip() {
        let original = schema(&["sex", "Mjob_health", "Party_Life"]);
        let parsed = FeatureSchema::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_load_missing_file() {
        let err = FeatureSchema::load(Path::new("/nonexistent/model_features.json")).unwrap_err();
        assert!(matches!(err, ComputeError::ModelUnavailable(_)));
    }
}

//! Feature encoding
//!
//! This module turns a raw student table into a purely numeric feature table:
//! 1. Identifier and name columns are set aside
//! 2. Two-valued categorical fields are mapped onto {0, 1}
//! 3. Nominal fields are one-hot encoded
//! 4. Derived features are computed from the raw numeric fields
//! 5. If a schema is given, columns are reconciled to it
//!
//! Encoding never mutates the input table.

use crate::error::ComputeError;
use crate::features::{FeatureDeriver, DERIVED_COLUMNS};
use crate::normalizer::{binary_mapping, BinaryMapping};
use crate::schema::{required_feature_columns, FeatureSchema, NOMINAL_FIELDS};
use crate::types::{EncodedColumn, FeatureTable, StudentTable, FINAL_GRADE, PASSTHROUGH_COLUMNS};
use std::collections::BTreeSet;
use tracing::debug;

/// Encoder from raw student tables to feature tables
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEncoder;

impl FeatureEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode a raw table.
    ///
    /// Without a schema, the lexicographically first observed level of each
    /// nominal field is the dropped reference level. With a schema, every
    /// observed level gets an indicator and reconciliation keeps only the
    /// levels the schema names, so the schema decides the reference level.
    pub fn encode(
        &self,
        table: &StudentTable,
        schema: Option<&FeatureSchema>,
    ) -> Result<FeatureTable, ComputeError> {
        check_required_columns(table)?;

        let n_rows = table.len();
        let mut columns = Vec::with_capacity(table.columns.len() + DERIVED_COLUMNS.len());

        for name in &table.columns {
            if is_set_aside(name) {
                continue;
            }
            if let Some(mapping) = binary_mapping(name) {
                columns.push(EncodedColumn::new(name.clone(), encode_binary(table, mapping)?));
            } else if schema.map_or(true, |s| s.contains(name)) {
                columns.push(EncodedColumn::new(name.clone(), numeric_column(table, name)?));
            }
        }

        let drop_reference = schema.is_none();
        for field in NOMINAL_FIELDS {
            columns.extend(one_hot(table, field, drop_reference)?);
        }

        let derived = table
            .records
            .iter()
            .enumerate()
            .map(|(row, record)| FeatureDeriver::derive(record, row))
            .collect::<Result<Vec<_>, _>>()?;
        for (idx, name) in DERIVED_COLUMNS.iter().enumerate() {
            let values = derived.iter().map(|d| d.values()[idx]).collect();
            columns.push(EncodedColumn::new(*name, values));
        }

        let encoded = match schema {
            Some(schema) => schema.reconcile(columns, n_rows),
            None => FeatureTable::from_columns(columns, n_rows),
        };

        debug!(
            rows = encoded.len(),
            columns = encoded.width(),
            reconciled = schema.is_some(),
            "encoded student table"
        );

        Ok(encoded)
    }

    /// Encode a labelled table for offline training.
    ///
    /// The `FinalGrade` column is split off as the target; the remaining
    /// column names form the schema a trained model is persisted with.
    pub fn training_frame(&self, table: &StudentTable) -> Result<TrainingFrame, ComputeError> {
        if !table.has_column(FINAL_GRADE) {
            return Err(ComputeError::MissingField(FINAL_GRADE.to_string()));
        }

        let mut features = self.encode(table, None)?;
        let target_idx = features
            .column_index(FINAL_GRADE)
            .ok_or_else(|| ComputeError::MissingField(FINAL_GRADE.to_string()))?;

        features.columns.remove(target_idx);
        let target = features
            .rows
            .iter_mut()
            .map(|row| row.remove(target_idx))
            .collect();

        Ok(TrainingFrame { features, target })
    }
}

/// Encode a raw table, optionally reconciling it to a schema
pub fn encode(
    table: &StudentTable,
    schema: Option<&FeatureSchema>,
) -> Result<FeatureTable, ComputeError> {
    FeatureEncoder::new().encode(table, schema)
}

/// Encoded features and targets for a labelled table
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingFrame {
    pub features: FeatureTable,
    pub target: Vec<f64>,
}

impl TrainingFrame {
    /// Schema an offline trainer persists next to its model
    pub fn schema(&self) -> Result<FeatureSchema, ComputeError> {
        FeatureSchema::new(self.features.columns.clone())
    }
}

fn check_required_columns(table: &StudentTable) -> Result<(), ComputeError> {
    match required_feature_columns()
        .into_iter()
        .find(|c| !table.has_column(c))
    {
        Some(missing) => Err(ComputeError::MissingField(missing.to_string())),
        None => Ok(()),
    }
}

/// Columns handled separately from the passthrough numeric ones: identifiers,
/// nominal fields, and derived features (always recomputed, never reused)
fn is_set_aside(name: &str) -> bool {
    PASSTHROUGH_COLUMNS.contains(&name)
        || NOMINAL_FIELDS.contains(&name)
        || DERIVED_COLUMNS.contains(&name)
}

fn encode_binary(table: &StudentTable, mapping: &BinaryMapping) -> Result<Vec<f64>, ComputeError> {
    table
        .records
        .iter()
        .enumerate()
        .map(|(row, record)| {
            let value = record
                .get(mapping.field)
                .ok_or_else(|| ComputeError::missing_in_row(mapping.field, row))?;
            mapping.encode(value)
        })
        .collect()
}

fn numeric_column(table: &StudentTable, name: &str) -> Result<Vec<f64>, ComputeError> {
    table
        .records
        .iter()
        .enumerate()
        .map(|(row, record)| record.number(name, row))
        .collect()
}

/// Indicator columns named `<field>_<level>`, levels in lexicographic order
fn one_hot(
    table: &StudentTable,
    field: &str,
    drop_reference: bool,
) -> Result<Vec<EncodedColumn>, ComputeError> {
    let values = table
        .records
        .iter()
        .enumerate()
        .map(|(row, record)| record.text(field, row))
        .collect::<Result<Vec<_>, _>>()?;

    let levels: BTreeSet<&str> = values.iter().map(String::as_str).collect();
    let skip = usize::from(drop_reference);

    Ok(levels
        .into_iter()
        .skip(skip)
        .map(|level| {
            let indicator = values
                .iter()
                .map(|v| if v.as_str() == level { 1.0 } else { 0.0 })
                .collect();
            EncodedColumn::new(format!("{field}_{level}"), indicator)
        })
        .collect())
}

//! Core types for the grade potential pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw student records, encoded feature tables, and dashboard output.

use crate::error::ComputeError;
use crate::metrics::MetricsSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Identifier column, passed through to the output
pub const STUDENT_ID: &str = "StudentID";
/// First name column, passed through to the output
pub const FIRST_NAME: &str = "FirstName";
/// Family name column, passed through to the output
pub const FAMILY_NAME: &str = "FamilyName";
/// Ground truth grade column
pub const FINAL_GRADE: &str = "FinalGrade";

/// Columns that never reach the model
pub const PASSTHROUGH_COLUMNS: [&str; 3] = [STUDENT_ID, FIRST_NAME, FAMILY_NAME];

/// A single raw cell value
///
/// JSON `null` and empty CSV cells are `Missing`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Missing,
}

impl FieldValue {
    /// Interpret a raw CSV cell
    pub fn parse_cell(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return FieldValue::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => FieldValue::Number(v),
            _ => FieldValue::Text(trimmed.to_string()),
        }
    }

    /// Numeric view of the value, parsing text if it looks like a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            FieldValue::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => {
                write!(f, "{}", *v as i64)
            }
            FieldValue::Number(v) => write!(f, "{v}"),
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Missing => Ok(()),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

/// One raw student row, keyed by column name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl StudentRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter, mostly useful for fixtures
    pub fn with(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) {
        self.fields.insert(field.to_string(), value.into());
    }

    /// Raw value of a field; `Missing` cells are reported as absent
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field).filter(|v| !v.is_missing())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    /// Numeric value of a required field
    pub fn number(&self, field: &str, row: usize) -> Result<f64, ComputeError> {
        let value = self
            .get(field)
            .ok_or_else(|| ComputeError::missing_in_row(field, row))?;
        value.as_number().ok_or_else(|| ComputeError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        })
    }

    /// String form of a required field
    pub fn text(&self, field: &str, row: usize) -> Result<String, ComputeError> {
        self.get(field)
            .map(|v| v.to_string())
            .ok_or_else(|| ComputeError::missing_in_row(field, row))
    }
}

/// An ordered table of raw student records
///
/// `columns` keeps the header order of the source; records may leave any
/// column unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentTable {
    pub columns: Vec<String>,
    pub records: Vec<StudentRecord>,
}

impl StudentTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            records: Vec::new(),
        }
    }

    /// Build a table whose columns are the union of the record keys, in
    /// first-seen order
    pub fn from_records(records: Vec<StudentRecord>) -> Self {
        let mut table = Self::default();
        for record in records {
            table.push(record);
        }
        table
    }

    /// Append a record, registering any column not seen before
    pub fn push(&mut self, record: StudentRecord) {
        for name in record.field_names() {
            if !self.has_column(name) {
                self.columns.push(name.to_string());
            }
        }
        self.records.push(record);
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Overwrite a column on every record, adding it to the header if absent
    pub fn set_column(&mut self, name: &str, value: FieldValue) {
        if !self.has_column(name) {
            self.columns.push(name.to_string());
        }
        for record in &mut self.records {
            record.set(name, value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A named numeric column produced during encoding, before reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedColumn {
    pub name: String,
    pub values: Vec<f64>,
}

impl EncodedColumn {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Purely numeric, row-major feature table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureTable {
    /// Transpose encoded columns into a row-major table
    pub fn from_columns(columns: Vec<EncodedColumn>, n_rows: usize) -> Self {
        let mut rows = vec![Vec::with_capacity(columns.len()); n_rows];
        for column in &columns {
            for (row, value) in rows.iter_mut().zip(&column.values) {
                row.push(*value);
            }
        }
        Self {
            columns: columns.into_iter().map(|c| c.name).collect(),
            rows,
        }
    }

    /// Number of feature columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Copy of a single column
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }

    /// Single cell lookup by row index and column name
    pub fn value(&self, row: usize, name: &str) -> Option<f64> {
        let idx = self.column_index(name)?;
        self.rows.get(row).map(|r| r[idx])
    }
}

/// One output row of the support dashboard
///
/// Serialized field names are stable; external consumers depend on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRow {
    #[serde(rename = "StudentID")]
    pub student_id: String,
    #[serde(rename = "FirstName")]
    pub first_name: Option<String>,
    #[serde(rename = "FamilyName")]
    pub family_name: Option<String>,
    /// Recorded grade, never recomputed by the model
    #[serde(rename = "FinalGrade")]
    pub final_grade: f64,
    #[serde(rename = "Potential_Grade")]
    pub potential_grade: f64,
    #[serde(rename = "Improvability_Margin")]
    pub improvability_margin: f64,
    #[serde(rename = "Complexity_Score")]
    pub complexity_score: f64,
}

/// Dashboard row with the field names the web front end expects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontendDashboardRow {
    #[serde(rename = "StudentID")]
    pub student_id: String,
    #[serde(rename = "FirstName")]
    pub first_name: Option<String>,
    #[serde(rename = "FamilyName")]
    pub family_name: Option<String>,
    #[serde(rename = "ActualGrade")]
    pub actual_grade: f64,
    #[serde(rename = "PotentialGrade")]
    pub potential_grade: f64,
    #[serde(rename = "Improvability_Margin")]
    pub improvability_margin: f64,
    #[serde(rename = "ComplexityScore")]
    pub complexity_score: f64,
}

impl From<&DashboardRow> for FrontendDashboardRow {
    fn from(row: &DashboardRow) -> Self {
        Self {
            student_id: row.student_id.clone(),
            first_name: row.first_name.clone(),
            family_name: row.family_name.clone(),
            actual_grade: row.final_grade,
            potential_grade: row.potential_grade,
            improvability_margin: row.improvability_margin,
            complexity_score: row.complexity_score,
        }
    }
}

/// Producer metadata attached to a dashboard report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub run_id: Uuid,
}

/// Dashboard rows plus run metadata and aggregate metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub producer: ReportProducer,
    pub computed_at_utc: DateTime<Utc>,
    pub summary: MetricsSummary,
    pub rows: Vec<DashboardRow>,
}

//! JSON record array source
//!
//! Accepts the row-oriented shape a web front end posts after parsing a CSV
//! file: an array of flat objects, one per student.

use super::TableSource;
use crate::error::ComputeError;
use crate::types::{FieldValue, StudentRecord, StudentTable};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

enum JsonOrigin {
    Path(PathBuf),
    Text(String),
}

/// Reads a JSON array of flat records into a student table
pub struct JsonRecordsSource {
    origin: JsonOrigin,
}

impl JsonRecordsSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: JsonOrigin::Path(path.into()),
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            origin: JsonOrigin::Text(text.into()),
        }
    }
}

impl TableSource for JsonRecordsSource {
    fn load(&self) -> Result<StudentTable, ComputeError> {
        match &self.origin {
            JsonOrigin::Path(path) => parse_records(&fs::read_to_string(path)?),
            JsonOrigin::Text(text) => parse_records(text),
        }
    }
}

/// Column order follows first-seen key order across records
fn parse_records(json: &str) -> Result<StudentTable, ComputeError> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Array(items) = value else {
        return Err(ComputeError::ParseError(
            "expected a JSON array of student records".to_string(),
        ));
    };

    let mut table = StudentTable::default();
    for (idx, item) in items.into_iter().enumerate() {
        let Value::Object(fields) = item else {
            return Err(ComputeError::ParseError(format!(
                "record {idx} is not a JSON object"
            )));
        };

        let mut record = StudentRecord::new();
        for (name, raw) in fields {
            let value: FieldValue = serde_json::from_value(raw).map_err(|_| {
                ComputeError::ParseError(format!(
                    "record {idx} field '{name}' must be a number, string or null"
                ))
            })?;
            if !table.has_column(&name) {
                table.columns.push(name.clone());
            }
            record.set(&name, value);
        }
        table.records.push(record);
    }

    Ok(table)
}

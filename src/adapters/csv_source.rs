//! CSV table source

use super::TableSource;
use crate::error::ComputeError;
use crate::types::{FieldValue, StudentRecord, StudentTable};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

enum CsvOrigin {
    Path(PathBuf),
    Text(String),
}

/// Reads a headed CSV file or string into a student table
pub struct CsvSource {
    origin: CsvOrigin,
}

impl CsvSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: CsvOrigin::Path(path.into()),
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            origin: CsvOrigin::Text(text.into()),
        }
    }
}

impl TableSource for CsvSource {
    fn load(&self) -> Result<StudentTable, ComputeError> {
        match &self.origin {
            CsvOrigin::Path(path) => read_table(File::open(path)?),
            CsvOrigin::Text(text) => read_table(text.as_bytes()),
        }
    }
}

fn read_table<R: Read>(reader: R) -> Result<StudentTable, ComputeError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut seen = HashSet::new();
    for header in &headers {
        if header.is_empty() {
            return Err(ComputeError::ParseError("CSV header has an empty column name".into()));
        }
        if !seen.insert(header.as_str()) {
            return Err(ComputeError::ParseError(format!(
                "CSV header repeats column '{header}'"
            )));
        }
    }

    let mut table = StudentTable::new(headers.clone());
    for result in reader.records() {
        let row = result?;
        let mut record = StudentRecord::new();
        for (name, cell) in headers.iter().zip(row.iter()) {
            record.set(name, FieldValue::parse_cell(cell));
        }
        table.records.push(record);
    }

    Ok(table)
}

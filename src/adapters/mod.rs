//! Student table sources
//!
//! This module provides adapters that read raw student data from CSV files or
//! JSON record arrays and map them into a `StudentTable`. The pipeline does not
//! care where a table came from.

mod csv_source;
mod json_source;

pub use csv_source::CsvSource;
pub use json_source::JsonRecordsSource;

use crate::error::ComputeError;
use crate::types::StudentTable;
use std::path::Path;
use tracing::info;

/// Trait for raw student table sources
pub trait TableSource {
    /// Read the whole source into memory
    fn load(&self) -> Result<StudentTable, ComputeError>;
}

/// Load a table from a file, choosing the format by extension.
///
/// `.json` files are read as record arrays; everything else as CSV.
pub fn load_table(path: &Path) -> Result<StudentTable, ComputeError> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let table = if is_json {
        JsonRecordsSource::from_path(path).load()?
    } else {
        CsvSource::from_path(path).load()?
    };

    info!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns.len(),
        "loaded student table"
    );
    Ok(table)
}

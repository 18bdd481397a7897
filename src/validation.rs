//! Batch validation
//!
//! The pipeline itself stops at the first problem. This module instead walks a
//! whole table and collects every problem it can find, so a data owner can fix
//! a file in one pass.

use crate::features::DERIVATION_INPUTS;
use crate::normalizer::BINARY_MAPPINGS;
use crate::schema::{required_dashboard_columns, NOMINAL_FIELDS};
use crate::types::{StudentTable, FINAL_GRADE, STUDENT_ID};
use serde::Serialize;
use std::collections::HashMap;

/// A single problem found in a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Row index, or `None` for table-level problems
    pub row: Option<usize>,
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn table(field: &str, message: impl Into<String>) -> Self {
        Self {
            row: None,
            field: field.to_string(),
            message: message.into(),
        }
    }

    fn row(row: usize, field: &str, message: impl Into<String>) -> Self {
        Self {
            row: Some(row),
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Collect every problem that would make the dashboard pipeline fail
pub fn validate_table(table: &StudentTable) -> Vec<ValidationIssue> {
    let mut issues: Vec<ValidationIssue> = required_dashboard_columns()
        .into_iter()
        .filter(|c| !table.has_column(c))
        .map(|c| ValidationIssue::table(c, "required column is missing"))
        .collect();

    let mut first_seen: HashMap<String, usize> = HashMap::new();

    for (row, record) in table.records.iter().enumerate() {
        match record.get(STUDENT_ID) {
            Some(id) => {
                let id = id.to_string();
                if let Some(first) = first_seen.get(&id) {
                    issues.push(ValidationIssue::row(
                        row,
                        STUDENT_ID,
                        format!("duplicate identifier '{id}' (first seen in row {first})"),
                    ));
                } else {
                    first_seen.insert(id, row);
                }
            }
            None if table.has_column(STUDENT_ID) => {
                issues.push(ValidationIssue::row(row, STUDENT_ID, "value is missing"));
            }
            None => {}
        }

        for mapping in BINARY_MAPPINGS.iter().filter(|m| table.has_column(m.field)) {
            match record.get(mapping.field) {
                Some(value) if mapping.accepts(value) => {}
                Some(value) => issues.push(ValidationIssue::row(
                    row,
                    mapping.field,
                    format!(
                        "'{value}' is not one of '{}' or '{}'",
                        mapping.positive, mapping.negative
                    ),
                )),
                None => issues.push(ValidationIssue::row(row, mapping.field, "value is missing")),
            }
        }

        for field in NOMINAL_FIELDS.iter().filter(|f| table.has_column(f)) {
            if record.get(field).is_none() {
                issues.push(ValidationIssue::row(row, field, "value is missing"));
            }
        }

        let numeric = DERIVATION_INPUTS.iter().chain(std::iter::once(&FINAL_GRADE));
        for field in numeric.filter(|f| table.has_column(f)) {
            match record.get(field) {
                Some(value) if value.as_number().is_some() => {}
                Some(value) => issues.push(ValidationIssue::row(
                    row,
                    field,
                    format!("'{value}' is not a number"),
                )),
                None => issues.push(ValidationIssue::row(row, field, "value is missing")),
            }
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::tests::{make_student, make_table};
    use crate::types::FieldValue;

    #[test]
    fn test_clean_table() {
        assert!(validate_table(&make_table()).is_empty());
    }

    #[test]
    fn test_collects_all_problems() {
        let mut bad = make_student(1.0, "health", "home");
        bad.set("sex", "X");
        bad.set("Medu", "lots");
        bad.set("guardian", FieldValue::Missing);

        let table = StudentTable::from_records(vec![
            make_student(1.0, "teacher", "course"),
            bad,
        ]);
        let issues = validate_table(&table);

        let fields: Vec<(Option<usize>, &str)> =
            issues.iter().map(|i| (i.row, i.field.as_str())).collect();
        assert!(fields.contains(&(Some(1), "StudentID")));
        assert!(fields.contains(&(Some(1), "sex")));
        assert!(fields.contains(&(Some(1), "Medu")));
        assert!(fields.contains(&(Some(1), "guardian")));
        assert_eq!(issues.len(), 4);
    }

    #[test]
    fn test_missing_columns() {
        let mut table = make_table();
        table.columns.retain(|c| c != "Pstatus" && c != "FinalGrade");

        let issues = validate_table(&table);
        let table_level: Vec<&str> = issues
            .iter()
            .filter(|i| i.row.is_none())
            .map(|i| i.field.as_str())
            .collect();
        assert_eq!(table_level, vec!["FinalGrade", "Pstatus"]);
    }
}

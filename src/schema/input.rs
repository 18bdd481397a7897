//! Raw input and dashboard output column definitions

use crate::features::DERIVATION_INPUTS;
use crate::normalizer::BINARY_MAPPINGS;
use crate::types::{FAMILY_NAME, FINAL_GRADE, FIRST_NAME, STUDENT_ID};

/// Unordered nominal fields that are one-hot encoded
pub const NOMINAL_FIELDS: [&str; 4] = ["Mjob", "Fjob", "reason", "guardian"];

/// Canonical dashboard output columns, in serialization order
pub const OUTPUT_COLUMNS: [&str; 7] = [
    STUDENT_ID,
    FIRST_NAME,
    FAMILY_NAME,
    FINAL_GRADE,
    "Potential_Grade",
    "Improvability_Margin",
    "Complexity_Score",
];

/// Raw columns the encoder cannot work without
pub fn required_feature_columns() -> Vec<&'static str> {
    BINARY_MAPPINGS
        .iter()
        .map(|m| m.field)
        .chain(NOMINAL_FIELDS)
        .chain(DERIVATION_INPUTS)
        .collect()
}

/// Raw columns the dashboard pipeline needs in addition to the features
pub fn required_dashboard_columns() -> Vec<&'static str> {
    let mut columns = vec![STUDENT_ID, FINAL_GRADE];
    columns.extend(required_feature_columns());
    columns
}

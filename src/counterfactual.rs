//! Counterfactual profiles
//!
//! Builds the "ideal habits" version of a student table: a copy in which the
//! actionable lifestyle fields are forced to fixed optimal values. Every other
//! field, including identifiers and the recorded grade, is left as is.

use crate::types::{FieldValue, StudentTable};
use serde::{Deserialize, Serialize};

/// Actionable habit values applied to every record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdealProfile {
    /// Weekly study time band (4 is the maximum)
    pub studytime: f64,
    /// Workday alcohol consumption (1 is the minimum)
    #[serde(rename = "Dalc")]
    pub dalc: f64,
    /// Weekend alcohol consumption (1 is the minimum)
    #[serde(rename = "Walc")]
    pub walc: f64,
    pub absences: f64,
    /// Going-out level with the highest mean grade in the training data
    pub goout: f64,
}

impl Default for IdealProfile {
    fn default() -> Self {
        Self {
            studytime: 4.0,
            dalc: 1.0,
            walc: 1.0,
            absences: 0.0,
            goout: 2.0,
        }
    }
}

impl IdealProfile {
    /// Field overrides in application order
    pub fn overrides(&self) -> [(&'static str, f64); 5] {
        [
            ("studytime", self.studytime),
            ("Dalc", self.dalc),
            ("Walc", self.walc),
            ("absences", self.absences),
            ("goout", self.goout),
        ]
    }

    /// Copy the table with every override applied unconditionally
    pub fn apply(&self, table: &StudentTable) -> StudentTable {
        let mut ideal = table.clone();
        for (field, value) in self.overrides() {
            ideal.set_column(field, FieldValue::Number(value));
        }
        ideal
    }
}

/// Counterfactual copy of a table using the default ideal profile
pub fn idealize(table: &StudentTable) -> StudentTable {
    IdealProfile::default().apply(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::tests::{make_student, make_table};
    use crate::encoder::encode;
    use crate::types::{FAMILY_NAME, FINAL_GRADE, FIRST_NAME, STUDENT_ID};

    #[test]
    fn test_overrides_applied() {
        let ideal = idealize(&make_table());

        for record in &ideal.records {
            assert_eq!(record.number("studytime", 0).unwrap(), 4.0);
            assert_eq!(record.number("Dalc", 0).unwrap(), 1.0);
            assert_eq!(record.number("Walc", 0).unwrap(), 1.0);
            assert_eq!(record.number("absences", 0).unwrap(), 0.0);
            assert_eq!(record.number("goout", 0).unwrap(), 2.0);
        }
    }

    #[test]
    fn test_identity_and_grade_untouched() {
        let table = make_table();
        let ideal = idealize(&table);

        for (original, copy) in table.records.iter().zip(&ideal.records) {
            for field in [STUDENT_ID, FIRST_NAME, FAMILY_NAME, FINAL_GRADE, "Medu", "Mjob"] {
                assert_eq!(original.get(field), copy.get(field));
            }
        }
    }

    #[test]
    fn test_input_not_mutated() {
        let table = make_table();
        let before = table.clone();
        let _ = idealize(&table);
        assert_eq!(table, before);
    }

    #[test]
    fn test_missing_habit_columns_are_added() {
        let mut table = StudentTable::from_records(vec![make_student(1.0, "health", "home")]);
        table.columns.retain(|c| c != "absences");
        let ideal = idealize(&table);
        assert!(ideal.has_column("absences"));
    }

    #[test]
    fn test_derived_features_follow_overrides() {
        let ideal = idealize(&make_table());
        let encoded = encode(&ideal, None).unwrap();

        // Dalc=1, Walc=1 -> 1 + 2 = 3; 3^2 * goout(2) = 18
        assert_eq!(encoded.column("Total_Alcohol").unwrap(), vec![3.0; 3]);
        assert_eq!(encoded.column("Party_Life").unwrap(), vec![18.0; 3]);
        assert_eq!(encoded.column("Parent_Edu_Total").unwrap(), vec![4.0; 3]);
    }

    #[test]
    fn test_custom_profile() {
        let profile: IdealProfile = serde_json::from_str(r#"{"goout": 3, "Walc": 2}"#).unwrap();
        assert_eq!(profile.goout, 3.0);
        assert_eq!(profile.walc, 2.0);
        assert_eq!(profile.studytime, 4.0);

        let ideal = profile.apply(&make_table());
        assert_eq!(ideal.records[0].number("goout", 0).unwrap(), 3.0);
    }
}

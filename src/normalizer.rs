//! Categorical normalization
//!
//! Two-valued raw fields are mapped onto {0, 1} through fixed lookup tables.
//! The tables are the single source of truth for which categorical values are
//! valid; anything outside them is rejected.

use crate::error::ComputeError;
use crate::types::FieldValue;

/// A fixed mapping from a two-valued categorical field onto {0, 1}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryMapping {
    pub field: &'static str,
    /// Raw value encoded as 1
    pub positive: &'static str,
    /// Raw value encoded as 0
    pub negative: &'static str,
}

impl BinaryMapping {
    const fn new(field: &'static str, positive: &'static str, negative: &'static str) -> Self {
        Self {
            field,
            positive,
            negative,
        }
    }

    /// Map a raw value onto 0 or 1
    pub fn encode(&self, value: &FieldValue) -> Result<f64, ComputeError> {
        match value {
            FieldValue::Text(s) if s == self.positive => Ok(1.0),
            FieldValue::Text(s) if s == self.negative => Ok(0.0),
            other => Err(ComputeError::InvalidCategory {
                field: self.field.to_string(),
                value: other.to_string(),
            }),
        }
    }

    pub fn accepts(&self, value: &FieldValue) -> bool {
        self.encode(value).is_ok()
    }
}

/// Every binary field, in encoding order
pub const BINARY_MAPPINGS: [BinaryMapping; 12] = [
    BinaryMapping::new("schoolsup", "yes", "no"),
    BinaryMapping::new("famsup", "yes", "no"),
    BinaryMapping::new("paid", "yes", "no"),
    BinaryMapping::new("activities", "yes", "no"),
    BinaryMapping::new("nursery", "yes", "no"),
    BinaryMapping::new("higher", "yes", "no"),
    BinaryMapping::new("internet", "yes", "no"),
    BinaryMapping::new("romantic", "yes", "no"),
    BinaryMapping::new("sex", "F", "M"),
    BinaryMapping::new("address", "U", "R"),
    BinaryMapping::new("famsize", "LE3", "GT3"),
    BinaryMapping::new("Pstatus", "T", "A"),
];

/// Look up the binary mapping that owns a field, if any
pub fn binary_mapping(field: &str) -> Option<&'static BinaryMapping> {
    BINARY_MAPPINGS.iter().find(|m| m.field == field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yes_no_fields_are_mapped() {
        let yes_no = [
            "schoolsup",
            "famsup",
            "paid",
            "activities",
            "nursery",
            "higher",
            "internet",
            "romantic",
        ];
        for field in yes_no {
            let mapping = binary_mapping(field).unwrap();
            assert_eq!(mapping.encode(&"yes".into()).unwrap(), 1.0);
            assert_eq!(mapping.encode(&"no".into()).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_fixed_domains() {
        let cases = [
            ("sex", "F", "M"),
            ("address", "U", "R"),
            ("famsize", "LE3", "GT3"),
            ("Pstatus", "T", "A"),
        ];
        for (field, one, zero) in cases {
            let mapping = binary_mapping(field).unwrap();
            assert_eq!(mapping.encode(&one.into()).unwrap(), 1.0);
            assert_eq!(mapping.encode(&zero.into()).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_out_of_domain_rejected() {
        let mapping = binary_mapping("sex").unwrap();
        let err = mapping.encode(&"X".into()).unwrap_err();
        match err {
            ComputeError::InvalidCategory { field, value } => {
                assert_eq!(field, "sex");
                assert_eq!(value, "X");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Case matters and numbers are not coerced
        assert!(!mapping.accepts(&"f".into()));
        assert!(!binary_mapping("paid").unwrap().accepts(&FieldValue::Number(1.0)));
    }

    #[test]
    fn test_unknown_field_has_no_mapping() {
        assert!(binary_mapping("Mjob").is_none());
        assert!(binary_mapping("studytime").is_none());
    }
}

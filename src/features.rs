//! Feature derivation
//!
//! This module derives higher-order numeric features from raw record fields:
//! - Parental education total and gap
//! - Weighted alcohol consumption
//! - Party life index (alcohol squared times going out)
//!
//! Derived values are always recomputed from the raw fields of the record
//! being encoded, never carried over from an earlier encoding.

use crate::error::ComputeError;
use crate::types::StudentRecord;

pub const PARENT_EDU_TOTAL: &str = "Parent_Edu_Total";
pub const PARENT_EDU_DIFF: &str = "Parent_Edu_Diff";
pub const TOTAL_ALCOHOL: &str = "Total_Alcohol";
pub const PARTY_LIFE: &str = "Party_Life";

/// Derived columns in the order they are appended to an encoded table
pub const DERIVED_COLUMNS: [&str; 4] = [PARENT_EDU_TOTAL, PARENT_EDU_DIFF, TOTAL_ALCOHOL, PARTY_LIFE];

/// Raw numeric fields the derivations read
pub const DERIVATION_INPUTS: [&str; 5] = ["Medu", "Fedu", "Dalc", "Walc", "goout"];

/// Derived features for a single record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedFeatures {
    pub parent_edu_total: f64,
    pub parent_edu_diff: f64,
    pub total_alcohol: f64,
    pub party_life: f64,
}

impl DerivedFeatures {
    /// Values in `DERIVED_COLUMNS` order
    pub fn values(&self) -> [f64; 4] {
        [
            self.parent_edu_total,
            self.parent_edu_diff,
            self.total_alcohol,
            self.party_life,
        ]
    }
}

/// Feature deriver for computing derived features
pub struct FeatureDeriver;

impl FeatureDeriver {
    /// Derive features from a raw record
    pub fn derive(record: &StudentRecord, row: usize) -> Result<DerivedFeatures, ComputeError> {
        let medu = record.number("Medu", row)?;
        let fedu = record.number("Fedu", row)?;
        let dalc = record.number("Dalc", row)?;
        let walc = record.number("Walc", row)?;
        let goout = record.number("goout", row)?;

        let total_alcohol = compute_total_alcohol(dalc, walc);

        Ok(DerivedFeatures {
            parent_edu_total: medu + fedu,
            parent_edu_diff: (medu - fedu).abs(),
            total_alcohol,
            party_life: compute_party_life(total_alcohol, goout),
        })
    }
}

/// Weekend drinking counts double
fn compute_total_alcohol(dalc: f64, walc: f64) -> f64 {
    dalc + 2.0 * walc
}

fn compute_party_life(total_alcohol: f64, goout: f64) -> f64 {
    total_alcohol * total_alcohol * goout
}

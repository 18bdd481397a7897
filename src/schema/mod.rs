//! Column schemas
//!
//! This module defines both ends of the encoder's contract: the raw input
//! columns a student table must carry, and the ordered feature columns a
//! trained model expects.

mod feature_schema;
mod input;

pub use feature_schema::*;
pub use input::*;

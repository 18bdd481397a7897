//! Grade Potential - deterministic potential-grade inference for student support
//!
//! Estimates, for each student, the grade they could reach with optimized study
//! habits, then derives an improvability margin and a complexity score used to
//! prioritize support. The pipeline is a pure batch transform:
//! raw table → ideal-habits copy → feature encoding → model prediction → metrics.
//!
//! ## Modules
//!
//! - **Encoding**: `normalizer`, `features`, `encoder` and `schema` turn raw
//!   records into model-ready feature tables
//! - **Inference**: `counterfactual`, `model`, `metrics` and `pipeline` produce
//!   dashboard rows

pub mod adapters;
pub mod config;
pub mod counterfactual;
pub mod encoder;
pub mod error;
pub mod features;
pub mod metrics;
pub mod model;
pub mod normalizer;
pub mod pipeline;
pub mod schema;
pub mod types;
pub mod validation;

pub use adapters::{load_table, CsvSource, JsonRecordsSource, TableSource};
pub use config::PipelineConfig;
pub use counterfactual::{idealize, IdealProfile};
pub use encoder::{encode, FeatureEncoder, TrainingFrame};
pub use error::ComputeError;
pub use metrics::{compute_metrics, MetricsSummary};
pub use model::{load_model, load_schema, predict, ForestModel, Regressor, TrainingConfig};
pub use pipeline::{generate_dashboard_data, DashboardProcessor};
pub use schema::FeatureSchema;
pub use types::{DashboardRow, FeatureTable, FieldValue, StudentRecord, StudentTable};

/// Crate version embedded in dashboard reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for dashboard reports
pub const PRODUCER_NAME: &str = "grade-potential";

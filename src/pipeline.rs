//! Pipeline orchestration
//!
//! This module provides the public API of the crate. It orchestrates the full
//! pipeline from a raw student table to dashboard rows:
//! 1. Counterfactual - Build the ideal-habits copy of the table
//! 2. FeatureEncoder - Encode the copy against the training schema
//! 3. Regressor - Predict the potential grade
//! 4. Metrics - Compare with the recorded grade
//!
//! The recorded grade always comes from the original table; the model is only
//! used for the potential grade.

use crate::adapters::load_table;
use crate::config::PipelineConfig;
use crate::encoder::FeatureEncoder;
use crate::error::ComputeError;
use crate::metrics::{compute_metrics_with, round_to, MetricsSummary};
use crate::model::{predict, ForestModel, Regressor};
use crate::schema::FeatureSchema;
use crate::types::{
    DashboardReport, DashboardRow, ReportProducer, StudentRecord, StudentTable, FAMILY_NAME,
    FINAL_GRADE, FIRST_NAME, STUDENT_ID,
};
use crate::{PRODUCER_NAME, VERSION};
use chrono::Utc;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// Build dashboard rows for a data file using a persisted model and schema.
///
/// # Arguments
/// * `data_path` - CSV or JSON student table
/// * `model_path` - Persisted forest model (JSON)
/// * `schema_path` - Persisted training column schema (JSON array)
///
/// # Example
/// ```ignore
/// let rows = generate_dashboard_data(
///     Path::new("students.csv"),
///     Path::new("model.json"),
///     Path::new("model_features.json"),
/// )?;
/// ```
pub fn generate_dashboard_data(
    data_path: &Path,
    model_path: &Path,
    schema_path: &Path,
) -> Result<Vec<DashboardRow>, ComputeError> {
    let processor = DashboardProcessor::from_paths(model_path, schema_path)?;
    let table = load_table(data_path)?;
    processor.dashboard(&table)
}

/// Reusable processor holding the read-only model and schema.
///
/// Load it once at startup and share it; every call works on its own copy of
/// the input, so concurrent calls do not interfere.
pub struct DashboardProcessor {
    model: Box<dyn Regressor + Send + Sync>,
    schema: FeatureSchema,
    encoder: FeatureEncoder,
    config: PipelineConfig,
}

impl DashboardProcessor {
    /// Create a processor with default settings
    pub fn new(model: impl Regressor + Send + Sync + 'static, schema: FeatureSchema) -> Self {
        Self::with_config(model, schema, PipelineConfig::default())
    }

    pub fn with_config(
        model: impl Regressor + Send + Sync + 'static,
        schema: FeatureSchema,
        config: PipelineConfig,
    ) -> Self {
        Self {
            model: Box::new(model),
            schema,
            encoder: FeatureEncoder::new(),
            config,
        }
    }

    /// Load the persisted forest model and schema
    pub fn from_paths(model_path: &Path, schema_path: &Path) -> Result<Self, ComputeError> {
        let model = ForestModel::load(model_path)?;
        let schema = FeatureSchema::load(schema_path)?;
        Ok(Self::new(model, schema))
    }

    /// Replace the run settings
    pub fn set_config(&mut self, config: PipelineConfig) {
        self.config = config;
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Potential grade per record under the ideal profile.
    ///
    /// Pure inference: the recorded grade is not needed.
    pub fn potential_grades(&self, table: &StudentTable) -> Result<Vec<f64>, ComputeError> {
        let ideal = self.config.ideal_profile.apply(table);
        let features = self.encoder.encode(&ideal, Some(&self.schema))?;
        let predictions = predict(self.model.as_ref(), &features)?;

        Ok(match self.config.potential_decimals {
            Some(decimals) => predictions.into_iter().map(|p| round_to(p, decimals)).collect(),
            None => predictions,
        })
    }

    /// Dashboard rows for every record, in input order
    pub fn dashboard(&self, table: &StudentTable) -> Result<Vec<DashboardRow>, ComputeError> {
        for column in [STUDENT_ID, FINAL_GRADE] {
            if !table.has_column(column) {
                return Err(ComputeError::MissingField(column.to_string()));
            }
        }

        let passthrough = table
            .records
            .iter()
            .enumerate()
            .map(|(row, record)| Passthrough::extract(record, row))
            .collect::<Result<Vec<_>, _>>()?;

        let potential = self.potential_grades(table)?;
        let actual: Vec<f64> = passthrough.iter().map(|p| p.final_grade).collect();
        let (margins, complexity) = compute_metrics_with(&actual, &potential, &self.config.metrics())?;

        let rows: Vec<DashboardRow> = passthrough
            .into_iter()
            .zip(potential)
            .zip(margins.into_iter().zip(complexity))
            .map(|((p, potential_grade), (improvability_margin, complexity_score))| DashboardRow {
                student_id: p.student_id,
                first_name: p.first_name,
                family_name: p.family_name,
                final_grade: p.final_grade,
                potential_grade,
                improvability_margin,
                complexity_score,
            })
            .collect();

        debug!(rows = rows.len(), "assembled dashboard rows");
        Ok(rows)
    }

    /// Dashboard rows wrapped with run metadata and aggregates
    pub fn report(&self, table: &StudentTable) -> Result<DashboardReport, ComputeError> {
        let rows = self.dashboard(table)?;
        let margins: Vec<f64> = rows.iter().map(|r| r.improvability_margin).collect();
        let complexity: Vec<f64> = rows.iter().map(|r| r.complexity_score).collect();
        let summary = MetricsSummary::from_metrics(&margins, &complexity);
        let run_id = Uuid::new_v4();

        info!(
            run_id = %run_id,
            students = summary.students,
            improvable = summary.improvable_students,
            "computed dashboard report"
        );

        Ok(DashboardReport {
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: VERSION.to_string(),
                run_id,
            },
            computed_at_utc: Utc::now(),
            summary,
            rows,
        })
    }
}

/// Fields copied from the original record, never from the counterfactual
struct Passthrough {
    student_id: String,
    first_name: Option<String>,
    family_name: Option<String>,
    final_grade: f64,
}

impl Passthrough {
    fn extract(record: &StudentRecord, row: usize) -> Result<Self, ComputeError> {
        Ok(Self {
            student_id: record.text(STUDENT_ID, row)?,
            first_name: record.get(FIRST_NAME).map(|v| v.to_string()),
            family_name: record.get(FAMILY_NAME).map(|v| v.to_string()),
            final_grade: record.number(FINAL_GRADE, row)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::tests::{make_student, make_table};
    use crate::model::{RegressionTree, TreeNode};
    use crate::types::FieldValue;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(
            [
                "studytime",
                "absences",
                "Mjob_health",
                "Mjob_teacher",
                "Total_Alcohol",
                "Party_Life",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        )
        .unwrap()
    }

    /// Predicts 14 for anyone with ideal alcohol and going-out levels, 6 otherwise
    fn party_forest() -> ForestModel {
        let tree = RegressionTree::new(vec![
            TreeNode::Split { feature: 5, threshold: 18.0, left: 1, right: 2 },
            TreeNode::Leaf { value: 14.0 },
            TreeNode::Leaf { value: 6.0 },
        ]);
        ForestModel::new(6, vec![tree]).unwrap()
    }

    fn grade(record: StudentRecord, value: f64) -> StudentRecord {
        let mut record = record;
        record.set(FINAL_GRADE, value);
        record
    }

    #[test]
    fn test_end_to_end_example() {
        let processor = DashboardProcessor::new(party_forest(), schema());
        let table = make_table();

        let rows = processor.dashboard(&table).unwrap();

        assert_eq!(rows.len(), 3);
        let first = &rows[0];
        assert_eq!(first.student_id, "1");
        assert_eq!(first.first_name.as_deref(), Some("Lina"));
        assert_eq!(first.family_name.as_deref(), Some("Moreau"));
        assert_eq!(first.final_grade, 10.0);
        assert_eq!(first.potential_grade, 14.0);
        assert!((first.improvability_margin - 4.0).abs() < 1e-9);
        assert!((first.complexity_score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_outperforming_student_is_clipped() {
        let processor = DashboardProcessor::new(party_forest(), schema());
        let table = StudentTable::from_records(vec![grade(make_student(7.0, "health", "home"), 18.0)]);

        let rows = processor.dashboard(&table).unwrap();
        assert_eq!(rows[0].potential_grade, 14.0);
        assert_eq!(rows[0].improvability_margin, 0.0);
        assert_eq!(rows[0].complexity_score, 1.0);
    }

    #[test]
    fn test_actual_grade_is_not_predicted() {
        struct Fixed(f64);
        impl Regressor for Fixed {
            fn n_features(&self) -> usize {
                6
            }
            fn predict_row(&self, _row: &[f64]) -> f64 {
                self.0
            }
        }

        let processor = DashboardProcessor::new(Fixed(3.0), schema());
        let table = StudentTable::from_records(vec![grade(make_student(1.0, "health", "home"), 12.0)]);
        let rows = processor.dashboard(&table).unwrap();
        assert_eq!(rows[0].final_grade, 12.0);
        assert_eq!(rows[0].potential_grade, 3.0);
    }

    #[test]
    fn test_model_sees_idealized_rows_only() {
        struct Recording(Arc<AtomicUsize>);
        impl Regressor for Recording {
            fn n_features(&self) -> usize {
                6
            }
            fn predict_row(&self, row: &[f64]) -> f64 {
                // studytime, absences, Total_Alcohol, Party_Life
                assert_eq!(row[0], 4.0);
                assert_eq!(row[1], 0.0);
                assert_eq!(row[4], 3.0);
                assert_eq!(row[5], 18.0);
                self.0.fetch_add(1, Ordering::SeqCst);
                10.0
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let processor = DashboardProcessor::new(Recording(calls.clone()), schema());
        processor.dashboard(&make_table()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_potential_grades_without_final_grade() {
        let processor = DashboardProcessor::new(party_forest(), schema());
        let mut table = make_table();
        table.columns.retain(|c| c != FINAL_GRADE);

        assert_eq!(processor.potential_grades(&table).unwrap(), vec![14.0; 3]);
        assert!(matches!(
            processor.dashboard(&table),
            Err(ComputeError::MissingField(f)) if f == FINAL_GRADE
        ));
    }

    #[test]
    fn test_rounding() {
        let tree = RegressionTree::leaf(13.456);
        let model = ForestModel::new(6, vec![tree]).unwrap();

        let rounded = DashboardProcessor::new(model.clone(), schema());
        assert_eq!(rounded.potential_grades(&make_table()).unwrap()[0], 13.46);

        let config = PipelineConfig {
            potential_decimals: None,
            ..Default::default()
        };
        let exact = DashboardProcessor::with_config(model, schema(), config);
        assert_eq!(exact.potential_grades(&make_table()).unwrap()[0], 13.456);
    }

    #[test]
    fn test_rounding_ties_flow_into_metrics() {
        let model = ForestModel::new(6, vec![RegressionTree::leaf(14.125)]).unwrap();
        let processor = DashboardProcessor::new(model, schema());

        let rows = processor.dashboard(&make_table()).unwrap();
        assert_eq!(rows[0].potential_grade, 14.12);
        assert!((rows[0].improvability_margin - 4.12).abs() < 1e-9);
        assert!((rows[0].complexity_score - 0.794).abs() < 1e-9);
    }

    #[test]
    fn test_schema_width_mismatch_fails_loudly() {
        let model = ForestModel::new(3, vec![RegressionTree::leaf(10.0)]).unwrap();
        let processor = DashboardProcessor::new(model, schema());
        assert!(matches!(
            processor.dashboard(&make_table()),
            Err(ComputeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_student_id_value() {
        let processor = DashboardProcessor::new(party_forest(), schema());
        let mut table = make_table();
        table.records[2].set(STUDENT_ID, FieldValue::Missing);

        let err = processor.dashboard(&table).unwrap_err();
        assert!(matches!(err, ComputeError::MissingField(f) if f.contains("row 2")));
    }

    #[test]
    fn test_all_or_nothing() {
        let processor = DashboardProcessor::new(party_forest(), schema());
        let mut table = make_table();
        table.records[1].set("romantic", "maybe");
        assert!(matches!(
            processor.dashboard(&table),
            Err(ComputeError::InvalidCategory { .. })
        ));
    }

    #[test]
    fn test_report() {
        let processor = DashboardProcessor::new(party_forest(), schema());
        let report = processor.report(&make_table()).unwrap();

        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.summary.students, 3);
        assert_eq!(report.summary.improvable_students, 3);
        assert_eq!(report.producer.run_id.get_version_num(), 4);

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        let run_id = json["producer"]["run_id"].as_str().unwrap();
        assert_eq!(Uuid::parse_str(run_id).unwrap(), report.producer.run_id);
        let computed_at = json["computed_at_utc"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(computed_at).is_ok());
    }

    #[test]
    fn test_processor_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DashboardProcessor>();
    }

    #[test]
    fn test_generate_dashboard_data_from_files() {
        let dir = std::env::temp_dir().join(format!("grade-potential-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        let data_path = dir.join("students.json");
        let model_path = dir.join("model.json");
        let schema_path = dir.join("model_features.json");

        std::fs::write(&data_path, serde_json::to_string(&make_table().records).unwrap()).unwrap();
        party_forest().save(&model_path).unwrap();
        schema().save(&schema_path).unwrap();

        let rows = generate_dashboard_data(&data_path, &model_path, &schema_path).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.potential_grade == 14.0));

        let missing = generate_dashboard_data(&data_path, &dir.join("nope.json"), &schema_path);
        assert!(matches!(missing, Err(ComputeError::ModelUnavailable(_))));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}

//! gradepot CLI - Command-line interface for Grade Potential
//!
//! Commands:
//! - score: Compute potential grades and dashboard metrics
//! - encode: Write the encoded feature table
//! - idealize: Write the ideal-habits copy of a table
//! - validate: Check a student table for problems
//! - doctor: Diagnose model and schema files
//! - schema: Print input or output column information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use grade_potential::adapters::{CsvSource, JsonRecordsSource, TableSource};
use grade_potential::encoder::FeatureEncoder;
use grade_potential::model::Regressor;
use grade_potential::schema::{required_feature_columns, NOMINAL_FIELDS, OUTPUT_COLUMNS};
use grade_potential::types::{FeatureTable, FrontendDashboardRow, StudentTable};
use grade_potential::validation::{validate_table, ValidationIssue};
use grade_potential::{
    DashboardProcessor, FeatureSchema, ForestModel, PipelineConfig, PRODUCER_NAME, VERSION,
};

/// gradepot - Potential grade inference for student support prioritization
#[derive(Parser)]
#[command(name = "gradepot")]
#[command(version = VERSION)]
#[command(about = "Estimate potential grades and prioritize student support", long_about = None)]
struct Cli {
    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute potential grades and dashboard metrics
    Score {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format (defaults to the file extension, CSV for stdin)
        #[arg(long)]
        input_format: Option<InputFormat>,

        /// Persisted forest model
        #[arg(long)]
        model: PathBuf,

        /// Persisted training column schema
        #[arg(long)]
        schema: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json")]
        format: OutputFormat,

        /// Rename fields for the web front end (ActualGrade, PotentialGrade, ComplexityScore)
        #[arg(long)]
        frontend_names: bool,

        /// Wrap rows with run metadata and summary metrics (JSON formats only)
        #[arg(long)]
        report: bool,

        /// Pipeline configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write the encoded feature table as CSV
    Encode {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long)]
        input_format: Option<InputFormat>,

        /// Reconcile columns to this training schema
        #[arg(long)]
        schema: Option<PathBuf>,

        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Write the ideal-habits copy of a table as CSV
    Idealize {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long)]
        input_format: Option<InputFormat>,

        /// Pipeline configuration file (JSON) with a custom ideal profile
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Check a student table for problems
    Validate {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long)]
        input_format: Option<InputFormat>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose model and schema files
    Doctor {
        #[arg(long)]
        model: Option<PathBuf>,

        #[arg(long)]
        schema: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print column information
    Schema {
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// Headed CSV file
    Csv,
    /// JSON array of flat records
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// JSON array of rows
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Newline-delimited JSON (one row per line)
    Ndjson,
    /// CSV with a header row
    Csv,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Raw input columns
    Input,
    /// Dashboard output columns
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), GradepotCliError> {
    match cli.command {
        Commands::Score {
            input,
            input_format,
            model,
            schema,
            output,
            format,
            frontend_names,
            report,
            config,
        } => cmd_score(
            &input,
            input_format,
            &model,
            &schema,
            &output,
            format,
            frontend_names,
            report,
            config.as_deref(),
        ),

        Commands::Encode {
            input,
            input_format,
            schema,
            output,
        } => cmd_encode(&input, input_format, schema.as_deref(), &output),

        Commands::Idealize {
            input,
            input_format,
            config,
            output,
        } => cmd_idealize(&input, input_format, config.as_deref(), &output),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { model, schema, json } => {
            cmd_doctor(model.as_deref(), schema.as_deref(), json)
        }

        Commands::Schema { schema_type } => cmd_schema(schema_type),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_score(
    input: &Path,
    input_format: Option<InputFormat>,
    model_path: &Path,
    schema_path: &Path,
    output: &Path,
    output_format: OutputFormat,
    frontend_names: bool,
    report: bool,
    config: Option<&Path>,
) -> Result<(), GradepotCliError> {
    let mut processor = DashboardProcessor::from_paths(model_path, schema_path)?;
    if let Some(config_path) = config {
        processor.set_config(PipelineConfig::load(config_path)?);
    }

    let table = read_table(input, input_format)?;
    if table.is_empty() {
        return Err(GradepotCliError::NoRecords);
    }

    let output_data = if report {
        let report = processor.report(&table)?;
        match output_format {
            OutputFormat::Json | OutputFormat::Ndjson => serde_json::to_string(&report)?,
            OutputFormat::JsonPretty => serde_json::to_string_pretty(&report)?,
            OutputFormat::Csv => return Err(GradepotCliError::ReportFormat),
        }
    } else {
        let rows = processor.dashboard(&table)?;
        if frontend_names {
            let renamed: Vec<FrontendDashboardRow> = rows.iter().map(FrontendDashboardRow::from).collect();
            format_rows(&renamed, output_format)?
        } else {
            format_rows(&rows, output_format)?
        }
    };

    info!(rows = table.len(), "scored student table");
    write_output(output, &output_data)
}

fn cmd_encode(
    input: &Path,
    input_format: Option<InputFormat>,
    schema: Option<&Path>,
    output: &Path,
) -> Result<(), GradepotCliError> {
    let table = read_table(input, input_format)?;
    let schema = schema.map(FeatureSchema::load).transpose()?;
    let encoded = FeatureEncoder::new().encode(&table, schema.as_ref())?;
    write_output(output, &feature_table_csv(&encoded)?)
}

fn cmd_idealize(
    input: &Path,
    input_format: Option<InputFormat>,
    config: Option<&Path>,
    output: &Path,
) -> Result<(), GradepotCliError> {
    let config = match config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let table = read_table(input, input_format)?;
    let ideal = config.ideal_profile.apply(&table);
    write_output(output, &student_table_csv(&ideal)?)
}

fn cmd_validate(
    input: &Path,
    input_format: Option<InputFormat>,
    json: bool,
) -> Result<(), GradepotCliError> {
    let table = read_table(input, input_format)?;
    let report = ValidationReport {
        total_records: table.len(),
        issues: validate_table(&table),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records: {}", report.total_records);
        println!("Issues:        {}", report.issues.len());

        if !report.issues.is_empty() {
            println!("\nIssues:");
            for issue in &report.issues {
                match issue.row {
                    Some(row) => println!("  - Row {} {}: {}", row, issue.field, issue.message),
                    None => println!("  - {}: {}", issue.field, issue.message),
                }
            }
        }
    }

    if report.issues.is_empty() {
        Ok(())
    } else {
        Err(GradepotCliError::ValidationFailed(report.issues.len()))
    }
}

fn cmd_doctor(model: Option<&Path>, schema: Option<&Path>, json: bool) -> Result<(), GradepotCliError> {
    let mut checks: Vec<DoctorCheck> = vec![DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} {}", PRODUCER_NAME, VERSION),
    }];

    let loaded_model = model.map(|path| match ForestModel::load(path) {
        Ok(model) => {
            checks.push(DoctorCheck {
                name: "model".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "{} trees over {} features",
                    model.trees().len(),
                    model.n_features()
                ),
            });
            Some(model)
        }
        Err(e) => {
            checks.push(DoctorCheck {
                name: "model".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            });
            None
        }
    });

    let loaded_schema = schema.map(|path| match FeatureSchema::load(path) {
        Ok(schema) => {
            let nominal = schema
                .columns()
                .iter()
                .filter(|c| NOMINAL_FIELDS.iter().any(|f| c.starts_with(&format!("{f}_"))))
                .count();
            checks.push(DoctorCheck {
                name: "schema".to_string(),
                status: CheckStatus::Ok,
                message: format!("{} columns ({} one-hot indicators)", schema.len(), nominal),
            });
            Some(schema)
        }
        Err(e) => {
            checks.push(DoctorCheck {
                name: "schema".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            });
            None
        }
    });

    if let (Some(Some(model)), Some(Some(schema))) = (&loaded_model, &loaded_schema) {
        let (status, message) = if model.n_features() != schema.len() {
            (
                CheckStatus::Error,
                format!(
                    "model expects {} features, schema lists {}",
                    model.n_features(),
                    schema.len()
                ),
            )
        } else {
            match model.feature_names() {
                Some(names) if names == schema.columns() => {
                    (CheckStatus::Ok, "model and schema agree".to_string())
                }
                Some(_) => (
                    CheckStatus::Error,
                    "model feature names differ from schema order".to_string(),
                ),
                None => (
                    CheckStatus::Warning,
                    "model carries no feature names, only the width was checked".to_string(),
                ),
            }
        };
        checks.push(DoctorCheck {
            name: "model_schema_agreement".to_string(),
            status,
            message,
        });
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass --input <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--input - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("gradepot Doctor Report");
        println!("======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(GradepotCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType) -> Result<(), GradepotCliError> {
    match schema_type {
        SchemaType::Input => {
            println!("Required input columns:");
            for column in required_feature_columns() {
                println!("  - {column}");
            }
            println!();
            println!("Dashboard runs also need StudentID and FinalGrade.");
            println!("FirstName and FamilyName are passed through when present.");
            println!("Nominal fields one-hot encoded as <field>_<level>: {}", NOMINAL_FIELDS.join(", "));
        }
        SchemaType::Output => {
            println!("Dashboard output columns:");
            for column in OUTPUT_COLUMNS {
                println!("  - {column}");
            }
            println!();
            println!("With --frontend-names: FinalGrade -> ActualGrade, Potential_Grade -> PotentialGrade,");
            println!("Complexity_Score -> ComplexityScore.");
        }
    }

    Ok(())
}

// Helper functions

fn read_table(input: &Path, format: Option<InputFormat>) -> Result<StudentTable, GradepotCliError> {
    let from_stdin = input.to_string_lossy() == "-";
    let format = format.unwrap_or_else(|| {
        let is_json = input
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json && !from_stdin {
            InputFormat::Json
        } else {
            InputFormat::Csv
        }
    });

    let table = if from_stdin {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        match format {
            InputFormat::Csv => CsvSource::from_text(buffer).load()?,
            InputFormat::Json => JsonRecordsSource::from_text(buffer).load()?,
        }
    } else {
        match format {
            InputFormat::Csv => CsvSource::from_path(input).load()?,
            InputFormat::Json => JsonRecordsSource::from_path(input).load()?,
        }
    };

    info!(rows = table.len(), columns = table.columns.len(), "read student table");
    Ok(table)
}

fn write_output(output: &Path, data: &str) -> Result<(), GradepotCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn format_rows<T: serde::Serialize>(rows: &[T], format: OutputFormat) -> Result<String, GradepotCliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(rows)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(rows)?),
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for row in rows {
                lines.push(serde_json::to_string(row)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            for row in rows {
                writer.serialize(row)?;
            }
            csv_to_string(writer)
        }
    }
}

fn feature_table_csv(table: &FeatureTable) -> Result<String, GradepotCliError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    csv_to_string(writer)
}

fn student_table_csv(table: &StudentTable) -> Result<String, GradepotCliError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for record in &table.records {
        writer.write_record(
            table
                .columns
                .iter()
                .map(|c| record.get(c).map(|v| v.to_string()).unwrap_or_default()),
        )?;
    }
    csv_to_string(writer)
}

fn csv_to_string(writer: csv::Writer<Vec<u8>>) -> Result<String, GradepotCliError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| GradepotCliError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| GradepotCliError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

// Error types

#[derive(Debug)]
enum GradepotCliError {
    Io(io::Error),
    Compute(grade_potential::ComputeError),
    Json(serde_json::Error),
    Csv(csv::Error),
    NoRecords,
    ReportFormat,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for GradepotCliError {
    fn from(e: io::Error) -> Self {
        GradepotCliError::Io(e)
    }
}

impl From<grade_potential::ComputeError> for GradepotCliError {
    fn from(e: grade_potential::ComputeError) -> Self {
        GradepotCliError::Compute(e)
    }
}

impl From<serde_json::Error> for GradepotCliError {
    fn from(e: serde_json::Error) -> Self {
        GradepotCliError::Json(e)
    }
}

impl From<csv::Error> for GradepotCliError {
    fn from(e: csv::Error) -> Self {
        GradepotCliError::Csv(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<GradepotCliError> for CliError {
    fn from(e: GradepotCliError) -> Self {
        use grade_potential::ComputeError as E;

        match e {
            GradepotCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            GradepotCliError::Compute(e) => {
                let (code, hint) = match &e {
                    E::MissingField(_) => ("MISSING_FIELD", "Run 'gradepot schema input' for the required columns"),
                    E::InvalidCategory { .. } | E::InvalidValue { .. } => {
                        ("INVALID_VALUE", "Run 'gradepot validate' for details")
                    }
                    E::ShapeMismatch { .. } => ("SHAPE_MISMATCH", "Check that the model and schema were saved together"),
                    E::DimensionMismatch { .. } => ("DIMENSION_MISMATCH", "Report this as a bug"),
                    E::ModelUnavailable(_) => ("MODEL_UNAVAILABLE", "Run 'gradepot doctor' on the model and schema"),
                    E::ConfigError(_) => ("CONFIG_ERROR", "Check the configuration file"),
                    E::ParseError(_) | E::Csv(_) | E::JsonError(_) => ("PARSE_ERROR", "Check input format"),
                    E::Io(_) => ("IO_ERROR", "Check file paths and permissions"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            GradepotCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            GradepotCliError::Csv(e) => CliError {
                code: "CSV_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            GradepotCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No student records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            GradepotCliError::ReportFormat => CliError {
                code: "REPORT_FORMAT".to_string(),
                message: "--report needs a JSON output format".to_string(),
                hint: Some("Use --format json or json-pretty".to_string()),
            },
            GradepotCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} validation issues found", count),
                hint: Some("Fix the listed issues and retry".to_string()),
            },
            GradepotCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    issues: Vec<ValidationIssue>,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

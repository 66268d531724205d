//! ACubed CLI - Command-line interface for the ACubed feature engine
//!
//! Commands:
//! - extract: Compute density features for a batch of charts
//! - validate: Validate chart documents without computing features
//! - config: Print the default engine configuration
//! - schema: Print input/output schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use acubed::adapters::{ChartPayloadAdapter, FfrAdapter};
use acubed::encoder::FEATURES_VERSION;
use acubed::pipeline::ChartProcessor;
use acubed::schema::{ChartAdapter, ChartDocument, SCHEMA_VERSION};
use acubed::types::FeaturePayload;
use acubed::{EngineConfig, ACUBED_VERSION};

/// ACubed - Automated difficulty features for rhythm game charts
#[derive(Parser)]
#[command(name = "acubed")]
#[command(version = ACUBED_VERSION)]
#[command(about = "Compute keytap density features for rhythm game charts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute density features for a batch of charts
    Extract {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Engine configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate chart documents
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Engine configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default engine configuration
    Config,

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one chart document per line)
    Ndjson,
    /// JSON array of chart documents
    Json,
    /// A single FFR API chart payload
    Ffr,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one feature payload per line)
    Ndjson,
    /// JSON array of feature payloads
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (acubed.chart.v1)
    Input,
    /// Output schema (acubed.features.v1)
    Output,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), AcubedCliError> {
    match cli.command {
        Commands::Extract {
            input,
            output,
            input_format,
            output_format,
            config,
        } => cmd_extract(
            &input,
            &output,
            input_format,
            output_format,
            config.as_deref(),
        ),

        Commands::Validate {
            input,
            input_format,
            config,
            json,
        } => cmd_validate(&input, input_format, config.as_deref(), json),

        Commands::Config => cmd_config(),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn cmd_extract(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: Option<&Path>,
) -> Result<(), AcubedCliError> {
    let processor = ChartProcessor::with_config(load_config(config)?)?;
    let documents = read_documents(input, &input_format)?;

    if documents.is_empty() {
        return Err(AcubedCliError::NoCharts);
    }

    let mut payloads: Vec<FeaturePayload> = Vec::new();
    let mut failed = 0;
    for outcome in processor.process_batch(&documents) {
        match outcome.result {
            Ok(payload) => payloads.push(payload),
            Err(_) => failed += 1,
        }
    }

    let output_data = format_output(&payloads, &output_format)?;

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    if failed > 0 {
        Err(AcubedCliError::ExtractFailed(failed))
    } else {
        Ok(())
    }
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    config: Option<&Path>,
    json: bool,
) -> Result<(), AcubedCliError> {
    let processor = ChartProcessor::with_config(load_config(config)?)?;
    let documents = read_documents(input, &input_format)?;

    // record-level problems first, then chord-level ones for the charts that
    // got past them
    let record_failures = ChartAdapter::validate_documents(&documents, processor.config().num_channels);
    let mut errors: Vec<ValidationErrorDetail> = record_failures
        .iter()
        .map(|r| ValidationErrorDetail {
            index: r.index,
            chart_id: r.chart_id.as_ref().map(|id| id.to_string()),
            record_index: Some(r.record_index),
            error: r.error.to_string(),
        })
        .collect();

    for (index, document) in documents.iter().enumerate() {
        if record_failures.iter().any(|r| r.index == index) {
            continue;
        }
        if let Err(e) = processor.build_stepfile(document) {
            errors.push(ValidationErrorDetail {
                index,
                chart_id: document.id.as_ref().map(|id| id.to_string()),
                record_index: None,
                error: e.to_string(),
            });
        }
    }
    errors.sort_by_key(|e| e.index);

    let report = ValidationReport {
        total_charts: documents.len(),
        valid_charts: documents.len() - errors.len(),
        invalid_charts: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total charts:   {}", report.total_charts);
        println!("Valid charts:   {}", report.valid_charts);
        println!("Invalid charts: {}", report.invalid_charts);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                let location = err
                    .record_index
                    .map(|r| format!(", record {}", r))
                    .unwrap_or_default();
                println!(
                    "  - Chart {} (index {}{}): {}",
                    err.chart_id.as_deref().unwrap_or("unknown"),
                    err.index,
                    location,
                    err.error
                );
            }
        }
    }

    if report.invalid_charts > 0 {
        Err(AcubedCliError::ValidationFailed(report.invalid_charts))
    } else {
        Ok(())
    }
}

fn cmd_config() -> Result<(), AcubedCliError> {
    println!("{}", EngineConfig::default().to_json()?);
    Ok(())
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), AcubedCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: {}", SCHEMA_VERSION);
                println!();
                println!("A chart document holds optional metadata and a list of keytap records:");
                println!();
                println!("- _id: Chart identifier (number or string)");
                println!("- name: Chart title");
                println!("- difficulty: Rated difficulty");
                println!("- chart: Array of {{ time, step }} records");
                println!("  - time: Seconds from chart start, finite and non-negative");
                println!("  - step: Binary mask, one character per receptor, '1' = pressed");
                println!();
                println!("With --input-format ffr, a single FFR API payload is read instead:");
                println!("  {{ level, name, difficulty, chart: [[beat, direction, color, time_ms], ...] }}");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: {}", FEATURES_VERSION);
                println!();
                println!("Each feature payload contains:");
                println!();
                println!("- schema_version");
                println!("- producer: {{ name, version, instance_id }}");
                println!("- provenance: {{ chart_id, chart_name, difficulty, computed_at_utc }}");
                println!("- stepfile: {{ id, num_notes, num_keytaps, num_channels }}");
                println!("- features.rows: One row per keytap");
                println!("  {{ timepoint, time, channel, vertical, horizontal, horizontal_sqrt, interaction }}");
                println!("- summary: {{ keytaps, file_length, columns: {{ column: {{ stat: value }} }} }}");
            }
        }
    }

    Ok(())
}

// Helper functions

fn load_config(path: Option<&Path>) -> Result<EngineConfig, AcubedCliError> {
    match path {
        Some(path) => Ok(EngineConfig::load(path)?),
        None => Ok(EngineConfig::default()),
    }
}

fn read_input(input: &Path) -> Result<String, AcubedCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            eprintln!("Reading charts from stdin (end with Ctrl-D)");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_documents(
    input: &Path,
    input_format: &InputFormat,
) -> Result<Vec<ChartDocument>, AcubedCliError> {
    let input_data = read_input(input)?;

    let documents = match input_format {
        InputFormat::Ndjson => ChartAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => ChartAdapter::parse_array(&input_data)?,
        InputFormat::Ffr => vec![FfrAdapter.parse(&input_data)?],
    };
    Ok(documents)
}

fn format_output(
    payloads: &[FeaturePayload],
    format: &OutputFormat,
) -> Result<String, AcubedCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for payload in payloads {
                lines.push(serde_json::to_string(payload)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(payloads)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(payloads)?),
    }
}

fn get_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": SCHEMA_VERSION,
        "description": "ACubed chart document",
        "type": "object",
        "required": ["chart"],
        "properties": {
            "_id": { "type": ["integer", "string"] },
            "name": { "type": "string" },
            "difficulty": { "type": "integer", "minimum": 0 },
            "chart": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["time", "step"],
                    "properties": {
                        "time": { "type": "number", "minimum": 0 },
                        "step": { "type": "string", "pattern": "^[01]+$" }
                    }
                }
            }
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": FEATURES_VERSION,
        "description": "ACubed feature payload",
        "type": "object",
        "required": ["schema_version", "producer", "provenance", "stepfile", "features", "summary"],
        "properties": {
            "schema_version": { "type": "string" },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string" }
                }
            },
            "provenance": {
                "type": "object",
                "properties": {
                    "chart_id": { "type": ["integer", "string", "null"] },
                    "chart_name": { "type": ["string", "null"] },
                    "difficulty": { "type": ["integer", "null"] },
                    "computed_at_utc": { "type": "string" }
                }
            },
            "stepfile": {
                "type": "object",
                "properties": {
                    "id": { "type": "string" },
                    "num_notes": { "type": "integer" },
                    "num_keytaps": { "type": "integer" },
                    "num_channels": { "type": "integer" }
                }
            },
            "features": {
                "type": "object",
                "properties": {
                    "rows": { "type": "array", "items": { "type": "object" } }
                }
            },
            "summary": {
                "type": "object",
                "properties": {
                    "keytaps": { "type": "integer" },
                    "file_length": { "type": "number" },
                    "columns": { "type": "object" }
                }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum AcubedCliError {
    Io(io::Error),
    Compute(acubed::ComputeError),
    Json(serde_json::Error),
    NoCharts,
    ExtractFailed(usize),
    ValidationFailed(usize),
}

impl From<io::Error> for AcubedCliError {
    fn from(e: io::Error) -> Self {
        AcubedCliError::Io(e)
    }
}

impl From<acubed::ComputeError> for AcubedCliError {
    fn from(e: acubed::ComputeError) -> Self {
        AcubedCliError::Compute(e)
    }
}

impl From<serde_json::Error> for AcubedCliError {
    fn from(e: serde_json::Error) -> Self {
        AcubedCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<AcubedCliError> for CliError {
    fn from(e: AcubedCliError) -> Self {
        match e {
            AcubedCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            AcubedCliError::Compute(acubed::ComputeError::ConfigError(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'acubed config' for a valid starting point".to_string()),
            },
            AcubedCliError::Compute(e) => CliError {
                code: "COMPUTE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches the {} schema", SCHEMA_VERSION)),
            },
            AcubedCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            AcubedCliError::NoCharts => CliError {
                code: "NO_CHARTS".to_string(),
                message: "No charts found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            AcubedCliError::ExtractFailed(count) => CliError {
                code: "EXTRACT_FAILED".to_string(),
                message: format!("{} charts could not be processed", count),
                hint: Some("Run 'acubed validate' for details".to_string()),
            },
            AcubedCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} charts failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_charts: usize,
    valid_charts: usize,
    invalid_charts: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    chart_id: Option<String>,
    record_index: Option<usize>,
    error: String,
}

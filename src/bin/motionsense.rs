//! Motionsense CLI - Command-line interface for the recognition engine
//!
//! Commands:
//! - replay: Run captured readings through the full pipeline (batch mode)
//! - filter: Denoise readings without classifying (tuning inspection)
//! - validate: Validate captured readings
//! - doctor: Diagnose engine health and configuration
//! - schema: Print schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use motionsense::encoder::ReportEncoder;
use motionsense::inference::{Classifier, WindowTensor};
use motionsense::pipeline::{ActivityEngine, EngineConfig};
use motionsense::types::{RawReading, ReportPayload, Sample};
use motionsense::{EngineError, ENGINE_VERSION, PRODUCER_NAME, REPORT_VERSION};

/// Motionsense - On-device activity recognition engine for accelerometer streams
#[derive(Parser)]
#[command(name = "motionsense")]
#[command(author = "Motionsense Contributors")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Classify physical activity from accelerometer captures", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run captured readings through the full pipeline (batch mode)
    Replay {
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

        /// Device ID for provenance tracking
        #[arg(long, default_value = "unknown")]
        device_id: String,

        /// Samples per classifier window
        #[arg(long, default_value = "150")]
        window_size: usize,

        /// Emit only every n-th prediction (1 = every full window)
        #[arg(long, default_value = "1")]
        every: usize,
    },

    /// Denoise readings without classifying (tuning inspection)
    Filter {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Process noise for all three axes
        #[arg(long, default_value = "0.0001")]
        process_noise: f64,

        /// Measurement noise for all three axes
        #[arg(long, default_value = "0.01")]
        measurement_noise: f64,
    },

    /// Validate captured readings
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose engine health and configuration
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

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
    /// Newline-delimited JSON (one reading per line)
    Ndjson,
    /// JSON array of readings
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (accelerometer readings)
    Input,
    /// Output schema (activity.prediction.v1)
    Output,
}

fn main() -> ExitCode {
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

fn run(cli: Cli) -> Result<(), MotionCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output,
            input_format,
            output_format,
            device_id,
            window_size,
            every,
        } => cmd_replay(
            &input,
            &output,
            input_format,
            output_format,
            &device_id,
            window_size,
            every,
        ),

        Commands::Filter {
            input,
            output,
            input_format,
            process_noise,
            measurement_noise,
        } => cmd_filter(&input, &output, input_format, process_noise, measurement_noise),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { json } => cmd_doctor(json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

/// Deterministic stand-in classifier for replays without a model backend.
///
/// Scores activities from the window's mean magnitude and variance. Coarse
/// by design: it exists to exercise the full pipeline offline, not to
/// approximate the trained model.
struct MagnitudeHeuristic;

impl Classifier for MagnitudeHeuristic {
    fn classify(&mut self, input: &WindowTensor) -> Result<Vec<f32>, EngineError> {
        let data = input.as_slice();
        let frames = input.shape()[1].max(1);

        let mut magnitudes = Vec::with_capacity(frames);
        for frame in data.chunks_exact(3) {
            let m = (frame[0] * frame[0] + frame[1] * frame[1] + frame[2] * frame[2]).sqrt();
            magnitudes.push(m);
        }

        let mean = magnitudes.iter().sum::<f32>() / frames as f32;
        let variance =
            magnitudes.iter().map(|m| (m - mean) * (m - mean)).sum::<f32>() / frames as f32;

        // Index order: Climbing Down, Climbing Up, Running, Sitting, Walking
        let scores = if variance < 0.05 {
            [0.02, 0.02, 0.01, 0.90, 0.05]
        } else if variance < 1.0 {
            [0.10, 0.10, 0.05, 0.10, 0.65]
        } else if mean > 6.0 {
            [0.05, 0.10, 0.70, 0.02, 0.13]
        } else {
            [0.35, 0.35, 0.10, 0.02, 0.18]
        };

        Ok(scores.to_vec())
    }
}

fn cmd_replay(
    input: &PathBuf,
    output: &PathBuf,
    input_format: InputFormat,
    output_format: OutputFormat,
    device_id: &str,
    window_size: usize,
    every: usize,
) -> Result<(), MotionCliError> {
    let readings = read_readings(input, &input_format)?;

    if readings.is_empty() {
        return Err(MotionCliError::NoReadings);
    }

    let config = EngineConfig {
        window_size,
        ..EngineConfig::default()
    };
    let mut engine = ActivityEngine::with_config(config, Box::new(MagnitudeHeuristic))?;
    let encoder = ReportEncoder::new();
    let every = every.max(1);

    let mut reports: Vec<ReportPayload> = Vec::new();
    let mut cycle = 0usize;

    for reading in &readings {
        let result = match engine.on_reading(reading) {
            Some(r) => r,
            None => continue,
        };

        cycle += 1;
        if cycle % every != 0 {
            continue;
        }

        reports.push(encoder.encode(&result, &engine.stats(), device_id, reading.timestamp));
    }

    let output_data = format_reports(&reports, &output_format)?;
    write_output(output, &output_data)?;

    Ok(())
}

/// One filtered reading in `filter` output
#[derive(serde::Serialize)]
struct FilteredRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<chrono::DateTime<chrono::Utc>>,
    raw: [f64; 3],
    filtered: Sample,
}

fn cmd_filter(
    input: &PathBuf,
    output: &PathBuf,
    input_format: InputFormat,
    process_noise: f64,
    measurement_noise: f64,
) -> Result<(), MotionCliError> {
    let readings = read_readings(input, &input_format)?;

    if readings.is_empty() {
        return Err(MotionCliError::NoReadings);
    }

    let config = EngineConfig {
        filter: motionsense::FilterConfig {
            process_noise,
            measurement_noise,
        },
        ..EngineConfig::default()
    };
    let mut engine = ActivityEngine::without_classifier(config)?;

    let mut lines: Vec<String> = Vec::new();
    for reading in &readings {
        engine.on_reading(reading);
        let record = FilteredRecord {
            timestamp: reading.timestamp,
            raw: reading.axes(),
            filtered: engine.filtered(),
        };
        lines.push(serde_json::to_string(&record)?);
    }

    write_output(output, &(lines.join("\n") + "\n"))?;

    Ok(())
}

fn cmd_validate(
    input: &PathBuf,
    input_format: InputFormat,
    json: bool,
) -> Result<(), MotionCliError> {
    let readings = read_readings(input, &input_format)?;

    let mut errors: Vec<ValidationErrorDetail> = Vec::new();
    for (index, reading) in readings.iter().enumerate() {
        if let Err(e) = reading.validate() {
            errors.push(ValidationErrorDetail {
                index,
                error: e.to_string(),
            });
        }
    }

    let report = ValidationReport {
        total_readings: readings.len(),
        valid_readings: readings.len() - errors.len(),
        invalid_readings: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total readings:   {}", report.total_readings);
        println!("Valid readings:   {}", report.valid_readings);
        println!("Invalid readings: {}", report.invalid_readings);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Reading {}: {}", err.index, err.error);
            }
        }
    }

    if report.invalid_readings > 0 {
        Err(MotionCliError::ValidationFailed(report.invalid_readings))
    } else {
        Ok(())
    }
}

fn cmd_doctor(json: bool) -> Result<(), MotionCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Motionsense version {}", ENGINE_VERSION),
    });

    checks.push(DoctorCheck {
        name: "report_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Output schema: {}", REPORT_VERSION),
    });

    let default_config = EngineConfig::default();
    checks.push(DoctorCheck {
        name: "window".to_string(),
        status: CheckStatus::Ok,
        message: format!(
            "Window {} samples, filter Q={} R={}",
            default_config.window_size,
            default_config.filter.process_noise,
            default_config.filter.measurement_noise
        ),
    });

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (capture replay ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Motionsense Doctor Report");
        println!("=========================");
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

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(MotionCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), MotionCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: accelerometer readings");
                println!();
                println!("One reading per record:");
                println!();
                println!("- timestamp: RFC 3339 capture time (optional)");
                println!("- x, y, z:   linear acceleration in m/s² (required, finite)");
                println!();
                println!("Readings must come from one sensor kind per session; mixing");
                println!("linear acceleration and raw accelerometer data biases the");
                println!("filter and window.");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: {}", REPORT_VERSION);
                println!();
                println!("Each prediction report contains:");
                println!();
                println!("- report_version: Schema version");
                println!("- producer: {{ name, version, instance_id }}");
                println!("- provenance: {{ source_device_id, observed_at_utc, computed_at_utc }}");
                println!("- quality: {{ coverage, freshness_sec, confidence, flags }}");
                println!("- prediction:");
                println!("  - label: winning activity");
                println!("  - confidence: winning probability");
                println!("  - distribution: all five activities in training order");
            }
        }
    }

    Ok(())
}

// Helper functions

fn read_readings(
    input: &PathBuf,
    input_format: &InputFormat,
) -> Result<Vec<RawReading>, MotionCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(MotionCliError::Engine(EngineError::SensorUnavailable(
                "stdin is a TTY; pipe a capture or pass --input <file>".to_string(),
            )));
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    match input_format {
        InputFormat::Ndjson => {
            let mut readings = Vec::new();
            for (number, line) in input_data.lines().enumerate() {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let reading: RawReading = serde_json::from_str(trimmed).map_err(|e| {
                    MotionCliError::ParseError(format!("line {}: {}", number + 1, e))
                })?;
                readings.push(reading);
            }
            Ok(readings)
        }
        InputFormat::Json => Ok(serde_json::from_str(&input_data)?),
    }
}

fn format_reports(
    reports: &[ReportPayload],
    format: &OutputFormat,
) -> Result<String, MotionCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for report in reports {
                lines.push(serde_json::to_string(report)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(reports)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(reports)?),
    }
}

fn write_output(output: &PathBuf, data: &str) -> Result<(), MotionCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn get_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "accelerometer reading",
        "description": "One raw linear-acceleration triple",
        "type": "object",
        "required": ["x", "y", "z"],
        "properties": {
            "timestamp": { "type": "string", "format": "date-time" },
            "x": { "type": "number" },
            "y": { "type": "number" },
            "z": { "type": "number" }
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "activity.prediction.v1",
        "description": "Motionsense prediction report schema",
        "type": "object",
        "required": ["report_version", "producer", "provenance", "quality", "prediction"],
        "properties": {
            "report_version": { "type": "string" },
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
                    "source_device_id": { "type": "string" },
                    "observed_at_utc": { "type": "string" },
                    "computed_at_utc": { "type": "string" }
                }
            },
            "quality": {
                "type": "object",
                "properties": {
                    "coverage": { "type": "number" },
                    "freshness_sec": { "type": "integer" },
                    "confidence": { "type": "number" },
                    "flags": { "type": "array", "items": { "type": "string" } }
                }
            },
            "prediction": {
                "type": "object",
                "properties": {
                    "label": {
                        "type": "string",
                        "enum": ["climbing_down", "climbing_up", "running", "sitting", "walking"]
                    },
                    "confidence": { "type": "number" },
                    "distribution": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "label": { "type": "string" },
                                "probability": { "type": "number" }
                            }
                        }
                    }
                }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum MotionCliError {
    Io(io::Error),
    Engine(EngineError),
    Json(serde_json::Error),
    NoReadings,
    ValidationFailed(usize),
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for MotionCliError {
    fn from(e: io::Error) -> Self {
        MotionCliError::Io(e)
    }
}

impl From<EngineError> for MotionCliError {
    fn from(e: EngineError) -> Self {
        MotionCliError::Engine(e)
    }
}

impl From<serde_json::Error> for MotionCliError {
    fn from(e: serde_json::Error) -> Self {
        MotionCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<MotionCliError> for CliError {
    fn from(e: MotionCliError) -> Self {
        match e {
            MotionCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            MotionCliError::Engine(e) => CliError {
                code: "ENGINE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            MotionCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            MotionCliError::NoReadings => CliError {
                code: "NO_READINGS".to_string(),
                message: "No readings found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            MotionCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} readings failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            MotionCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            MotionCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_readings: usize,
    valid_readings: usize,
    invalid_readings: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    error: String,
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

//! attn CLI - Command-line interface for the attention monitor
//!
//! Commands:
//! - replay: Replay recorded landmark frames into stats records (batch mode)
//! - run: Process streaming frames from stdin (streaming mode)
//! - validate: Validate landmark frame records
//! - doctor: Diagnose configuration and environment
//! - schema: Print schema information

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use attention_monitor::encoder::{StatsEncoder, STATS_SCHEMA_VERSION};
use attention_monitor::schema::{FrameEventAdapter, SCHEMA_VERSION};
use attention_monitor::source::{LandmarkSource, MemorySource, NdjsonSource};
use attention_monitor::types::{format_hms, SessionSummary, StatsPayload, StatsRecord};
use attention_monitor::{MonitorConfig, ReplayDriver, Thresholds, MONITOR_VERSION, PRODUCER_NAME};

/// attn - Screen attention monitoring from facial landmarks
#[derive(Parser)]
#[command(name = "attn")]
#[command(version = MONITOR_VERSION)]
#[command(about = "Turn face-mesh landmark frames into attention statistics", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded frames into stats records (batch mode)
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

        #[command(flatten)]
        monitor: MonitorArgs,

        /// Write the session summary to this file
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Process streaming frames from stdin (streaming mode)
    Run {
        #[command(flatten)]
        monitor: MonitorArgs,

        /// Write the session summary to this file on exit
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Flush output after each record
        #[arg(long, default_value = "true")]
        flush: bool,
    },

    /// Validate landmark frame records
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

    /// Diagnose configuration and environment
    Doctor {
        /// Check a monitor configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

/// Monitor settings shared by replay and run
#[derive(Args)]
struct MonitorArgs {
    /// Monitor configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the face threshold
    #[arg(long)]
    face_threshold: Option<f64>,

    /// Override the eye threshold
    #[arg(long)]
    eye_threshold: Option<f64>,

    /// Override the record emit interval in milliseconds (0 emits every tick)
    #[arg(long)]
    emit_interval_ms: Option<i64>,

    /// Fixed session identifier (random if omitted)
    #[arg(long)]
    session_id: Option<String>,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one frame per line)
    Ndjson,
    /// JSON array of frames
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one stats record per line)
    Ndjson,
    /// JSON array of stats records
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (attn.landmark_frame.v1)
    Input,
    /// Output schema (attn.stats.v1)
    Output,
    /// Monitor configuration
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(default_level));

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

fn run(cli: Cli) -> Result<(), AttnCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output,
            input_format,
            output_format,
            monitor,
            summary,
        } => cmd_replay(
            &input,
            &output,
            input_format,
            output_format,
            &monitor,
            summary.as_deref(),
        ),

        Commands::Run {
            monitor,
            summary,
            flush,
        } => cmd_run(&monitor, summary.as_deref(), flush),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn cmd_replay(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    args: &MonitorArgs,
    summary_path: Option<&Path>,
) -> Result<(), AttnCliError> {
    let config = load_config(args)?;
    let input_data = read_input(input)?;

    let events = match input_format {
        InputFormat::Ndjson => FrameEventAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => FrameEventAdapter::parse_array(&input_data)?,
    };

    if events.is_empty() {
        return Err(AttnCliError::NoFrames);
    }

    let frames = FrameEventAdapter::to_frames(&events)?;
    let mut driver = build_driver(config, args)?;
    let replay = driver.run(&mut MemorySource::new(frames))?;

    let encoder = StatsEncoder::new();
    let payloads = replay
        .records
        .iter()
        .map(|record| encoder.encode_stats(record))
        .collect::<Result<Vec<StatsPayload>, _>>()?;

    let output_data = format_output(&payloads, &output_format)?;
    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    if let Some(summary) = replay.summary {
        finish_summary(&encoder, &summary, summary_path)?;
    }

    Ok(())
}

fn cmd_run(args: &MonitorArgs, summary_path: Option<&Path>, flush: bool) -> Result<(), AttnCliError> {
    let config = load_config(args)?;
    let mut driver = build_driver(config, args)?;
    let encoder = StatsEncoder::new();

    let stdin = io::stdin();
    let mut source = NdjsonSource::new(stdin.lock());
    let mut stdout = io::stdout();

    while let Some(frame) = source.next_frame() {
        for record in driver.push_frame(frame?)? {
            write_record(&mut stdout, &encoder, &record, flush)?;
        }
    }

    let (tail, summary) = driver.finish();
    for record in &tail {
        write_record(&mut stdout, &encoder, record, flush)?;
    }
    stdout.flush()?;

    match summary {
        Some(summary) => finish_summary(&encoder, &summary, summary_path),
        None => Err(AttnCliError::NoFrames),
    }
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), AttnCliError> {
    let input_data = read_input(input)?;

    let events = match input_format {
        InputFormat::Ndjson => FrameEventAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => FrameEventAdapter::parse_array(&input_data)?,
    };

    let results = FrameEventAdapter::validate_events(&events);
    let with_face = events.iter().filter(|e| e.has_face()).count();

    let report = ValidationReport {
        total_frames: events.len(),
        frames_with_face: with_face,
        valid_frames: events.len() - results.len(),
        invalid_frames: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                frame_id: r.frame_id.clone(),
                error: r.result.as_ref().map(|e| e.to_string()).unwrap_or_default(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total frames:     {}", report.total_frames);
        println!("Frames with face: {}", report.frames_with_face);
        println!("Valid frames:     {}", report.valid_frames);
        println!("Invalid frames:   {}", report.invalid_frames);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Frame {} (index {}): {}",
                    err.frame_id.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.invalid_frames > 0 {
        Err(AttnCliError::ValidationFailed(report.invalid_frames))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), AttnCliError> {
    let mut checks: Vec<DoctorCheck> = vec![
        DoctorCheck {
            name: "monitor_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("attention-monitor version {}", MONITOR_VERSION),
        },
        DoctorCheck {
            name: "schema_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Input schema: {}, output schema: {}", SCHEMA_VERSION, STATS_SCHEMA_VERSION),
        },
    ];

    if let Some(config_path) = config {
        checks.push(check_config_file(config_path));
    }

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
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: MONITOR_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("attn Doctor Report");
        println!("==================");
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
        Err(AttnCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_config_file(path: &Path) -> DoctorCheck {
    let (status, message) = if !path.exists() {
        (CheckStatus::Warning, "Config file does not exist".to_string())
    } else {
        match fs::read_to_string(path).map(|content| MonitorConfig::from_json(&content)) {
            Ok(Ok(config)) => (
                CheckStatus::Ok,
                format!(
                    "Config valid (face {:.2}, eye {:.2}, alert after {}ms, window {}ms)",
                    config.thresholds.face,
                    config.thresholds.eye,
                    config.alert_delay_ms,
                    config.hysteresis_window_ms
                ),
            ),
            Ok(Err(e)) => (CheckStatus::Error, format!("Invalid config: {}", e)),
            Err(e) => (CheckStatus::Error, format!("Cannot read config file: {}", e)),
        }
    };

    DoctorCheck {
        name: "config".to_string(),
        status,
        message,
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), AttnCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: {}", SCHEMA_VERSION);
                println!();
                println!("One record per detector frame, time-ordered:");
                println!();
                println!("- schema_version, timestamp (RFC 3339), optional frame_id and source");
                println!("- face_detected: optional; inferred from the presence of points");
                println!("- landmarks: named points (nose_tip, forehead, chin, left_cheek,");
                println!("  right_cheek, left_eye, right_eye, left_iris, right_iris)");
                println!("  where each eye has left/right/top/bottom corners");
                println!("- mesh: alternatively the full face-mesh array of {{ x, y }} points");
                println!("  (refined iris points required)");
                println!();
                println!("Coordinates are normalized image coordinates.");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: {}", STATS_SCHEMA_VERSION);
                println!();
                println!("- schema_version");
                println!("- producer: {{ name, version, instance_id }}");
                println!("- stats:");
                println!("  - timestamp, session_id, is_attentive");
                println!("  - face_detected, face_looking, eyes_looking");
                println!("  - session_time, attention_time, distraction_duration (seconds)");
                println!("  - attention_percentage");
                println!("  - nose_offset_x/y, avg_eye_gaze_x/y");
                println!("  - alert");
            }
        }
        SchemaType::Config => {
            let defaults = MonitorConfig::default();
            if json_schema {
                println!("{}", get_config_json_schema());
            } else {
                println!("Monitor configuration (JSON, every field optional):");
                println!();
                println!("{}", defaults.to_json()?);
            }
        }
    }

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, AttnCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn load_config(args: &MonitorArgs) -> Result<MonitorConfig, AttnCliError> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("loading configuration from {}", path.display());
            MonitorConfig::from_json(&fs::read_to_string(path)?)?
        }
        None => MonitorConfig::default(),
    };

    if args.face_threshold.is_some() || args.eye_threshold.is_some() {
        config.thresholds = Thresholds::new(
            args.face_threshold.unwrap_or(config.thresholds.face),
            args.eye_threshold.unwrap_or(config.thresholds.eye),
        )?;
    }
    if let Some(emit_interval_ms) = args.emit_interval_ms {
        config.emit_interval_ms = emit_interval_ms;
    }

    config.validate()?;
    Ok(config)
}

fn build_driver(config: MonitorConfig, args: &MonitorArgs) -> Result<ReplayDriver, AttnCliError> {
    let driver = ReplayDriver::new(config)?;
    Ok(match &args.session_id {
        Some(id) => driver.with_session_id(id.clone()),
        None => driver,
    })
}

fn write_record(
    out: &mut impl Write,
    encoder: &StatsEncoder,
    record: &StatsRecord,
    flush: bool,
) -> Result<(), AttnCliError> {
    writeln!(out, "{}", encoder.encode_stats_to_json(record)?)?;
    if flush {
        out.flush()?;
    }
    Ok(())
}

fn finish_summary(
    encoder: &StatsEncoder,
    summary: &SessionSummary,
    path: Option<&Path>,
) -> Result<(), AttnCliError> {
    log::info!(
        "session time {}, attentive {} ({:.1}%)",
        format_hms(summary.total_time_sec),
        format_hms(summary.attention_time_sec),
        summary.attention_pct
    );

    if let Some(path) = path {
        fs::write(path, encoder.encode_summary_to_json(summary)?)?;
    }
    Ok(())
}

fn format_output(payloads: &[StatsPayload], format: &OutputFormat) -> Result<String, AttnCliError> {
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

fn point_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "required": ["x", "y"],
        "properties": {
            "x": { "type": "number" },
            "y": { "type": "number" }
        }
    })
}

fn get_input_json_schema() -> String {
    let point = point_schema();
    let eye = serde_json::json!({
        "type": "object",
        "required": ["left", "right", "top", "bottom"],
        "properties": {
            "left": point, "right": point, "top": point, "bottom": point
        }
    });

    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": SCHEMA_VERSION,
        "description": "Face landmark frame record",
        "type": "object",
        "required": ["schema_version", "timestamp"],
        "properties": {
            "schema_version": { "type": "string", "const": SCHEMA_VERSION },
            "frame_id": { "type": "string" },
            "timestamp": { "type": "string", "format": "date-time" },
            "source": {
                "type": "object",
                "properties": {
                    "detector": { "type": "string" },
                    "device_id": { "type": "string" }
                }
            },
            "face_detected": { "type": "boolean" },
            "landmarks": {
                "type": "object",
                "required": [
                    "nose_tip", "forehead", "chin", "left_cheek", "right_cheek",
                    "left_eye", "right_eye", "left_iris", "right_iris"
                ],
                "properties": {
                    "nose_tip": point,
                    "forehead": point,
                    "chin": point,
                    "left_cheek": point,
                    "right_cheek": point,
                    "left_eye": eye,
                    "right_eye": eye,
                    "left_iris": point,
                    "right_iris": point
                }
            },
            "mesh": { "type": "array", "items": point }
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": STATS_SCHEMA_VERSION,
        "description": "Attention statistics record",
        "type": "object",
        "required": ["schema_version", "producer", "stats"],
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
            "stats": {
                "type": "object",
                "properties": {
                    "timestamp": { "type": "string", "format": "date-time" },
                    "session_id": { "type": "string" },
                    "is_attentive": { "type": "boolean" },
                    "face_detected": { "type": "boolean" },
                    "face_looking": { "type": "boolean" },
                    "eyes_looking": { "type": "boolean" },
                    "session_time": { "type": "number", "minimum": 0 },
                    "attention_time": { "type": "number", "minimum": 0 },
                    "attention_percentage": { "type": "number", "minimum": 0, "maximum": 100 },
                    "distraction_duration": { "type": "number", "minimum": 0 },
                    "nose_offset_x": { "type": "number" },
                    "nose_offset_y": { "type": "number" },
                    "avg_eye_gaze_x": { "type": "number" },
                    "avg_eye_gaze_y": { "type": "number" },
                    "alert": { "type": "boolean" }
                }
            }
        }
    })
    .to_string()
}

fn get_config_json_schema() -> String {
    let threshold = serde_json::json!({ "type": "number", "exclusiveMinimum": 0, "exclusiveMaximum": 1 });
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "attention monitor configuration",
        "type": "object",
        "properties": {
            "thresholds": {
                "type": "object",
                "properties": { "face": threshold, "eye": threshold }
            },
            "alert_delay_ms": { "type": "integer", "minimum": 0 },
            "hysteresis_window_ms": { "type": "integer", "minimum": 0 },
            "tick_interval_ms": { "type": "integer", "exclusiveMinimum": 0 },
            "emit_interval_ms": { "type": "integer", "minimum": 0 }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum AttnCliError {
    Io(io::Error),
    Compute(attention_monitor::ComputeError),
    Json(serde_json::Error),
    NoFrames,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for AttnCliError {
    fn from(e: io::Error) -> Self {
        AttnCliError::Io(e)
    }
}

impl From<attention_monitor::ComputeError> for AttnCliError {
    fn from(e: attention_monitor::ComputeError) -> Self {
        AttnCliError::Compute(e)
    }
}

impl From<serde_json::Error> for AttnCliError {
    fn from(e: serde_json::Error) -> Self {
        AttnCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<AttnCliError> for CliError {
    fn from(e: AttnCliError) -> Self {
        use attention_monitor::ComputeError;

        match e {
            AttnCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            AttnCliError::Compute(
                e @ (ComputeError::InvalidConfig(_) | ComputeError::InvalidThreshold(_)),
            ) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'attn schema config' for the accepted fields".to_string()),
            },
            AttnCliError::Compute(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches {} schema", SCHEMA_VERSION)),
            },
            AttnCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            AttnCliError::NoFrames => CliError {
                code: "NO_FRAMES".to_string(),
                message: "No frames found in input".to_string(),
                hint: Some("Ensure input is not empty".to_string()),
            },
            AttnCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} frames failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            AttnCliError::DoctorFailed => CliError {
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
    total_frames: usize,
    frames_with_face: usize,
    valid_frames: usize,
    invalid_frames: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    frame_id: Option<String>,
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
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use attention_monitor::schema::FrameEvent;
    use attention_monitor::types::LandmarkFrame;
    use chrono::{TimeDelta, TimeZone, Utc};

    fn monitor_args() -> MonitorArgs {
        MonitorArgs {
            config: None,
            face_threshold: None,
            eye_threshold: None,
            emit_interval_ms: None,
            session_id: None,
        }
    }

    #[test]
    fn test_load_config_applies_overrides() {
        let args = MonitorArgs {
            eye_threshold: Some(0.3),
            emit_interval_ms: Some(0),
            ..monitor_args()
        };

        let config = load_config(&args).unwrap();
        assert_eq!(config.thresholds.face, 0.31);
        assert_eq!(config.thresholds.eye, 0.3);
        assert_eq!(config.emit_interval_ms, 0);
    }

    #[test]
    fn test_load_config_rejects_bad_threshold() {
        let args = MonitorArgs {
            face_threshold: Some(1.2),
            ..monitor_args()
        };
        assert!(matches!(load_config(&args), Err(AttnCliError::Compute(_))));
    }

    #[test]
    fn test_format_output_ndjson() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        let ndjson: String = (0..=10)
            .map(|i| {
                let event = FrameEvent::face(t0 + TimeDelta::milliseconds(i * 100), LandmarkFrame::centered());
                serde_json::to_string(&event).unwrap() + "\n"
            })
            .collect();

        let events = FrameEventAdapter::parse_ndjson(&ndjson).unwrap();
        let frames = FrameEventAdapter::to_frames(&events).unwrap();
        let mut driver = ReplayDriver::new(MonitorConfig::default()).unwrap();
        let replay = driver.run(&mut MemorySource::new(frames)).unwrap();

        let encoder = StatsEncoder::with_instance_id("cli-test".to_string());
        let payloads: Vec<StatsPayload> = replay
            .records
            .iter()
            .map(|r| encoder.encode_stats(r).unwrap())
            .collect();

        let output = format_output(&payloads, &OutputFormat::Ndjson).unwrap();
        assert_eq!(output.lines().count(), payloads.len());
        assert!(output.ends_with('\n'));
    }

    #[test]
    fn test_cli_error_codes() {
        let err = CliError::from(AttnCliError::Compute(
            attention_monitor::ComputeError::InvalidConfig("bad".to_string()),
        ));
        assert_eq!(err.code, "CONFIG_ERROR");

        let err = CliError::from(AttnCliError::NoFrames);
        assert_eq!(err.code, "NO_FRAMES");
    }
}

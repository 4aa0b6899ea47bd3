//! Lactate CLI - Command-line interface for Lactate Zones
//!
//! Commands:
//! - calculate: Compute thresholds and training zones from a step table
//! - validate: Check which rows of a step table are usable
//! - schema: Print the input table layout for each protocol mode

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lactate_zones::encoder::{ReportEncoder, ThresholdReport};
use lactate_zones::normalizer::Normalizer;
use lactate_zones::schema::{StepTableAdapter, StepTest, SCHEMA_VERSION};
use lactate_zones::{ComputeError, EngineConfig, ProtocolMode, ThresholdEngine};
use lactate_zones::{ENGINE_VERSION, PRODUCER_NAME};

/// Lactate - Threshold and training-zone engine for step tests
#[derive(Parser)]
#[command(name = "lactate")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Compute lactate thresholds and training zones from step tests", long_about = None)]
struct Cli {
    /// Log filter (e.g. "debug", "lactate_zones=trace"); defaults to RUST_LOG or "warn"
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute thresholds and training zones
    Calculate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Protocol mode (overrides the mode stored in the document)
        #[arg(long)]
        mode: Option<ModeArg>,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,

        /// Engine configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check which rows of a step table are usable
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Protocol mode (overrides the mode stored in the document)
        #[arg(long)]
        mode: Option<ModeArg>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the input table layout
    Schema {
        /// Only print this protocol mode
        #[arg(long)]
        mode: Option<ModeArg>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Session document or JSON array of steps
    Json,
    /// Newline-delimited JSON (one step per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Versioned report on one line
    Json,
    /// Pretty-printed report
    JsonPretty,
    /// Bare result bundle without the report envelope
    Bundle,
    /// Human readable summary and zone table
    Text,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Heart-rate based protocol
    Hr,
    /// Speed based protocol
    Speed,
    /// Stroke-rate based protocol
    Sr,
}

impl From<ModeArg> for ProtocolMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Hr => ProtocolMode::HeartRate,
            ModeArg::Speed => ProtocolMode::Speed,
            ModeArg::Sr => ProtocolMode::StrokeRate,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match run(cli.command) {
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

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn run(command: Commands) -> Result<(), LactateCliError> {
    match command {
        Commands::Calculate {
            input,
            output,
            input_format,
            mode,
            output_format,
            config,
        } => cmd_calculate(
            &input,
            &output,
            input_format,
            mode,
            output_format,
            config.as_deref(),
        ),

        Commands::Validate {
            input,
            input_format,
            mode,
            json,
        } => cmd_validate(&input, input_format, mode, json),

        Commands::Schema { mode, json } => cmd_schema(mode, json),
    }
}

fn cmd_calculate(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    mode: Option<ModeArg>,
    output_format: OutputFormat,
    config: Option<&Path>,
) -> Result<(), LactateCliError> {
    let document = read_document(input, input_format, mode)?;

    let engine = match config {
        Some(path) => {
            let config = EngineConfig::from_json(&fs::read_to_string(path)?)?;
            ThresholdEngine::with_config(config)?
        }
        None => ThresholdEngine::new(),
    };

    let bundle = engine.calculate(&document.steps, document.mode)?;
    info!(
        mode = document.mode.as_str(),
        rows = document.steps.len(),
        points = bundle.parsed_data.len(),
        "calculated step test"
    );

    let report = ReportEncoder::new().encode(
        &bundle,
        document.session.as_ref(),
        document.steps.len(),
    );

    let output_data = match output_format {
        OutputFormat::Json => serde_json::to_string(&report)? + "\n",
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&report)? + "\n",
        OutputFormat::Bundle => serde_json::to_string_pretty(&report.result)? + "\n",
        OutputFormat::Text => format_text(&report),
    };

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    mode: Option<ModeArg>,
    json: bool,
) -> Result<(), LactateCliError> {
    let document = read_document(input, input_format, mode)?;
    let required = EngineConfig::default().min_points;
    let (_, summary) = Normalizer::normalize_with_summary(&document.steps, document.mode);

    let report = ValidationReport {
        mode: document.mode.as_str().to_string(),
        total_rows: summary.total_rows,
        valid_rows: summary.retained_rows,
        rejected_rows: summary.rejected_rows(),
        required_points: required,
        has_stroke_rate: summary.has_stroke_rate,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Mode:            {}", document.mode.label());
        println!("Total rows:      {}", report.total_rows);
        println!("Valid rows:      {}", report.valid_rows);
        println!("Rejected rows:   {}", report.rejected_rows);
        println!(
            "Stroke rate:     {}",
            if report.has_stroke_rate {
                "present (efficiency available)"
            } else {
                "missing (efficiency skipped)"
            }
        );
    }

    if report.valid_rows < required {
        Err(LactateCliError::ValidationFailed {
            found: report.valid_rows,
            required,
        })
    } else {
        Ok(())
    }
}

fn cmd_schema(mode: Option<ModeArg>, json: bool) -> Result<(), LactateCliError> {
    let modes: Vec<ProtocolMode> = match mode {
        Some(mode) => vec![mode.into()],
        None => ProtocolMode::ALL.to_vec(),
    };

    if json {
        let layouts: Vec<serde_json::Value> = modes
            .iter()
            .map(|mode| {
                serde_json::json!({
                    "mode": mode.as_str(),
                    "label": mode.label(),
                    "columns": mode.column_headers(),
                })
            })
            .collect();
        let schema = serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "layouts": layouts,
        });
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    println!("Input Schema: {}", SCHEMA_VERSION);
    println!();
    println!("A document is {{ mode, session?, steps: [...] }}; a bare array of steps");
    println!("or NDJSON (one step per line) is also accepted.");
    println!("Step fields: step, planned, achieved, secondary, lactate, stroke_rate, time");
    println!("Cells may be numbers or text; empty cells and \"Max\" are ignored.");

    for mode in modes {
        println!();
        println!("{} ({})", mode.label(), mode.as_str());
        for (i, header) in mode.column_headers().iter().enumerate() {
            println!("  {}. {}", i + 1, header);
        }
    }

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, LactateCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(LactateCliError::NoInput);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_document(
    input: &Path,
    input_format: InputFormat,
    mode: Option<ModeArg>,
) -> Result<StepTest, LactateCliError> {
    let input_data = read_input(input)?;

    let mut document = match input_format {
        InputFormat::Json => StepTableAdapter::parse_json(&input_data)?,
        InputFormat::Ndjson => StepTest {
            steps: StepTableAdapter::parse_ndjson(&input_data)?,
            ..Default::default()
        },
    };

    if let Some(mode) = mode {
        document.mode = mode.into();
    }

    if document.steps.is_empty() {
        return Err(LactateCliError::NoSteps);
    }

    Ok(document)
}

fn format_text(report: &ThresholdReport) -> String {
    let bundle = &report.result;
    let mut out = String::new();

    let _ = writeln!(out, "Lactate Threshold Report ({} {})", PRODUCER_NAME, ENGINE_VERSION);
    let _ = writeln!(out, "========================");
    if let Some(session) = &report.session {
        if !session.athlete_name.is_empty() {
            let _ = writeln!(out, "Athlete:   {}", session.athlete_name);
        }
        if let Some(date) = session.test_date {
            let _ = writeln!(out, "Test date: {}", date);
        }
    }
    let _ = writeln!(out, "Protocol:  {}", bundle.mode.label());
    let _ = writeln!(
        out,
        "Points:    {} of {} rows",
        report.provenance.validated_points, report.provenance.input_rows
    );

    let _ = writeln!(out, "\nCurves");
    let _ = writeln!(
        out,
        "  Lactate:    {}  (R² {:.3})",
        bundle.regressions.lactate.equation(),
        bundle.regressions.lactate.r2
    );
    let _ = writeln!(
        out,
        "  Heart rate: {}  (R² {:.3})",
        bundle.regressions.hr.equation(),
        bundle.regressions.hr.r2
    );

    let _ = writeln!(out, "\nThresholds");
    for (name, threshold) in [
        ("LT1", &bundle.display_thresholds.lt1),
        ("LT2", &bundle.display_thresholds.lt2),
    ] {
        let _ = writeln!(
            out,
            "  {}: {} m/s, {} mmol/L, {} bpm",
            name, threshold.speed, threshold.lactate, threshold.heart_rate
        );
    }

    let _ = writeln!(out, "\nFixed lactate points");
    for point in &bundle.fixed_lactate_points {
        let _ = writeln!(
            out,
            "  {} mmol/L: {} m/s, {} bpm",
            point.target_mmol, point.speed, point.heart_rate
        );
    }

    if let Some(efficiency) = &bundle.efficiency_data {
        let _ = writeln!(out, "\nEfficiency");
        for point in efficiency {
            let _ = writeln!(
                out,
                "  Step {}: {} ({:+}%)",
                point.step, point.efficiency, point.percent_change
            );
        }
    }

    let _ = writeln!(out, "\nTraining zones");
    let zones = &bundle.training_zones.zones;
    for (i, zone) in zones.iter().enumerate() {
        let new_domain = i == 0 || zones[i - 1].domain != zone.domain;
        if new_domain {
            let _ = writeln!(out, "  {}", zone.domain.label());
        }
        let _ = writeln!(
            out,
            "    {:<3} {:<22} HR {:<11} Speed {:<13} {}",
            zone.label,
            zone.descriptor,
            zone.hr_range.to_string(),
            zone.speed_range.to_string(),
            zone.duration
        );
        let domain_ends = zones.get(i + 1).map_or(true, |next| next.domain != zone.domain);
        if domain_ends {
            if let Some(separator) = zone.domain.separator_after() {
                let _ = writeln!(out, "  -- {} --", separator);
            }
        }
    }

    if !report.quality.flags.is_empty() {
        let flags: Vec<String> = report
            .quality
            .flags
            .iter()
            .filter_map(|flag| serde_json::to_value(flag).ok())
            .filter_map(|value| value.as_str().map(str::to_string))
            .collect();
        let _ = writeln!(out, "\nFlags: {}", flags.join(", "));
    }

    out
}

// Error types

#[derive(Debug)]
enum LactateCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoInput,
    NoSteps,
    ValidationFailed { found: usize, required: usize },
}

impl From<io::Error> for LactateCliError {
    fn from(e: io::Error) -> Self {
        LactateCliError::Io(e)
    }
}

impl From<ComputeError> for LactateCliError {
    fn from(e: ComputeError) -> Self {
        LactateCliError::Compute(e)
    }
}

impl From<serde_json::Error> for LactateCliError {
    fn from(e: serde_json::Error) -> Self {
        LactateCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<LactateCliError> for CliError {
    fn from(e: LactateCliError) -> Self {
        match e {
            LactateCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            LactateCliError::Compute(e) => compute_error(e),
            LactateCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            LactateCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "stdin is a terminal, nothing to read".to_string(),
                hint: Some("Pipe a step table into stdin or pass -i <file>".to_string()),
            },
            LactateCliError::NoSteps => CliError {
                code: "NO_STEPS".to_string(),
                message: "No steps found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            LactateCliError::ValidationFailed { found, required } => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} usable rows, {} required", found, required),
                hint: Some(
                    "Rows need a positive heart rate, speed and lactate for the selected mode"
                        .to_string(),
                ),
            },
        }
    }
}

fn compute_error(e: ComputeError) -> CliError {
    let (code, hint) = match &e {
        ComputeError::ParseError(_) | ComputeError::JsonError(_) => (
            "PARSE_ERROR",
            Some("Run 'lactate schema' for the expected input layout"),
        ),
        ComputeError::InsufficientData { .. } => (
            "INSUFFICIENT_DATA",
            Some("Run 'lactate validate' to see how many rows are usable"),
        ),
        ComputeError::InvalidConfig(_) => ("CONFIG_ERROR", Some("Check the --config file")),
        ComputeError::DegenerateGeometry(_) => (
            "DEGENERATE_GEOMETRY",
            Some("The final step must differ from the Dmax start point"),
        ),
        ComputeError::FitFailed(_) => (
            "FIT_FAILED",
            Some("Steps need more distinct speeds than the polynomial order"),
        ),
        ComputeError::NonFinite(_) | ComputeError::EncodingError(_) => ("COMPUTE_ERROR", None),
    };

    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: hint.map(str::to_string),
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    mode: String,
    total_rows: usize,
    valid_rows: usize,
    rejected_rows: usize,
    required_points: usize,
    has_stroke_rate: bool,
}

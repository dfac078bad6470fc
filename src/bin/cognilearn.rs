//! CogniLearn CLI - Command-line interface for cohort analysis
//!
//! Commands:
//! - analyze: Run the full pipeline and write the JSON report
//! - recommend: Print the prioritized intervention table
//! - validate: Validate an interaction log
//! - profiles: Print archetype profiles and the strategy catalog
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

use cognilearn::adapter::{InteractionAdapter, LogFormat};
use cognilearn::encoder::REPORT_VERSION;
use cognilearn::types::Feature;
use cognilearn::{AnalysisConfig, AnalysisError, CohortAnalyzer, COGNILEARN_VERSION, PRODUCER_NAME};

/// CogniLearn - Classify learners into cognitive-style archetypes
#[derive(Parser)]
#[command(name = "cognilearn")]
#[command(version = COGNILEARN_VERSION)]
#[command(about = "Classify learners and rank interventions from interaction logs", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write the JSON report
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Print the prioritized intervention table
    Recommend {
        #[command(flatten)]
        input: InputArgs,

        /// Output the table as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate an interaction log
    Validate {
        /// Interaction log path (use - for stdin)
        #[arg(short, long)]
        logs: PathBuf,

        /// Interaction log format
        #[arg(long, default_value = "json")]
        log_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print archetype profiles and the strategy catalog
    Profiles {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct InputArgs {
    /// Student roster path (JSON array)
    #[arg(short, long)]
    students: PathBuf,

    /// Interaction log path (use - for stdin)
    #[arg(short, long)]
    logs: PathBuf,

    /// Interaction log format
    #[arg(long, default_value = "json")]
    log_format: InputFormat,

    /// Analysis configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// JSON array of records
    Json,
    /// Newline-delimited JSON (one record per line)
    Ndjson,
}

impl From<InputFormat> for LogFormat {
    fn from(format: InputFormat) -> Self {
        match format {
            InputFormat::Json => LogFormat::Json,
            InputFormat::Ndjson => LogFormat::Ndjson,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

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

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliFailure> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            output_format,
        } => cmd_analyze(&input, &output, output_format),
        Commands::Recommend { input, json } => cmd_recommend(&input, json),
        Commands::Validate {
            logs,
            log_format,
            json,
        } => cmd_validate(&logs, log_format, json),
        Commands::Profiles { json } => cmd_profiles(json),
        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn cmd_analyze(
    input: &InputArgs,
    output: &Path,
    output_format: OutputFormat,
) -> Result<(), CliFailure> {
    let analyzer = build_analyzer(input.config.as_deref())?;
    let (roster, log) = load_inputs(input)?;

    let run = analyzer.analyze(&roster, &log)?;
    let report = analyzer.report(&run);
    tracing::info!(
        students = run.students.len(),
        at_risk = run.summary.at_risk_count,
        "analysis complete"
    );

    let output_data = match output_format {
        OutputFormat::Json => serde_json::to_string(&report)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&report)?,
    };

    if output.to_string_lossy() == "-" {
        println!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_recommend(input: &InputArgs, json: bool) -> Result<(), CliFailure> {
    let analyzer = build_analyzer(input.config.as_deref())?;
    let (roster, log) = load_inputs(input)?;
    let run = analyzer.analyze(&roster, &log)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run.recommendations)?);
        return Ok(());
    }

    println!(
        "{:<16} {:<20} {:>9} {:>12} {:<9} Top Recommendation",
        "Student", "Pattern", "Accuracy%", "Retry Rate%", "Priority"
    );
    for row in &run.recommendations {
        println!(
            "{:<16} {:<20} {:>9} {:>12} {:<9} {}",
            row.student,
            row.pattern,
            row.accuracy_pct,
            row.retry_rate_pct,
            row.priority.label(),
            row.top_recommendation
        );
    }

    Ok(())
}

fn cmd_validate(logs: &Path, log_format: InputFormat, json: bool) -> Result<(), CliFailure> {
    let input_data = read_input(logs)?;
    let records = InteractionAdapter::parse_raw(&input_data, log_format.into())?;
    let failures = InteractionAdapter::validate_records(&records);

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - failures.len(),
        invalid_records: failures.len(),
        errors: failures
            .iter()
            .map(|f| ValidationErrorDetail {
                index: f.index,
                student_id: f.student_id.clone(),
                error: f.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Record {} (student {}): {}",
                    err.index, err.student_id, err.error
                );
            }
        }
    }

    if report.invalid_records > 0 {
        Err(CliFailure::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_profiles(json: bool) -> Result<(), CliFailure> {
    let analyzer = CohortAnalyzer::new();
    let profiles = analyzer.classifier().profiles();
    let catalog = analyzer.engine().catalog();

    if json {
        let payload = serde_json::json!({
            "features": Feature::ALL.iter().map(|f| f.as_str()).collect::<Vec<_>>(),
            "profiles": profiles,
            "strategies": catalog,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let header: Vec<&str> = Feature::ALL.iter().map(|f| f.as_str()).collect();
    println!("Archetype profiles (tie-break order, top wins)");
    println!("  {:<20} {}", "pattern", header.join("  "));
    for profile in profiles {
        let values: Vec<String> = profile
            .vector
            .values()
            .iter()
            .map(|v| format!("{:.1}", v))
            .collect();
        println!("  {:<20} {}", profile.archetype.label(), values.join("  "));
    }

    println!("\nStrategy catalog");
    for (pattern, strategies) in catalog.iter() {
        println!("  {}", pattern);
        for (i, strategy) in strategies.iter().enumerate() {
            println!("    {}. {}", i + 1, strategy);
        }
    }

    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), CliFailure> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("CogniLearn version {}", COGNILEARN_VERSION),
    });

    checks.push(DoctorCheck {
        name: "report_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Report schema: {}", REPORT_VERSION),
    });

    if let Some(config_path) = config {
        let check = if config_path.exists() {
            match AnalysisConfig::load_from_file(config_path) {
                Ok(cfg) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "Config valid (late sessions from {}, fallback {})",
                        cfg.late_session_threshold,
                        cfg.fallback_pattern
                            .map(|p| p.label())
                            .unwrap_or("disabled")
                    ),
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                },
            }
        } else {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist, defaults will be used".to_string(),
            }
        };
        checks.push(check);
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass --logs <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--logs - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: COGNILEARN_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("CogniLearn Doctor Report");
        println!("========================");
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
        Err(CliFailure::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn build_analyzer(config: Option<&Path>) -> Result<CohortAnalyzer, CliFailure> {
    let config = match config {
        Some(path) => AnalysisConfig::load_from_file(path)?,
        None => AnalysisConfig::default(),
    };
    Ok(CohortAnalyzer::with_config(config)?)
}

fn load_inputs(
    input: &InputArgs,
) -> Result<(Vec<cognilearn::StudentProfile>, Vec<cognilearn::InteractionRecord>), CliFailure> {
    let roster_data = read_input(&input.students)?;
    let log_data = read_input(&input.logs)?;

    let roster = InteractionAdapter::parse_roster(&roster_data)?;
    let log = InteractionAdapter::parse_log(&log_data, input.log_format.into())?;
    tracing::debug!(students = roster.len(), records = log.len(), "loaded inputs");

    Ok((roster, log))
}

fn read_input(path: &Path) -> Result<String, CliFailure> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

// Error types

#[derive(Debug)]
enum CliFailure {
    Io(io::Error),
    Analysis(AnalysisError),
    Json(serde_json::Error),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for CliFailure {
    fn from(e: io::Error) -> Self {
        CliFailure::Io(e)
    }
}

impl From<AnalysisError> for CliFailure {
    fn from(e: AnalysisError) -> Self {
        CliFailure::Analysis(e)
    }
}

impl From<serde_json::Error> for CliFailure {
    fn from(e: serde_json::Error) -> Self {
        CliFailure::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CliFailure> for CliError {
    fn from(e: CliFailure) -> Self {
        match e {
            CliFailure::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CliFailure::Analysis(e) => {
                let (code, hint) = match &e {
                    AnalysisError::EmptyInput(_) => (
                        "EMPTY_INPUT",
                        "Ensure the roster and log are non-empty and share student ids",
                    ),
                    AnalysisError::UnknownPattern(_) => (
                        "UNKNOWN_PATTERN",
                        "Set fallback_pattern in the config or extend the catalog",
                    ),
                    AnalysisError::InvalidRecord { .. } => (
                        "INVALID_RECORD",
                        "Run 'cognilearn validate' for details",
                    ),
                    AnalysisError::InvalidRoster(_) => {
                        ("INVALID_ROSTER", "Student ids must be unique and non-empty")
                    }
                    AnalysisError::InvalidConfig(_) => {
                        ("INVALID_CONFIG", "Run 'cognilearn doctor --config <file>'")
                    }
                    AnalysisError::ParseError(_) | AnalysisError::JsonError(_) => {
                        ("PARSE_ERROR", "Check input format")
                    }
                    AnalysisError::EncodingError(_) => ("ENCODING_ERROR", "Report a bug"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            CliFailure::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CliFailure::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            CliFailure::DoctorFailed => CliError {
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
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    student_id: String,
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

//! Stride CLI - Command-line interface for Stride Flux
//!
//! Commands:
//! - analyze: Split and summarize one activity stream
//! - records: Personal records across an activity history
//! - period: Totals over a date range
//! - config: Print the effective configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use stride_flux::encoder::{render_records_text, render_summary_text, ReportEncoder};
use stride_flux::pipeline::StrideProcessor;
use stride_flux::schema::{Activity, ActivityAdapter};
use stride_flux::{AnalysisConfig, ComputeError, STRIDE_VERSION};

/// Stride - activity stream analytics and personal records
#[derive(Parser)]
#[command(name = "stride")]
#[command(version = STRIDE_VERSION)]
#[command(about = "Split, summarize and rank running activities", long_about = None)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split and summarize one activity stream
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Split length in meters (overrides config)
        #[arg(long)]
        split_length: Option<f64>,

        /// Output format
        #[arg(long, default_value = "json")]
        format: OutputFormat,
    },

    /// Personal records across an activity history
    Records {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// User the records belong to
        #[arg(long, default_value = "local")]
        user: String,

        /// Output format
        #[arg(long, default_value = "json")]
        format: OutputFormat,
    },

    /// Totals over an inclusive date range
    Period {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,
    },

    /// Print the effective configuration
    Config {
        /// Compact JSON instead of pretty-printed
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one activity per line)
    Ndjson,
    /// JSON array of activities
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Human-readable report
    Text,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

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

fn run(cli: Cli) -> Result<(), StrideCliError> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            input,
            split_length,
            format,
        } => cmd_analyze(config, &input, split_length, format),

        Commands::Records {
            input,
            input_format,
            user,
            format,
        } => cmd_records(config, &input, input_format, &user, format),

        Commands::Period {
            input,
            input_format,
            from,
            to,
        } => cmd_period(config, &input, input_format, from, to),

        Commands::Config { json } => {
            let out = if json {
                serde_json::to_string(&config)?
            } else {
                config.to_json()?
            };
            println!("{out}");
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, StrideCliError> {
    match path {
        Some(path) => {
            log::debug!("loading configuration from {}", path.display());
            Ok(AnalysisConfig::from_file(path)?)
        }
        None => Ok(AnalysisConfig::default()),
    }
}

fn read_input(input: &Path) -> Result<String, StrideCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(StrideCliError::InteractiveStdin);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_activities(input: &Path, format: InputFormat) -> Result<Vec<Activity>, StrideCliError> {
    let data = read_input(input)?;
    let activities = match format {
        InputFormat::Ndjson => ActivityAdapter::parse_ndjson(&data)?,
        InputFormat::Json => ActivityAdapter::parse_array(&data)?,
    };
    log::debug!("read {} activities", activities.len());

    if activities.is_empty() {
        return Err(StrideCliError::NoActivities);
    }
    Ok(activities)
}

fn cmd_analyze(
    mut config: AnalysisConfig,
    input: &Path,
    split_length: Option<f64>,
    format: OutputFormat,
) -> Result<(), StrideCliError> {
    if let Some(split_length) = split_length {
        config.split_length_m = split_length;
    }
    let split_length_m = config.split_length_m;
    let processor = StrideProcessor::with_config(config)?;

    let raw: serde_json::Value = serde_json::from_str(&read_input(input)?)?;
    let summary = processor.analyze(&raw);
    log::debug!(
        "analyzed {} samples into {} splits",
        summary.sample_count,
        summary.splits.len()
    );

    let out = match format {
        OutputFormat::Text => render_summary_text(&summary),
        OutputFormat::Json => {
            let payload = ReportEncoder::new().encode_analysis(summary, split_length_m);
            serde_json::to_string(&payload)?
        }
        OutputFormat::JsonPretty => {
            let payload = ReportEncoder::new().encode_analysis(summary, split_length_m);
            serde_json::to_string_pretty(&payload)?
        }
    };
    println!("{}", out.trim_end());
    Ok(())
}

fn cmd_records(
    config: AnalysisConfig,
    input: &Path,
    input_format: InputFormat,
    user: &str,
    format: OutputFormat,
) -> Result<(), StrideCliError> {
    let table = config.distances.fingerprint();
    let processor = StrideProcessor::with_config(config)?;
    let activities = read_activities(input, input_format)?;
    let records = processor.personal_records(user, &activities);

    let out = match format {
        OutputFormat::Text => render_records_text(&records),
        OutputFormat::Json => {
            serde_json::to_string(&ReportEncoder::new().encode_records(records, &table))?
        }
        OutputFormat::JsonPretty => {
            serde_json::to_string_pretty(&ReportEncoder::new().encode_records(records, &table))?
        }
    };
    println!("{}", out.trim_end());
    Ok(())
}

fn cmd_period(
    config: AnalysisConfig,
    input: &Path,
    input_format: InputFormat,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<(), StrideCliError> {
    let processor = StrideProcessor::with_config(config)?;
    let activities = read_activities(input, input_format)?;
    let summary = processor.period_summary(&activities, from, to)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

// Error types

#[derive(Debug)]
enum StrideCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    InteractiveStdin,
    NoActivities,
}

impl From<io::Error> for StrideCliError {
    fn from(e: io::Error) -> Self {
        StrideCliError::Io(e)
    }
}

impl From<ComputeError> for StrideCliError {
    fn from(e: ComputeError) -> Self {
        StrideCliError::Compute(e)
    }
}

impl From<serde_json::Error> for StrideCliError {
    fn from(e: serde_json::Error) -> Self {
        StrideCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<StrideCliError> for CliError {
    fn from(e: StrideCliError) -> Self {
        match e {
            StrideCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            StrideCliError::Compute(ComputeError::InvalidConfig(msg)) => CliError {
                code: "INVALID_CONFIG".to_string(),
                message: msg,
                hint: Some("Run 'stride config' to see the defaults".to_string()),
            },
            StrideCliError::Compute(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input is a stream or an array of activities".to_string()),
            },
            StrideCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            StrideCliError::InteractiveStdin => CliError {
                code: "NO_INPUT".to_string(),
                message: "Refusing to read from an interactive terminal".to_string(),
                hint: Some("Pipe data in or pass a file with --input".to_string()),
            },
            StrideCliError::NoActivities => CliError {
                code: "NO_ACTIVITIES".to_string(),
                message: "No activities found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
        }
    }
}

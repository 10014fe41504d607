//! Valley CLI - Command-line interface for valley-metrics
//!
//! Commands:
//! - analyze: Run the full analytics pipeline over a cohort export
//! - validate: Parse-check a cohort export and report per-line errors

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use valley_metrics::pipeline::{CohortReport, OverrideTable, SessionAnalyzer};
use valley_metrics::schema;
use valley_metrics::session::DEFAULT_MIN_SESSION_SECS;
use valley_metrics::{AnalyticsError, ENGINE_VERSION};

/// Valley - Session analytics engine for game telemetry event streams
#[derive(Parser)]
#[command(name = "valley")]
#[command(author = "Valley Research")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Reconstruct telemetry events and derive session statistics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analytics pipeline over a cohort export
    Analyze {
        /// Input NDJSON file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output report file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// JSON file with a username -> end_time override table
        #[arg(long)]
        overrides: Option<PathBuf>,

        /// Minimum session duration in seconds for cohort inclusion
        #[arg(long, default_value_t = DEFAULT_MIN_SESSION_SECS)]
        min_duration: i64,
    },

    /// Parse-check a cohort export and report per-line errors
    Validate {
        /// Input NDJSON file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },
}

enum ValleyCliError {
    Io(io::Error),
    Analytics(AnalyticsError),
    ValidationFailed(usize),
}

impl From<io::Error> for ValleyCliError {
    fn from(e: io::Error) -> Self {
        ValleyCliError::Io(e)
    }
}

impl From<AnalyticsError> for ValleyCliError {
    fn from(e: AnalyticsError) -> Self {
        ValleyCliError::Analytics(e)
    }
}

impl std::fmt::Display for ValleyCliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValleyCliError::Io(e) => write!(f, "I/O error: {e}"),
            ValleyCliError::Analytics(e) => write!(f, "{e}"),
            ValleyCliError::ValidationFailed(count) => {
                write!(f, "validation failed: {count} malformed line(s)")
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("valley: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ValleyCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            overrides,
            min_duration,
        } => cmd_analyze(&input, &output, overrides.as_deref(), min_duration),

        Commands::Validate { input } => cmd_validate(&input),
    }
}

fn read_input(path: &PathBuf) -> Result<String, io::Error> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        fs::read_to_string(path)
    }
}

fn cmd_analyze(
    input: &PathBuf,
    output: &PathBuf,
    overrides: Option<&std::path::Path>,
    min_duration: i64,
) -> Result<(), ValleyCliError> {
    let input_data = read_input(input)?;
    let users = schema::parse_ndjson(&input_data)?;

    let override_table: OverrideTable = match overrides {
        Some(path) => schema::parse_overrides(&fs::read_to_string(path)?)?,
        None => OverrideTable::new(),
    };

    let analyzer = SessionAnalyzer::new()?.min_session_secs(min_duration);
    let report = analyzer.analyze(&users, &override_table);

    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    for fault in &report.session_faults {
        eprintln!(
            "warning: user {} ({}) skipped: {}",
            fault.user_id, fault.username, fault.detail
        );
    }

    let report_json = format_report(&report)?;
    if output.to_string_lossy() == "-" {
        println!("{report_json}");
    } else {
        fs::write(output, report_json)?;
    }

    Ok(())
}

fn format_report(report: &CohortReport) -> Result<String, ValleyCliError> {
    // pretty-print when a human is watching
    let json = if atty::is(atty::Stream::Stdout) {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    };
    json.map_err(|e| ValleyCliError::Analytics(AnalyticsError::JsonError(e)))
}

fn cmd_validate(input: &PathBuf) -> Result<(), ValleyCliError> {
    let input_data = read_input(input)?;

    let mut total = 0usize;
    let mut invalid = 0usize;

    for (line_number, line) in input_data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        total += 1;

        if let Err(e) = serde_json::from_str::<schema::UserDocument>(line) {
            invalid += 1;
            eprintln!("line {}: {e}", line_number + 1);
        }
    }

    println!("{} line(s) checked, {} invalid", total, invalid);

    if invalid > 0 {
        Err(ValleyCliError::ValidationFailed(invalid))
    } else {
        Ok(())
    }
}

//! Stride CLI - Command-line interface for the Stride step planner
//!
//! Commands:
//! - plan: Compute today's checkpoint schedule and pace metrics
//! - record: Save the current step count to today's log
//! - history: Show today's recorded samples
//! - intervals: List the standard checkpoint intervals
//! - doctor: Diagnose the sample store and environment

use clap::{Parser, Subcommand, ValueEnum};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, FixedOffset, Local, NaiveTime};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use stride_planner::clock::parse_time_of_day;
use stride_planner::report::PlanReport;
use stride_planner::store::{JsonFileStore, SampleStore};
use stride_planner::types::{CheckpointStatus, PlanStatus};
use stride_planner::{
    interval_label, PlanEncoder, PlanError, PlannerSession, PRODUCER_NAME, STANDARD_INTERVALS,
    STORAGE_KEY, STRIDE_VERSION,
};

/// Stride - plan checkpoints for a daily step goal
#[derive(Parser)]
#[command(name = "stride")]
#[command(version = STRIDE_VERSION)]
#[command(about = "Plan step checkpoints to reach a daily goal", long_about = None)]
struct Cli {
    /// Directory holding the sample log
    #[arg(long, global = true, default_value = ".stride")]
    data_dir: PathBuf,

    /// Override the current instant (RFC 3339), for replaying a day
    #[arg(long, global = true, value_parser = parse_now)]
    now: Option<DateTime<FixedOffset>>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute today's checkpoint schedule and pace metrics
    Plan {
        /// Daily step goal
        #[arg(long, default_value = "8000")]
        target_steps: u32,

        /// Deadline time of day (e.g. 18:00)
        #[arg(long, default_value = "18:00", value_parser = parse_time)]
        target_time: NaiveTime,

        /// Walking pace in steps per minute
        #[arg(long, default_value = "110")]
        pace: u32,

        /// Steps taken so far (defaults to the latest recorded sample)
        #[arg(long)]
        current_steps: Option<u32>,

        /// Checkpoint interval in minutes (15, 30, 60, 120)
        #[arg(long, default_value = "60")]
        interval: u32,

        /// Record the current steps before planning
        #[arg(long)]
        save: bool,

        /// Output format (table on a terminal, json otherwise)
        #[arg(long)]
        output_format: Option<OutputFormat>,
    },

    /// Save the current step count to today's log
    Record {
        /// Steps taken so far
        #[arg(long)]
        steps: u32,
    },

    /// Show today's recorded samples
    History {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the standard checkpoint intervals
    Intervals,

    /// Diagnose the sample store and environment
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable checkpoint table
    Table,
    /// Compact JSON plan report
    Json,
    /// Pretty-printed JSON plan report
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

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
    let now = cli.now.unwrap_or_else(local_now);
    let store = JsonFileStore::in_dir(&cli.data_dir);
    debug!(%now, store = %store.path().display(), "starting");

    match cli.command {
        Commands::Plan {
            target_steps,
            target_time,
            pace,
            current_steps,
            interval,
            save,
            output_format,
        } => {
            let mut session = PlannerSession::open(store, now)?;
            {
                let input = session.input_mut();
                input.target_steps = target_steps;
                input.target_time = target_time;
                input.walking_pace = pace;
                input.checkpoint_interval = interval;
                if let Some(steps) = current_steps {
                    input.current_steps = steps;
                }
            }
            if save {
                session.save_current_steps(now)?;
            }
            cmd_plan(&session, now, output_format)
        }

        Commands::Record { steps } => {
            let mut session = PlannerSession::open(store, now)?;
            session.input_mut().current_steps = steps;
            let log = session.save_current_steps(now)?;
            println!(
                "Recorded {} steps at {} ({} samples today)",
                group_thousands(i64::from(steps)),
                now.format("%H:%M"),
                log.len()
            );
            Ok(())
        }

        Commands::History { json } => {
            let session = PlannerSession::open(store, now)?;
            if json {
                println!("{}", session.history().to_json()?);
            } else if session.history().is_empty() {
                println!("No samples recorded today");
            } else {
                println!("Samples for {}", now.format("%Y-%m-%d"));
                for sample in session.history() {
                    println!(
                        "  {}  {:>8} steps",
                        sample.time.format("%H:%M"),
                        group_thousands(i64::from(sample.steps))
                    );
                }
            }
            Ok(())
        }

        Commands::Intervals => {
            for minutes in STANDARD_INTERVALS {
                println!("{:>4}  {}", minutes, interval_label(minutes));
            }
            Ok(())
        }

        Commands::Doctor { json } => cmd_doctor(&store, now, json),
    }
}

fn cmd_plan(
    session: &PlannerSession<JsonFileStore>,
    now: DateTime<FixedOffset>,
    output_format: Option<OutputFormat>,
) -> Result<(), StrideCliError> {
    let plan = session.plan(now)?;
    let report = PlanEncoder::new().encode(&plan, session.input(), now);

    let format = output_format.unwrap_or_else(|| {
        if atty::is(atty::Stream::Stdout) {
            OutputFormat::Table
        } else {
            OutputFormat::Json
        }
    });

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => print_plan_table(&report, session.input().target_time),
    }

    Ok(())
}

fn print_plan_table(report: &PlanReport, target_time: NaiveTime) {
    println!(
        "Plan: {} steps by {} ({} checkpoints)",
        group_thousands(i64::from(report.target_steps)),
        target_time.format("%H:%M"),
        report.interval_label
    );
    println!("Status: {}", status_text(report.status));
    println!();

    for checkpoint in &report.checkpoints {
        let time = DateTime::parse_from_rfc3339(&checkpoint.time)
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_else(|_| checkpoint.time.clone());
        let marker = match checkpoint.status {
            CheckpointStatus::Past => " ",
            CheckpointStatus::Current => ">",
            CheckpointStatus::Upcoming => "*",
        };
        println!(
            "  {} {}  {:>8} steps  {:?}",
            marker,
            time,
            group_thousands(i64::from(checkpoint.steps)),
            checkpoint.kind
        );
    }

    if let Some(metrics) = &report.metrics {
        println!();
        println!(
            "Steps needed per hour:    {}",
            group_thousands(i64::from(metrics.steps_per_hour))
        );
        // A negative ratio means the walking time does not fit the window
        let ratio = if metrics.feasible {
            metrics.rest_walk_ratio.as_str()
        } else {
            "0.00"
        };
        println!("Rest to walk ratio:       {}", ratio);
        println!("Minutes to walk per hour: {}", metrics.minutes_walk_per_hour);
        if !metrics.feasible {
            println!("Warning: the goal cannot be reached at this walking pace");
        }
    }
}

fn cmd_doctor(
    store: &JsonFileStore,
    now: DateTime<FixedOffset>,
    json: bool,
) -> Result<(), StrideCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "stride_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Stride version {}", STRIDE_VERSION),
    });

    checks.push(doctor_store_check(store, now));

    let stdout_check = if atty::is(atty::Stream::Stdout) {
        DoctorCheck {
            name: "stdout".to_string(),
            status: CheckStatus::Ok,
            message: "stdout is a TTY (plan prints a table)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdout".to_string(),
            status: CheckStatus::Ok,
            message: "stdout is a pipe (plan prints JSON)".to_string(),
        }
    };
    checks.push(stdout_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: STRIDE_VERSION.to_string(),
        storage_key: STORAGE_KEY.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Stride Doctor Report");
        println!("====================");
        println!("Producer:    {}", report.producer);
        println!("Version:     {}", report.version);
        println!("Storage key: {}", report.storage_key);
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
        Err(StrideCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn doctor_store_check(store: &JsonFileStore, now: DateTime<FixedOffset>) -> DoctorCheck {
    let path = store.path().display().to_string();
    match store.load(now.date_naive()) {
        Ok(None) => DoctorCheck {
            name: "sample_store".to_string(),
            status: CheckStatus::Warning,
            message: format!("No sample log at {} yet", path),
        },
        Ok(Some(loaded)) if loaded.discarded > 0 => DoctorCheck {
            name: "sample_store".to_string(),
            status: CheckStatus::Warning,
            message: format!(
                "{} samples today, {} stale or malformed entries will be dropped",
                loaded.log.len(),
                loaded.discarded
            ),
        },
        Ok(Some(loaded)) => DoctorCheck {
            name: "sample_store".to_string(),
            status: CheckStatus::Ok,
            message: format!("{} samples today in {}", loaded.log.len(), path),
        },
        Err(e) => DoctorCheck {
            name: "sample_store".to_string(),
            status: CheckStatus::Error,
            message: format!("Cannot read {}: {}", path, e),
        },
    }
}

// Helper functions

fn local_now() -> DateTime<FixedOffset> {
    let now = Local::now();
    now.with_timezone(now.offset())
}

fn parse_now(raw: &str) -> Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(raw).map_err(|e| e.to_string())
}

fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    parse_time_of_day(raw).map_err(|e| e.to_string())
}

fn status_text(status: PlanStatus) -> &'static str {
    match status {
        PlanStatus::OnTrack => "on track",
        PlanStatus::GoalMet => "goal already met",
        PlanStatus::TargetPassed => "target time has passed",
        PlanStatus::InvalidPace => "walking pace must be above zero",
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        grouped.insert(0, '-');
    }
    grouped
}

// Error types

#[derive(Debug)]
enum StrideCliError {
    Plan(PlanError),
    Json(serde_json::Error),
    DoctorFailed,
}

impl From<PlanError> for StrideCliError {
    fn from(e: PlanError) -> Self {
        StrideCliError::Plan(e)
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
            StrideCliError::Plan(PlanError::StorageError(e)) => CliError {
                code: "STORAGE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the data directory and its permissions".to_string()),
            },
            StrideCliError::Plan(e @ PlanError::InvalidInput(_)) => CliError {
                code: "INVALID_INPUT".to_string(),
                message: e.to_string(),
                hint: Some("Target steps and interval must be positive".to_string()),
            },
            StrideCliError::Plan(e) => CliError {
                code: "PLAN_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            StrideCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            StrideCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    storage_key: String,
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

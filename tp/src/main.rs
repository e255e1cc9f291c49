//! TripPlanner - latest-wins itinerary generation
//!
//! CLI entry point.

use std::fs;
use std::path::Path;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use tripplanner::cli::{
    Cli, Command, OutputFormat, SavedPlan, format_geo, format_plan, format_progress, format_violations, get_log_path,
};
use tripplanner::config::Config;
use tripplanner::domain::{ItineraryPlan, Job, JobProgress, JobStatus, PlannerSnapshot, Severity, TripType};
use tripplanner::planner::review_plan;
use tripplanner::service::TripService;
use tripplanner::validation::{Region, validate_coordinate};

const POLL: Duration = Duration::from_millis(250);

fn setup_logging(level: &str) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Write to the log file, not stdout/stderr
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;
    let directive = level
        .parse::<tracing_subscriber::filter::Directive>()
        .context(format!("Invalid log level: {}", level))?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .init();

    info!("Logging initialized (level: {})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    let level = cli
        .log_level
        .clone()
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    setup_logging(&level).context("Failed to setup logging")?;

    info!(
        "TripPlanner loaded config: provider={}, model={}",
        config.llm.provider, config.llm.model
    );

    match cli.command {
        Command::Plan {
            request,
            context,
            format,
        } => cmd_plan(&config, &request, context, format).await,
        Command::Session { format } => cmd_session(&config, format).await,
        Command::Validate {
            plan,
            region,
            trip_type,
            format,
        } => cmd_validate(&config, &plan, region, trip_type, format),
        Command::Coord {
            lat,
            lng,
            region,
            format,
        } => cmd_coord(&config, lat, lng, region, format),
    }
}

/// Poll a job, echoing progress to stderr, until it is terminal
async fn follow_job(service: &TripService, job_id: &str, format: OutputFormat) -> Result<Job> {
    let mut last: Option<JobProgress> = None;
    loop {
        let job = service
            .job(job_id)
            .await?
            .ok_or_else(|| eyre::eyre!("Job {} disappeared", job_id))?;
        if format == OutputFormat::Text && last.as_ref() != Some(&job.progress) {
            eprintln!("{}", format_progress(&job.progress));
            last = Some(job.progress.clone());
        }
        if job.status.is_terminal() {
            return Ok(job);
        }
        tokio::time::sleep(POLL).await;
    }
}

fn print_job_plan(job: &Job, format: OutputFormat) -> Result<()> {
    if job.status == JobStatus::Error {
        let message = job.error.clone().unwrap_or_else(|| "unknown error".to_string());
        return Err(eyre::eyre!("Generation failed: {}", message));
    }
    let value = job.plan.clone().ok_or_else(|| eyre::eyre!("Job finished without a plan"))?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
        OutputFormat::Text => {
            let plan: ItineraryPlan = serde_json::from_value(value).context("Failed to read plan")?;
            print!("{}", format_plan(&plan));
        }
    }
    Ok(())
}

/// Generate one itinerary
async fn cmd_plan(config: &Config, request: &str, context: Vec<(String, String)>, format: OutputFormat) -> Result<()> {
    config.validate()?;
    let service = TripService::from_config(config)?;

    let snapshot = context
        .into_iter()
        .fold(PlannerSnapshot::new(request), |s, (k, v)| s.with_context(k, v));
    let outcome = service.schedule("cli", snapshot).await?;
    let job_id = outcome
        .job_id
        .ok_or_else(|| eyre::eyre!("Generation did not start"))?;

    let job = follow_job(&service, &job_id, format).await?;
    print_job_plan(&job, format)
}

/// Read the request and refinements from stdin
async fn cmd_session(config: &Config, format: OutputFormat) -> Result<()> {
    config.validate()?;
    let service = TripService::from_config(config)?;
    let key = "session";

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut request: Option<String> = None;
    let mut refinements: Vec<Value> = Vec::new();
    let mut job_id: Option<String> = None;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let snapshot = match &request {
            None => {
                request = Some(line.to_string());
                PlannerSnapshot::new(line)
            }
            Some(base) => {
                refinements.push(Value::String(line.to_string()));
                PlannerSnapshot::new(base.clone()).with_context("refinements", Value::Array(refinements.clone()))
            }
        };
        let outcome = service.schedule(key, snapshot).await?;
        if outcome.job_id.is_some() {
            job_id = outcome.job_id.clone();
        }
        if format == OutputFormat::Text {
            let verb = if outcome.queued { "queued".yellow() } else { "started".green() };
            eprintln!("{} {} ({})", verb, outcome.mode, outcome.state);
        }
    }

    let Some(job_id) = job_id else {
        eprintln!("No request given");
        return Ok(());
    };
    service.wait_idle(key, POLL).await;
    let job = follow_job(&service, &job_id, format).await?;
    print_job_plan(&job, format)
}

/// Run every offline check over a saved plan
fn cmd_validate(
    config: &Config,
    path: &Path,
    region: Option<Region>,
    trip_type: Option<TripType>,
    format: OutputFormat,
) -> Result<()> {
    let content = fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
    let saved: SavedPlan = serde_json::from_str(&content).context("Failed to parse plan")?;
    let violations = review_plan(
        &saved.plan,
        saved.polyline(),
        trip_type,
        region.or(config.planner.region),
        config.planner.road_factor,
        &config.validation,
    );

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&violations)?),
        OutputFormat::Text => {
            print!("{}", format_violations(&violations));
            let errors = violations.iter().filter(|v| v.severity == Severity::Error).count();
            let verdict = if errors == 0 { "valid".green() } else { "invalid".red().bold() };
            println!(
                "{}: {} errors, {} warnings",
                verdict,
                errors,
                violations.len() - errors
            );
        }
    }
    Ok(())
}

/// Check one coordinate
fn cmd_coord(config: &Config, lat: f64, lng: f64, region: Option<Region>, format: OutputFormat) -> Result<()> {
    let options = config.validation.geo_options(region.or(config.planner.region), &[]);
    let result = validate_coordinate(lat, lng, &options);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print!("{}", format_geo(lat, lng, &result)),
    }
    Ok(())
}

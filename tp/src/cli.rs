//! CLI command definitions and output formatting

use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::{GeoPoint, ItineraryPlan, JobProgress, Severity, TripType, Violation};
use crate::validation::{GeoConfidence, GeoValidation, Region};

/// TripPlanner - latest-wins itinerary generation
#[derive(Parser)]
#[command(
    name = "tp",
    about = "Draft, locate and check multi-day trip itineraries",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/tripplanner/logs/tripplanner.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (overrides config)
    #[arg(short, long, global = true, help = "Log level: trace, debug, info, warn, error")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Generate one itinerary and print it
    Plan {
        /// What the trip should be
        request: String,

        /// Extra context as key=value, repeatable
        #[arg(long = "context", value_name = "KEY=VALUE", value_parser = parse_context)]
        context: Vec<(String, String)>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Read a request and its refinements from stdin, one per line
    Session {
        /// Output format for the final plan
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Check a saved plan offline
    Validate {
        /// Plan JSON, optionally carrying a `polyline` of the route
        plan: PathBuf,

        /// Expected region (us or europe)
        #[arg(short, long)]
        region: Option<Region>,

        /// Trip shape, inferred when omitted (one-way or round-trip)
        #[arg(short, long)]
        trip_type: Option<TripType>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Check a single coordinate
    Coord {
        #[arg(allow_negative_numbers = true)]
        lat: f64,

        #[arg(allow_negative_numbers = true)]
        lng: f64,

        /// Expected region (us or europe)
        #[arg(short, long)]
        region: Option<Region>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for plans and reports
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

/// Parse `key=value`
pub fn parse_context(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.trim().to_string())),
        _ => Err(format!("Expected KEY=VALUE, got '{}'", s)),
    }
}

/// Path of the log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tripplanner")
        .join("logs")
        .join("tripplanner.log")
}

/// A plan as saved by `tp plan --format json`, plus an optional route
#[derive(Debug, Deserialize)]
pub struct SavedPlan {
    #[serde(flatten)]
    pub plan: ItineraryPlan,
    #[serde(default)]
    pub polyline: Vec<GeoPoint>,
}

impl SavedPlan {
    pub fn polyline(&self) -> Option<&[GeoPoint]> {
        if self.polyline.is_empty() {
            None
        } else {
            Some(&self.polyline)
        }
    }
}

fn severity_label(severity: Severity) -> String {
    match severity {
        Severity::Error => "ERROR".red().bold().to_string(),
        Severity::Warn => "WARN".yellow().to_string(),
    }
}

/// One line per violation, errors first
pub fn format_violations(violations: &[Violation]) -> String {
    if violations.is_empty() {
        return format!("{}\n", "No violations".green());
    }
    let mut sorted: Vec<&Violation> = violations.iter().collect();
    sorted.sort_by_key(|v| v.severity != Severity::Error);

    let mut out = String::new();
    for v in sorted {
        out.push_str(&format!(
            "{:>5} {} [{}] {}\n",
            severity_label(v.severity),
            v.code.bold(),
            v.entity_id,
            v.message
        ));
        if !v.suggested_fix.is_empty() {
            out.push_str(&format!("      {} {}\n", "fix:".dimmed(), v.suggested_fix));
        }
    }
    out
}

pub fn format_plan(plan: &ItineraryPlan) -> String {
    let mut out = format!("{}\n", plan.title.bold());
    if !plan.summary.is_empty() {
        out.push_str(&format!("{}\n", plan.summary));
    }
    for day in &plan.days {
        out.push_str(&format!(
            "\n{} {} ({}, {})\n",
            format!("Day {}:", day.day_number).cyan().bold(),
            day.title,
            day.city,
            day.country
        ));
        for activity in &day.activities {
            let p = activity.location();
            out.push_str(&format!(
                "  - {} {} {}\n",
                activity.name,
                format!("({:.4}, {:.4})", p.lat, p.lng).dimmed(),
                format!("[{:?}]", activity.source).to_lowercase().dimmed()
            ));
        }
        if !day.navigation_events.is_empty() {
            let miles = crate::domain::meters_to_miles(day.routed_meters());
            out.push_str(&format!("  {} {:.1} mi between stops\n", "route:".dimmed(), miles));
        }
        for host in &day.suggested_hosts {
            out.push_str(&format!("  {} {}\n", "host:".dimmed(), host.name));
        }
    }
    if !plan.violations.is_empty() {
        out.push('\n');
        out.push_str(&format_violations(&plan.violations));
    }
    out
}

pub fn format_progress(progress: &JobProgress) -> String {
    match (progress.current, progress.total) {
        (Some(current), Some(total)) => format!("[{}] {} ({}/{})", progress.stage.cyan(), progress.message, current, total),
        _ => format!("[{}] {}", progress.stage.cyan(), progress.message),
    }
}

pub fn format_geo(lat: f64, lng: f64, result: &GeoValidation) -> String {
    let confidence = match result.confidence {
        GeoConfidence::High => "HIGH".green(),
        GeoConfidence::Medium => "MEDIUM".yellow(),
        GeoConfidence::Failed => "FAILED".red().bold(),
    };
    let region = result
        .region
        .map(|r| r.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let mut out = format!("{:.4}, {:.4}: {} (region: {})\n", lat, lng, confidence, region);
    if !result.violations.is_empty() {
        out.push_str(&format_violations(&result.violations));
    }
    out
}

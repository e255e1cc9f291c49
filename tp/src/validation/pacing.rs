//! Per-day pacing checks

use tracing::debug;

use super::ValidationConfig;
use crate::domain::{EntityType, ValidationResult, Violation, meters_to_miles};

pub const CODE_SPARSE_DAY: &str = "INV-PACE-01";
pub const CODE_LONG_DRIVE: &str = "INV-PACE-02";
pub const CODE_EMPTY_DAY: &str = "INV-PACE-03";
pub const CODE_UNEVEN: &str = "INV-PACE-04";

/// What the pacing checks need to know about a day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayPacing {
    pub day_number: u32,
    pub activity_count: usize,
    pub driving_distance_meters: f64,
}

impl DayPacing {
    pub fn new(day_number: u32, activity_count: usize, driving_distance_meters: f64) -> Self {
        Self {
            day_number,
            activity_count,
            driving_distance_meters,
        }
    }
}

/// Population variance of activity counts
fn activity_variance(days: &[DayPacing]) -> f64 {
    if days.is_empty() {
        return 0.0;
    }
    let n = days.len() as f64;
    let mean = days.iter().map(|d| d.activity_count as f64).sum::<f64>() / n;
    days.iter()
        .map(|d| (d.activity_count as f64 - mean).powi(2))
        .sum::<f64>()
        / n
}

pub fn validate_pacing(days: &[DayPacing], config: &ValidationConfig) -> ValidationResult {
    debug!(days = days.len(), "validate_pacing: called");
    let mut violations = Vec::new();

    for day in days {
        let entity_id = format!("day-{}", day.day_number);
        let drive_miles = meters_to_miles(day.driving_distance_meters);

        if day.activity_count == 0 {
            violations.push(Violation::error(
                CODE_EMPTY_DAY,
                EntityType::Day,
                &entity_id,
                format!("Day {} has no activities", day.day_number),
                "must include at least one activity",
            ));
        } else if day.activity_count < config.min_activities_per_day && drive_miles <= config.long_drive_exempt_miles {
            violations.push(
                Violation::warn(
                    CODE_SPARSE_DAY,
                    EntityType::Day,
                    &entity_id,
                    format!(
                        "Day {} has only {} activit{}",
                        day.day_number,
                        day.activity_count,
                        if day.activity_count == 1 { "y" } else { "ies" }
                    ),
                    format!("should include at least {} activities", config.min_activities_per_day),
                )
                .with_metric("activityCount", day.activity_count as f64)
                .with_metric("drivingMiles", drive_miles),
            );
        }

        if drive_miles > config.max_daily_drive_miles {
            violations.push(
                Violation::warn(
                    CODE_LONG_DRIVE,
                    EntityType::Day,
                    &entity_id,
                    format!("Day {} involves {:.0} miles of driving", day.day_number, drive_miles),
                    format!("should keep driving under {:.0} miles", config.max_daily_drive_miles),
                )
                .with_metric("drivingMiles", drive_miles),
            );
        }
    }

    if days.len() >= 2 {
        let variance = activity_variance(days);
        if variance > config.max_activity_variance {
            debug!(variance, "validate_pacing: uneven days");
            violations.push(
                Violation::warn(
                    CODE_UNEVEN,
                    EntityType::Trip,
                    "trip",
                    format!("Activity counts vary widely across days (variance {:.1})", variance),
                    "Spread activities more evenly across the days",
                )
                .with_metric("variance", variance),
            );
        }
    }

    ValidationResult::from_violations(violations)
}

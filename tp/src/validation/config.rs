//! Validation thresholds

use serde::{Deserialize, Serialize};

/// Tunable thresholds for the geometric validators
///
/// Distances are statute miles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ValidationConfig {
    /// Slack before a day counts as moving backwards
    pub direction_tolerance_miles: f64,

    /// A point farther than this from every other point is isolated
    pub isolation_miles: f64,

    /// Fewest activities a day should have
    pub min_activities_per_day: usize,

    /// Days driving more than this are exempt from the activity minimum
    pub long_drive_exempt_miles: f64,

    /// Upper bound on a single day's driving
    pub max_daily_drive_miles: f64,

    /// Largest acceptable variance of activity counts across days
    pub max_activity_variance: f64,

    /// Day anchors farther than this from the route are off-corridor
    pub corridor_anchor_miles: f64,

    /// Activities farther than this from the route are off-corridor
    pub corridor_activity_miles: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            direction_tolerance_miles: 20.0,
            isolation_miles: 600.0,
            min_activities_per_day: 2,
            long_drive_exempt_miles: 300.0,
            max_daily_drive_miles: 400.0,
            max_activity_variance: 4.0,
            corridor_anchor_miles: 50.0,
            corridor_activity_miles: 75.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ValidationConfig::default();
        assert_eq!(config.direction_tolerance_miles, 20.0);
        assert_eq!(config.min_activities_per_day, 2);
        assert_eq!(config.corridor_activity_miles, 75.0);
    }

    #[test]
    fn test_partial_yaml() {
        let config: ValidationConfig = serde_yaml::from_str("direction-tolerance-miles: 35\n").unwrap();
        assert_eq!(config.direction_tolerance_miles, 35.0);
        assert_eq!(config.isolation_miles, 600.0);
    }
}

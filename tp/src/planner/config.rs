//! Planner configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::TravelMode;
use crate::validation::Region;

/// Tuning for the draft and hydration stages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlannerConfig {
    /// Draft attempts before direction errors become annotations
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Geocoder results farther than this from the bias point are rejected
    #[serde(default = "default_max_anchor_distance")]
    pub max_anchor_distance_miles: f64,

    /// Radius of the deterministic placeholder jitter used for preview plans
    #[serde(default = "default_draft_jitter")]
    pub draft_jitter_deg: f64,

    /// Radius of the random jitter applied when an activity fails to resolve
    #[serde(default = "default_fallback_jitter")]
    pub fallback_jitter_deg: f64,

    /// Straight-line to road distance multiplier for inter-day drives
    #[serde(default = "default_road_factor")]
    pub road_factor: f64,

    #[serde(default = "default_hosts_per_day")]
    pub hosts_per_day: usize,

    /// Travel mode between activities of the same day
    #[serde(default)]
    pub activity_mode: TravelMode,

    /// Restrict geo validation to one region; inferred per point when unset
    #[serde(default)]
    pub region: Option<Region>,

    /// Directory holding `.pmt` overrides for the embedded prompts
    #[serde(default)]
    pub prompts_dir: Option<PathBuf>,

    /// Token cap for the draft completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_max_anchor_distance() -> f64 {
    100.0
}

fn default_draft_jitter() -> f64 {
    0.02
}

fn default_fallback_jitter() -> f64 {
    0.01
}

fn default_road_factor() -> f64 {
    1.25
}

fn default_hosts_per_day() -> usize {
    3
}

fn default_max_tokens() -> u32 {
    4096
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_anchor_distance_miles: default_max_anchor_distance(),
            draft_jitter_deg: default_draft_jitter(),
            fallback_jitter_deg: default_fallback_jitter(),
            road_factor: default_road_factor(),
            hosts_per_day: default_hosts_per_day(),
            activity_mode: TravelMode::default(),
            region: None,
            prompts_dir: None,
            max_tokens: default_max_tokens(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.max_anchor_distance_miles, 100.0);
        assert_eq!(config.road_factor, 1.25);
        assert_eq!(config.activity_mode, TravelMode::Driving);
        assert!(config.region.is_none());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = "max-attempts: 5\nregion: EUROPE\nactivity-mode: walking\n";
        let config: PlannerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.region, Some(Region::Europe));
        assert_eq!(config.activity_mode, TravelMode::Walking);
        assert_eq!(config.hosts_per_day, 3);
    }
}

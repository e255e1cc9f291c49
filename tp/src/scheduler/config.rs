//! Rate limiter configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rate limiter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RateLimiterConfig {
    /// Minimum gap between the start of consecutive calls
    ///
    /// Slightly over one second keeps public geocoders happy.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

fn default_min_interval_ms() -> u64 {
    1100
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
        }
    }
}

impl RateLimiterConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

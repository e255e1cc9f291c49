//! TripPlanner configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::generation::GenerationConfig;
use crate::llm::LlmError;
use crate::planner::PlannerConfig;
use crate::scheduler::RateLimiterConfig;
use crate::validation::ValidationConfig;

/// Main TripPlanner configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Place lookup service
    pub geocoder: GeocoderConfig,

    /// Routing service
    pub routing: RoutingConfig,

    /// Host catalog
    pub hosts: HostsConfig,

    /// Spacing between place lookups
    pub rate_limiter: RateLimiterConfig,

    /// Debounce for refinements
    pub generation: GenerationConfig,

    /// Draft and hydration tuning
    pub planner: PlannerConfig,

    /// Validator thresholds
    pub validation: ValidationConfig,

    /// Job retention
    pub jobs: JobsConfig,

    /// Log level used when none is given on the command line
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        self.llm
            .get_api_key()
            .map_err(|e| eyre::eyre!("LLM API key not found: {}", e))?;
        if self.planner.max_attempts == 0 {
            return Err(eyre::eyre!("planner.max-attempts must be at least 1"));
        }
        if self.jobs.sweep_interval_ms == 0 {
            return Err(eyre::eyre!("jobs.sweep-interval-ms must be greater than 0"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .tripplanner.yml
        let local_config = PathBuf::from(".tripplanner.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/tripplanner/tripplanner.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tripplanner").join("tripplanner.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LlmConfig {
    /// Provider name (currently only "anthropic" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    pub api_key_env: String,

    /// File holding the API key; wins over the environment variable
    pub api_key_file: Option<PathBuf>,

    /// API base URL
    pub base_url: String,

    /// Maximum tokens per response
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            api_key_file: None,
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 8192,
            timeout_ms: 120_000,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from the key file or the environment
    pub fn get_api_key(&self) -> Result<String, LlmError> {
        if let Some(path) = &self.api_key_file {
            let key = fs::read_to_string(path)
                .map_err(|_| LlmError::MissingCredentials(path.display().to_string()))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(LlmError::MissingCredentials(path.display().to_string()));
            }
            return Ok(key.to_string());
        }
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(LlmError::MissingCredentials(self.api_key_env.clone())),
        }
    }
}

fn default_user_agent() -> String {
    format!("tripplanner/{}", env!("CARGO_PKG_VERSION"))
}

/// Place lookup service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GeocoderConfig {
    pub base_url: String,

    /// Sent with every request; public Nominatim requires one
    pub user_agent: String,

    pub timeout_ms: u64,

    /// Contact address passed along with queries
    pub email: Option<String>,

    /// Half-width of the viewbox drawn around a bias point
    pub bias_radius_deg: f64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: default_user_agent(),
            timeout_ms: 10_000,
            email: None,
            bias_radius_deg: 0.5,
        }
    }
}

/// Routing service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RoutingConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_ms: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://router.project-osrm.org".to_string(),
            user_agent: default_user_agent(),
            timeout_ms: 15_000,
        }
    }
}

/// Host catalog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HostsConfig {
    /// YAML catalog of hosts; without one host search returns nothing
    pub catalog_path: Option<PathBuf>,
}

/// Job retention
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct JobsConfig {
    /// Time a job lives after its last write
    pub ttl_ms: u64,

    /// How often expired jobs are swept
    pub sweep_interval_ms: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 3_600_000,
            sweep_interval_ms: 60_000,
        }
    }
}

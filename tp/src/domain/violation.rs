//! Violation records produced by the validators

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Blocks the plan (direction errors drive regeneration)
    Error,
    /// Advisory only
    Warn,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "ERROR"),
            Self::Warn => write!(f, "WARN"),
        }
    }
}

/// What kind of thing a violation points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Trip,
    Day,
    Activity,
    Coordinate,
    Route,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub code: String,
    pub severity: Severity,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, f64>,
    pub suggested_fix: String,
    #[serde(default)]
    pub auto_fix_applied: bool,
    pub timestamp: DateTime<Utc>,
}

impl Violation {
    pub fn new(
        code: &str,
        severity: Severity,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
        suggested_fix: impl Into<String>,
    ) -> Self {
        Self {
            code: code.to_string(),
            severity,
            entity_type,
            entity_id: entity_id.into(),
            message: message.into(),
            metrics: BTreeMap::new(),
            suggested_fix: suggested_fix.into(),
            auto_fix_applied: false,
            timestamp: Utc::now(),
        }
    }

    pub fn error(
        code: &str,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
        suggested_fix: impl Into<String>,
    ) -> Self {
        Self::new(code, Severity::Error, entity_type, entity_id, message, suggested_fix)
    }

    pub fn warn(
        code: &str,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
        suggested_fix: impl Into<String>,
    ) -> Self {
        Self::new(code, Severity::Warn, entity_type, entity_id, message, suggested_fix)
    }

    pub fn with_metric(mut self, name: &str, value: f64) -> Self {
        self.metrics.insert(name.to_string(), value);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Common validator output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    /// `valid` holds exactly when no violation is ERROR severity
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        let valid = !violations.iter().any(Violation::is_error);
        Self { valid, violations }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.is_error())
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.violations.iter().any(|v| v.code == code)
    }

    pub fn count_code(&self, code: &str) -> usize {
        self.violations.iter().filter(|v| v.code == code).count()
    }
}

//! PlannerSnapshot - one captured planning request

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A planning request as captured from the conversation
///
/// Built by the upstream extraction step. Never mutated after capture:
/// refinements arrive as new snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerSnapshot {
    pub request: String,
    pub created_at: DateTime<Utc>,
    /// Caller-defined structured context (dates, party size, interests...)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
}

impl PlannerSnapshot {
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            created_at: Utc::now(),
            context: Map::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Context rendered as `key: value` lines for prompting
    pub fn context_lines(&self) -> Vec<String> {
        self.context
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => format!("{}: {}", k, s),
                other => format!("{}: {}", k, other),
            })
            .collect()
    }
}

//! Tool error types

use thiserror::Error;

use crate::scheduler::RateLimitError;

/// Errors from the place, routing and host tools
///
/// The planner absorbs all of these with fallbacks; they only surface in
/// logs.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("No match for '{query}'")]
    NotFound { query: String },

    #[error("'{name}' resolved {distance_miles:.0} miles from its anchor (max {max_miles:.0})")]
    TooFar {
        name: String,
        distance_miles: f64,
        max_miles: f64,
    },

    #[error("Resolved coordinate for '{name}' failed geo validation")]
    Implausible { name: String },

    #[error("Service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog parse error: {0}")]
    Catalog(#[from] serde_yaml::Error),

    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_far_message() {
        let err = ToolError::TooFar {
            name: "Union Station".to_string(),
            distance_miles: 812.4,
            max_miles: 100.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("Union Station"));
        assert!(msg.contains("812"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn test_rate_limit_is_transparent() {
        let err: ToolError = RateLimitError::Closed.into();
        assert_eq!(err.to_string(), RateLimitError::Closed.to_string());
    }
}

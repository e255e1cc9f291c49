//! Rate limiting for external tool calls
//!
//! A single FIFO queue drained by one background task, spacing the start
//! of consecutive calls by a minimum interval.

mod config;
mod core;
mod queue;

pub use config::RateLimiterConfig;
pub use core::{RateLimitError, RateLimiter};
pub use queue::LimiterStats;

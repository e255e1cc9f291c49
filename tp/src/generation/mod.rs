//! Generation scheduling
//!
//! [`GenerationController`] owns one record per session key and decides when
//! a generation starts. The work itself is delegated to a
//! [`GenerationRunner`].

mod config;
mod controller;
mod error;
mod record;
mod runner;

pub use config::GenerationConfig;
pub use controller::GenerationController;
pub use error::GenerationError;
pub use record::{GenerationState, GenerationStatus, ScheduleOutcome};
pub use runner::{GenerationRunner, GenerationTask, LatestGuard};

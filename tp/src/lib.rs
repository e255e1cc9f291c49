//! TripPlanner - latest-wins itinerary generation
//!
//! A conversation produces a stream of planning snapshots. TripPlanner turns
//! the newest one into a located, checked multi-day itinerary and exposes its
//! progress through a pollable job.
//!
//! # Core Concepts
//!
//! - **Latest wins**: at most one generation per session runs; newer edits
//!   supersede older ones and stale work never becomes visible
//! - **Draft, then hydrate**: an LLM drafts a coordinate-free plan, tools
//!   locate and route it
//! - **Geometry over trust**: direction, pacing, corridor and coordinate
//!   validators check the result; direction errors drive regeneration
//!
//! # Modules
//!
//! - [`generation`] - per-session scheduling, debounce and cancellation
//! - [`jobs`] - serialized, collapsing job writes
//! - [`planner`] - the draft and hydration pipeline
//! - [`scheduler`] - rate limiter for place lookups
//! - [`validation`] - geometric validators
//! - [`tools`] - geocoding, routing and host search
//! - [`llm`] - LLM client trait and Anthropic implementation
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod generation;
pub mod jobs;
pub mod llm;
pub mod planner;
pub mod prompts;
pub mod scheduler;
pub mod service;
pub mod tools;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, LlmConfig};
pub use domain::{
    AnchorResolution, DraftItinerary, GeoPoint, ItineraryPlan, PlannerSnapshot, Severity, TripType, ValidationResult,
    Violation,
};
pub use generation::{
    GenerationConfig, GenerationController, GenerationError, GenerationRunner, GenerationState, GenerationStatus,
    GenerationTask, LatestGuard, ScheduleOutcome,
};
pub use jobs::{JobWriteQueue, ProgressReporter};
pub use llm::{AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError};
pub use planner::{DetachedContext, PipelineContext, Planner, PlannerConfig, PlannerError};
pub use scheduler::{RateLimitError, RateLimiter, RateLimiterConfig};
pub use service::{PlannerRunner, TripService};
pub use tools::{HostSearch, PlaceResolver, Router, ToolError, Toolbox};
pub use validation::{GeoConfidence, GeoValidation, Region, ValidationConfig, validate_coordinate};

//! Orchestration pipeline
//!
//! A generation runs in two stages. The draft stage asks the LLM for a
//! coordinate-free itinerary, locates the trip, and regenerates while the
//! day-to-day direction is wrong. Hydration then geocodes every anchor and
//! activity, routes each day and attaches hosts. Pacing and corridor checks
//! annotate the result without blocking it.

mod anchor;
mod config;
mod context;
mod draft;
mod error;
mod hydrate;
mod review;

use std::sync::{Arc, OnceLock};

use tracing::{debug, info};

pub use config::PlannerConfig;
pub use context::{DetachedContext, PipelineContext};
pub use draft::{DraftOutcome, extract_json, parse_draft};
pub use error::PlannerError;
pub use review::{
    corridor_stops, corridor_waypoints, day_pacing, plan_anchors, review_coordinates, review_direction, review_plan,
};

use crate::config::Config;
use crate::domain::{ItineraryPlan, JobProgress, PlannerSnapshot};
use crate::llm::LlmClient;
use crate::prompts::PromptLoader;
use crate::scheduler::{RateLimiter, RateLimiterConfig};
use crate::tools::Toolbox;
use crate::validation::ValidationConfig;

/// Runs the draft → hydrate → review pipeline
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    tools: Toolbox,
    prompts: PromptLoader,
    config: PlannerConfig,
    validation: ValidationConfig,
    limiter_config: RateLimiterConfig,
    /// Every place lookup of every generation goes through this one queue
    limiter: OnceLock<RateLimiter>,
}

impl Planner {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Toolbox,
        config: PlannerConfig,
        validation: ValidationConfig,
        limiter: RateLimiterConfig,
    ) -> Self {
        debug!(?config, "Planner::new: called");
        let prompts = PromptLoader::new(config.prompts_dir.as_ref());
        Self {
            llm,
            tools,
            prompts,
            config,
            validation,
            limiter_config: limiter,
            limiter: OnceLock::new(),
        }
    }

    /// Planner using the relevant sections of the app config
    pub fn from_config(config: &Config, llm: Arc<dyn LlmClient>, tools: Toolbox) -> Self {
        Self::new(
            llm,
            tools,
            config.planner.clone(),
            config.validation.clone(),
            config.rate_limiter.clone(),
        )
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// The planner's lookup limiter, started on first use inside the runtime
    pub(crate) fn limiter(&self) -> &RateLimiter {
        self.limiter.get_or_init(|| RateLimiter::new(&self.limiter_config))
    }

    /// The whole pipeline for one snapshot
    ///
    /// Direction errors left after the last attempt, pacing and corridor
    /// findings all end up in `plan.violations`.
    pub async fn generate(
        &self,
        snapshot: &PlannerSnapshot,
        ctx: &dyn PipelineContext,
    ) -> Result<ItineraryPlan, PlannerError> {
        info!(request = %snapshot.request, "Planner::generate: called");
        let outcome = self.plan_trip_draft(snapshot, ctx).await?;
        ctx.preview(&outcome.preview);

        let mut plan = self
            .plan_trip_from_draft(snapshot, &outcome.draft, outcome.trip_anchor, ctx)
            .await?;

        ctx.progress(JobProgress::new("validating", "Checking pacing and route"));
        let advisory = self.validate_plan(&plan, outcome.trip_type, ctx).await?;
        plan.violations = outcome.violations;
        plan.violations.extend(advisory);
        context::ensure_current(ctx)?;

        info!(
            plan = %plan.id,
            days = plan.days.len(),
            attempts = outcome.attempts,
            errors = plan.error_count(),
            warnings = plan.warning_count(),
            "Planner::generate: complete"
        );
        Ok(plan)
    }
}

//! Draft stage: LLM draft, trip anchor, preview plan, direction checks

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::Planner;
use super::anchor::CityCache;
use super::context::{PipelineContext, guarded};
use super::error::PlannerError;
use crate::domain::{
    Activity, DayPlan, DraftItinerary, GeoPoint, ItineraryPlan, JobProgress, LocationSource, Place,
    PlannerSnapshot, TripType, Violation, slot_seed,
};
use crate::llm::CompletionRequest;
use crate::prompts::DraftPromptContext;
use crate::scheduler::RateLimiter;
use crate::validation::{
    DayAnchor, build_regeneration_constraints, infer_origin_and_terminus, infer_trip_type, validate_direction,
};

/// Longest `retry-after` the draft stage sits out before giving up
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(30);

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("fence pattern is valid"));

/// What the draft stage hands to hydration
#[derive(Debug, Clone)]
pub struct DraftOutcome {
    pub draft: DraftItinerary,
    pub trip_anchor: GeoPoint,
    pub trip_type: TripType,
    /// Attempts used, 1-based
    pub attempts: u32,
    /// Placeholder plan built from per-city anchors
    pub preview: ItineraryPlan,
    /// Direction errors still present after the last attempt
    pub violations: Vec<Violation>,
}

/// Stable id for the n-th activity (0-based) of a day
pub(crate) fn activity_id(day_number: u32, index: usize) -> String {
    format!("day{}-act{}", day_number, index + 1)
}

/// Pull the JSON object out of a completion
///
/// Models wrap JSON in code fences or surround it with prose; both are
/// stripped.
pub fn extract_json(text: &str) -> Option<&str> {
    let body = match JSON_FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => text,
    };
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (start < end).then(|| &body[start..=end])
}

/// Parse and normalize a draft completion
///
/// Days are ordered by their declared number and renumbered from 1.
pub fn parse_draft(text: &str) -> Result<DraftItinerary, PlannerError> {
    debug!(len = text.len(), "parse_draft: called");
    let json = extract_json(text).ok_or_else(|| PlannerError::Draft("no JSON object in completion".to_string()))?;
    let mut draft: DraftItinerary =
        serde_json::from_str(json).map_err(|e| PlannerError::Draft(format!("malformed draft: {}", e)))?;

    if draft.days.is_empty() {
        return Err(PlannerError::Draft("draft has no days".to_string()));
    }
    if draft.city.trim().is_empty() {
        return Err(PlannerError::Draft("draft has no main city".to_string()));
    }

    draft.days.sort_by_key(|d| d.day_number);
    for (i, day) in draft.days.iter_mut().enumerate() {
        day.day_number = i as u32 + 1;
    }
    Ok(draft)
}

impl Planner {
    /// One LLM completion producing a coordinate-free draft
    pub async fn draft_itinerary(
        &self,
        snapshot: &PlannerSnapshot,
        constraints: &[String],
    ) -> Result<DraftItinerary, PlannerError> {
        debug!(constraints = constraints.len(), "Planner::draft_itinerary: called");
        let system = self
            .prompts
            .draft_prompt(&DraftPromptContext::new(snapshot, constraints))
            .map_err(|e| PlannerError::Prompt(e.to_string()))?;

        let request = CompletionRequest::single(system, snapshot.request.clone(), self.config.max_tokens);
        let response = match self.llm.complete(request.clone()).await {
            Ok(response) => response,
            Err(e) => match e.retry_after() {
                Some(wait) if wait <= MAX_RATE_LIMIT_WAIT => {
                    warn!(?wait, "Planner::draft_itinerary: rate limited, waiting once");
                    tokio::time::sleep(wait).await;
                    self.llm.complete(request).await?
                }
                _ => return Err(e.into()),
            },
        };
        debug!(stop_reason = ?response.stop_reason, tokens = response.usage.total(), "Planner::draft_itinerary: completed");

        let text = response
            .content
            .ok_or_else(|| PlannerError::Draft("empty completion".to_string()))?;
        parse_draft(&text)
    }

    /// Draft, anchor and direction-check, regenerating on direction errors
    pub async fn plan_trip_draft(
        &self,
        snapshot: &PlannerSnapshot,
        ctx: &dyn PipelineContext,
    ) -> Result<DraftOutcome, PlannerError> {
        let max_attempts = self.config.max_attempts.max(1);
        info!(%max_attempts, "Planner::plan_trip_draft: called");
        let limiter = self.limiter();
        let mut cities = CityCache::new();
        let mut constraints: Vec<String> = Vec::new();
        let mut attempt = 0;

        loop {
            attempt += 1;
            ctx.progress(JobProgress::new(
                "drafting",
                format!("Drafting itinerary (attempt {} of {})", attempt, max_attempts),
            ));

            let draft = guarded(ctx, self.draft_itinerary(snapshot, &constraints)).await??;
            debug!(%attempt, days = draft.days.len(), "Planner::plan_trip_draft: draft received");

            let resolution = self.resolve_trip_anchor(&draft, limiter, ctx).await?;
            let Some(trip_anchor) = resolution.point() else {
                return Err(PlannerError::NoAnchor {
                    city: draft.city.clone(),
                    country: draft.country.clone(),
                });
            };

            let located = self.preview_anchors(&draft, trip_anchor, limiter, ctx, &mut cities).await?;
            let points: Vec<GeoPoint> = located.iter().map(|p| p.unwrap_or(trip_anchor)).collect();
            let preview = self.preview_plan(snapshot, &draft, &points);
            // A day whose city could not be found says nothing about direction
            let anchors: Vec<DayAnchor> = preview
                .days
                .iter()
                .zip(&located)
                .filter_map(|(day, point)| point.map(|p| DayAnchor::new(day.day_number, Some(day.city.as_str()), p)))
                .collect();

            let trip_type = infer_trip_type(&anchors, draft.trip_type, self.validation.direction_tolerance_miles);
            let violations = self.check_direction(&anchors, trip_type);
            let errors: Vec<Violation> = violations.into_iter().filter(Violation::is_error).collect();

            if errors.is_empty() || attempt >= max_attempts {
                if errors.is_empty() {
                    info!(%attempt, %trip_type, "Planner::plan_trip_draft: direction checks passed");
                } else {
                    warn!(%attempt, errors = errors.len(), "Planner::plan_trip_draft: attempts exhausted, keeping violations");
                }
                return Ok(DraftOutcome {
                    draft,
                    trip_anchor,
                    trip_type,
                    attempts: attempt,
                    preview,
                    violations: errors,
                });
            }

            let added = build_regeneration_constraints(&errors);
            info!(%attempt, errors = errors.len(), new_constraints = added.len(), "Planner::plan_trip_draft: regenerating");
            for directive in added {
                if !constraints.contains(&directive) {
                    constraints.push(directive);
                }
            }
        }
    }

    fn check_direction(&self, anchors: &[DayAnchor], trip_type: TripType) -> Vec<Violation> {
        if anchors.len() < 2 {
            return Vec::new();
        }
        match infer_origin_and_terminus(anchors, trip_type) {
            Some((origin, terminus)) => {
                validate_direction(anchors, &origin, &terminus, trip_type, &self.validation).violations
            }
            None => Vec::new(),
        }
    }

    /// One point per day: the trip anchor for main-city days, otherwise the
    /// day's own city, `None` when that city cannot be found
    async fn preview_anchors(
        &self,
        draft: &DraftItinerary,
        trip_anchor: GeoPoint,
        limiter: &RateLimiter,
        ctx: &dyn PipelineContext,
        cities: &mut CityCache,
    ) -> Result<Vec<Option<GeoPoint>>, PlannerError> {
        let mut points = Vec::with_capacity(draft.days.len());
        for day in &draft.days {
            if draft.is_main_city(day) {
                points.push(Some(trip_anchor));
                continue;
            }
            let (city, country) = draft.day_locale(day);
            let point = self.resolve_city(limiter, ctx, city, country, cities).await?;
            points.push(point);
        }
        Ok(points)
    }

    /// Placeholder plan with activities jittered deterministically around
    /// each day's point
    fn preview_plan(&self, snapshot: &PlannerSnapshot, draft: &DraftItinerary, points: &[GeoPoint]) -> ItineraryPlan {
        let days = draft
            .days
            .iter()
            .zip(points)
            .enumerate()
            .map(|(day_idx, (day, point))| {
                let (city, country) = draft.day_locale(day);
                let activities = day
                    .activities
                    .iter()
                    .enumerate()
                    .map(|(act_idx, activity)| {
                        let id = activity_id(day.day_number, act_idx);
                        let location = point.seeded_jitter(slot_seed(day_idx, act_idx), self.config.draft_jitter_deg);
                        Activity {
                            place: Place::synthetic(format!("draft-{}", id), &activity.name, location, "draft"),
                            id,
                            name: activity.name.clone(),
                            time_slot: activity.time_slot,
                            notes: activity.notes.clone(),
                            source: LocationSource::Draft,
                        }
                    })
                    .collect();
                DayPlan {
                    day_number: day.day_number,
                    title: day.title.clone(),
                    city: city.to_string(),
                    country: country.to_string(),
                    anchor_location: Some(Place::synthetic(
                        format!("anchor-day-{}", day.day_number),
                        &day.anchor_area,
                        *point,
                        "anchor",
                    )),
                    activities,
                    navigation_events: Vec::new(),
                    suggested_hosts: Vec::new(),
                }
            })
            .collect();

        ItineraryPlan {
            id: format!("preview-{}", uuid::Uuid::now_v7()),
            request: snapshot.request.clone(),
            title: draft.title.clone(),
            summary: draft.summary.clone(),
            days,
            violations: Vec::new(),
        }
    }
}

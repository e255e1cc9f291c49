//! Hydration stage: geocode, route and attach hosts day by day

use std::sync::atomic::{AtomicU32, Ordering};

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::Planner;
use super::context::{PipelineContext, ensure_current, guarded};
use super::draft::activity_id;
use super::error::PlannerError;
use crate::domain::{
    Activity, AnchorResolution, DayPlan, DraftDay, DraftItinerary, GeoPoint, HostCard, ItineraryPlan, JobProgress,
    LocationSource, NavigationAction, Place, PlannerSnapshot,
};
use crate::scheduler::RateLimiter;
use crate::tools::Waypoint;

impl Planner {
    /// Turn a draft into a fully located plan
    ///
    /// Days run concurrently; every place lookup goes through the planner's
    /// rate limiter. Tool failures degrade the plan instead of failing it.
    pub async fn plan_trip_from_draft(
        &self,
        snapshot: &PlannerSnapshot,
        draft: &DraftItinerary,
        trip_anchor: GeoPoint,
        ctx: &dyn PipelineContext,
    ) -> Result<ItineraryPlan, PlannerError> {
        let total = draft.days.len() as u32;
        info!(days = total, %trip_anchor, "Planner::plan_trip_from_draft: called");
        let limiter = self.limiter();
        let finished = AtomicU32::new(0);
        ctx.progress(JobProgress::new("hydrating", "Locating places").with_count(0, total));

        let finished = &finished;
        let days = draft.days.iter().map(|day| async move {
            let plan = self.hydrate_day(draft, day, trip_anchor, limiter, ctx).await?;
            let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
            ctx.progress(
                JobProgress::new("hydrating", format!("Day {} ready ({} of {})", day.day_number, done, total))
                    .with_count(done, total),
            );
            Ok::<_, PlannerError>(plan)
        });
        let days = join_all(days).await.into_iter().collect::<Result<Vec<_>, _>>()?;
        ensure_current(ctx)?;

        let stats = limiter.stats();
        debug!(
            lookups = stats.total_executed,
            avg_wait_ms = stats.average_wait_ms(),
            "Planner::plan_trip_from_draft: limiter stats so far"
        );

        Ok(ItineraryPlan {
            id: format!("plan-{}", uuid::Uuid::now_v7()),
            request: snapshot.request.clone(),
            title: draft.title.clone(),
            summary: draft.summary.clone(),
            days,
            violations: Vec::new(),
        })
    }

    /// Where a day is centred
    ///
    /// Only main-city days are biased toward the trip anchor; a secondary
    /// city's anchor area is searched unbiased and falls back to the city.
    pub async fn resolve_day_anchor(
        &self,
        draft: &DraftItinerary,
        day: &DraftDay,
        trip_anchor: GeoPoint,
        limiter: &RateLimiter,
        ctx: &dyn PipelineContext,
    ) -> Result<AnchorResolution, PlannerError> {
        let (city, country) = draft.day_locale(day);
        let main = draft.is_main_city(day);
        let locale = format!("{}, {}", city, country);
        debug!(day = day.day_number, %city, main, area = %day.anchor_area, "Planner::resolve_day_anchor: called");

        let bias = main.then_some(trip_anchor);
        if let Some(place) = self.lookup(limiter, ctx, &day.anchor_area, &locale, bias).await? {
            return Ok(AnchorResolution::Resolved(place));
        }
        if main {
            return Ok(AnchorResolution::Fallback(trip_anchor));
        }
        match self.lookup(limiter, ctx, city, country, None).await? {
            Some(place) => Ok(AnchorResolution::Fallback(place.location)),
            None => Ok(AnchorResolution::Failed),
        }
    }

    async fn hydrate_day(
        &self,
        draft: &DraftItinerary,
        day: &DraftDay,
        trip_anchor: GeoPoint,
        limiter: &RateLimiter,
        ctx: &dyn PipelineContext,
    ) -> Result<DayPlan, PlannerError> {
        let (city, country) = draft.day_locale(day);
        let locale = format!("{}, {}", city, country);
        debug!(day = day.day_number, %locale, "Planner::hydrate_day: called");

        let resolution = self.resolve_day_anchor(draft, day, trip_anchor, limiter, ctx).await?;
        let anchor = resolution.point();
        let anchor_location = match resolution {
            AnchorResolution::Resolved(place) => Some(place),
            AnchorResolution::Fallback(point) => Some(Place::synthetic(
                format!("anchor-day-{}", day.day_number),
                city,
                point,
                "city",
            )),
            AnchorResolution::Failed => {
                warn!(day = day.day_number, %locale, "Planner::hydrate_day: no anchor for day");
                None
            }
        };

        let lookups = day
            .activities
            .iter()
            .map(|activity| self.lookup(limiter, ctx, &activity.name, &locale, anchor));
        let results = join_all(lookups).await;

        let mut activities = Vec::with_capacity(day.activities.len());
        for (idx, (planned, result)) in day.activities.iter().zip(results).enumerate() {
            let id = activity_id(day.day_number, idx);
            let (place, source) = match (result?, anchor) {
                (Some(place), _) => (place, LocationSource::Resolved),
                (None, Some(anchor)) => {
                    let point = anchor.random_jitter(self.config.fallback_jitter_deg);
                    let place = Place::synthetic(format!("fallback-{}", id), &planned.name, point, "fallback");
                    (place, LocationSource::Fallback)
                }
                (None, None) => {
                    warn!(day = day.day_number, activity = %planned.name, "Planner::hydrate_day: dropping activity");
                    continue;
                }
            };
            activities.push(Activity {
                id,
                name: planned.name.clone(),
                time_slot: planned.time_slot,
                notes: planned.notes.clone(),
                place,
                source,
            });
        }

        let suggested_hosts = self.find_hosts(day, &locale, ctx).await?;
        let navigation_events = self.route_day(day.day_number, &activities, ctx).await?;

        Ok(DayPlan {
            day_number: day.day_number,
            title: day.title.clone(),
            city: city.to_string(),
            country: country.to_string(),
            anchor_location,
            activities,
            navigation_events,
            suggested_hosts,
        })
    }

    async fn find_hosts(&self, day: &DraftDay, locale: &str, ctx: &dyn PipelineContext) -> Result<Vec<HostCard>, PlannerError> {
        let search = self.tools.hosts.search(&day.title, locale, self.config.hosts_per_day);
        match guarded(ctx, search).await? {
            Ok(hosts) => Ok(hosts.into_iter().map(HostCard::from).collect()),
            Err(e) => {
                warn!(day = day.day_number, %locale, error = %e, "Planner::find_hosts: host search failed");
                Ok(Vec::new())
            }
        }
    }

    /// Navigation between consecutive activities
    ///
    /// Needs at least two geocoded activities; fallback points alone are not
    /// worth routing.
    async fn route_day(
        &self,
        day_number: u32,
        activities: &[Activity],
        ctx: &dyn PipelineContext,
    ) -> Result<Vec<NavigationAction>, PlannerError> {
        let resolved = activities.iter().filter(|a| a.source == LocationSource::Resolved).count();
        if resolved < 2 {
            debug!(day = day_number, resolved, "Planner::route_day: not enough resolved activities");
            return Ok(Vec::new());
        }

        let waypoints: Vec<Waypoint> = activities.iter().map(|a| Waypoint::new(&a.name, a.location())).collect();
        let route = match guarded(ctx, self.tools.router.route(&waypoints, self.config.activity_mode)).await? {
            Ok(route) => route,
            Err(e) => {
                warn!(day = day_number, error = %e, "Planner::route_day: routing failed");
                return Ok(Vec::new());
            }
        };

        Ok(route
            .segments
            .into_iter()
            .zip(activities.windows(2))
            .map(|(segment, pair)| NavigationAction {
                from_activity_id: pair[0].id.clone(),
                to_activity_id: pair[1].id.clone(),
                mode: segment.mode,
                distance_meters: segment.distance_meters,
                duration_minutes: segment.duration_minutes,
                instructions: segment.instructions,
            })
            .collect())
    }
}

//! Rate-limited place lookups and anchor resolution

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::Planner;
use super::context::{PipelineContext, guarded};
use super::error::PlannerError;
use crate::domain::{AnchorResolution, DraftItinerary, GeoPoint, Place};
use crate::scheduler::RateLimiter;
use crate::tools::{ResolvedPlace, ToolError};
use crate::validation::{GeoConfidence, validate_coordinate};

/// Resolved city points keyed by "city|country", shared across attempts
pub(crate) type CityCache = HashMap<String, Option<GeoPoint>>;

impl Planner {
    /// Resolve one place through the shared limiter
    ///
    /// Tool failures, far-away hits and implausible coordinates come back as
    /// `Ok(None)`; only cancellation or staleness is an error.
    pub(crate) async fn lookup(
        &self,
        limiter: &RateLimiter,
        ctx: &dyn PipelineContext,
        name: &str,
        context: &str,
        bias: Option<GeoPoint>,
    ) -> Result<Option<Place>, PlannerError> {
        debug!(%name, %context, ?bias, "Planner::lookup: called");
        let resolver = Arc::clone(&self.tools.resolver);
        let (query_name, query_context) = (name.to_string(), context.to_string());
        let scheduled = limiter.schedule(move || async move { resolver.resolve(&query_name, &query_context, bias).await });

        let outcome = match guarded(ctx, scheduled).await? {
            Ok(result) => result,
            Err(e) => Err(ToolError::from(e)),
        };

        match outcome.and_then(|resolved| self.accept(resolved, bias)) {
            Ok(place) => Ok(Some(place)),
            Err(e) => {
                warn!(%name, %context, error = %e, "Planner::lookup: unresolved");
                Ok(None)
            }
        }
    }

    /// Reject hits too far from the bias point or failing geo validation
    fn accept(&self, resolved: ResolvedPlace, bias: Option<GeoPoint>) -> Result<Place, ToolError> {
        let distance = bias.map(|anchor| anchor.distance_miles(&resolved.location));
        let max_miles = self.config.max_anchor_distance_miles;
        if let Some(distance) = distance.filter(|d| *d > max_miles) {
            return Err(ToolError::TooFar {
                name: resolved.name,
                distance_miles: distance,
                max_miles,
            });
        }

        let geo = validate_coordinate(
            resolved.location.lat,
            resolved.location.lng,
            &self.validation.geo_options(self.config.region, &[]),
        );
        if geo.confidence == GeoConfidence::Failed {
            return Err(ToolError::Implausible { name: resolved.name });
        }

        let mut place = Place::from(resolved);
        if distance.is_some() {
            place.distance_to_anchor_miles = distance;
        }
        place.geo_validation = Some(geo);
        Ok(place)
    }

    /// Locate the trip as a whole
    ///
    /// Tries the main city first, then the first day's own city when it
    /// differs. The latter is only a coarse point.
    pub async fn resolve_trip_anchor(
        &self,
        draft: &DraftItinerary,
        limiter: &RateLimiter,
        ctx: &dyn PipelineContext,
    ) -> Result<AnchorResolution, PlannerError> {
        debug!(city = %draft.city, country = %draft.country, "Planner::resolve_trip_anchor: called");
        if let Some(place) = self.lookup(limiter, ctx, &draft.city, &draft.country, None).await? {
            return Ok(AnchorResolution::Resolved(place));
        }

        if let Some(first) = draft.days.first() {
            let (city, country) = draft.day_locale(first);
            let same = city.eq_ignore_ascii_case(&draft.city) && country.eq_ignore_ascii_case(&draft.country);
            if !same {
                debug!(%city, %country, "Planner::resolve_trip_anchor: trying first day's city");
                if let Some(place) = self.lookup(limiter, ctx, city, country, None).await? {
                    return Ok(AnchorResolution::Fallback(place.location));
                }
            }
        }

        warn!(city = %draft.city, country = %draft.country, "Planner::resolve_trip_anchor: no anchor");
        Ok(AnchorResolution::Failed)
    }

    /// Point for a secondary city, memoized in `cache`
    pub(crate) async fn resolve_city(
        &self,
        limiter: &RateLimiter,
        ctx: &dyn PipelineContext,
        city: &str,
        country: &str,
        cache: &mut CityCache,
    ) -> Result<Option<GeoPoint>, PlannerError> {
        let key = format!("{}|{}", city.trim().to_lowercase(), country.trim().to_lowercase());
        if let Some(point) = cache.get(&key) {
            debug!(%city, "Planner::resolve_city: cached");
            return Ok(*point);
        }
        let point = self.lookup(limiter, ctx, city, country, None).await?.map(|p| p.location);
        cache.insert(key, point);
        Ok(point)
    }
}

//! Advisory checks over a hydrated plan

use tracing::{debug, warn};

use super::Planner;
use super::context::{PipelineContext, guarded};
use super::error::PlannerError;
use crate::domain::{GeoPoint, ItineraryPlan, TravelMode, TripType, ValidationResult, Violation, miles_to_meters};
use crate::tools::Waypoint;
use crate::validation::{
    CorridorStop, DayAnchor, DayPacing, Region, ValidationConfig, infer_origin_and_terminus,
    infer_trip_type, validate_coordinate, validate_corridor, validate_direction, validate_pacing,
};

/// Day anchors of a plan, in day order
pub fn plan_anchors(plan: &ItineraryPlan) -> Vec<DayAnchor> {
    plan.day_anchors()
        .into_iter()
        .map(|(day, city, point)| DayAnchor::new(day, city, point))
        .collect()
}

/// Per-day pacing inputs
///
/// A day's drive is the road-adjusted hop from the previous day's anchor
/// plus any driving between its own activities.
pub fn day_pacing(plan: &ItineraryPlan, road_factor: f64) -> Vec<DayPacing> {
    let mut previous: Option<GeoPoint> = None;
    plan.days
        .iter()
        .map(|day| {
            let anchor = day.anchor_point();
            let hop_meters = match (previous, anchor) {
                (Some(from), Some(to)) => miles_to_meters(from.distance_miles(&to)) * road_factor,
                _ => 0.0,
            };
            if anchor.is_some() {
                previous = anchor;
            }
            let local_meters: f64 = day
                .navigation_events
                .iter()
                .filter(|n| n.mode == TravelMode::Driving)
                .map(|n| n.distance_meters)
                .sum();
            DayPacing::new(day.day_number, day.activities.len(), hop_meters + local_meters)
        })
        .collect()
}

/// Direction check over a finished plan
pub fn review_direction(plan: &ItineraryPlan, hint: Option<TripType>, config: &ValidationConfig) -> ValidationResult {
    let anchors = plan_anchors(plan);
    let trip_type = infer_trip_type(&anchors, hint, config.direction_tolerance_miles);
    match infer_origin_and_terminus(&anchors, trip_type) {
        Some((origin, terminus)) if anchors.len() >= 2 => {
            validate_direction(&anchors, &origin, &terminus, trip_type, config)
        }
        _ => ValidationResult::from_violations(Vec::new()),
    }
}

/// Geo validation of every located point, each judged against the others
pub fn review_coordinates(plan: &ItineraryPlan, region: Option<Region>, config: &ValidationConfig) -> Vec<Violation> {
    let points: Vec<GeoPoint> = plan
        .days
        .iter()
        .flat_map(|d| d.anchor_point().into_iter().chain(d.activities.iter().map(|a| a.location())))
        .collect();
    debug!(points = points.len(), "review_coordinates: called");

    let options = config.geo_options(region, &points);
    let mut violations: Vec<Violation> = Vec::new();
    for point in &points {
        for violation in validate_coordinate(point.lat, point.lng, &options).violations {
            let duplicate = violations
                .iter()
                .any(|v| v.code == violation.code && v.entity_id == violation.entity_id);
            if !duplicate {
                violations.push(violation);
            }
        }
    }
    violations
}

/// Waypoints describing the trip's overall path
///
/// One-way trips run first to last anchor. Round trips go out to the day
/// farthest from the start and come back.
pub fn corridor_waypoints(anchors: &[DayAnchor], trip_type: TripType) -> Vec<Waypoint> {
    let (Some(first), Some(last)) = (anchors.first(), anchors.last()) else {
        return Vec::new();
    };
    let label = |a: &DayAnchor| a.city.clone().unwrap_or_else(|| format!("Day {}", a.day_number));

    let mut waypoints = vec![Waypoint::new(label(first), first.point)];
    if trip_type == TripType::RoundTrip {
        let farthest = anchors.iter().max_by(|a, b| {
            first
                .point
                .distance_miles(&a.point)
                .total_cmp(&first.point.distance_miles(&b.point))
        });
        if let Some(farthest) = farthest.filter(|f| f.day_number != first.day_number) {
            waypoints.push(Waypoint::new(label(farthest), farthest.point));
        }
    }
    waypoints.push(Waypoint::new(label(last), last.point));
    waypoints
}

/// Every activity of the plan, for corridor checks
pub fn corridor_stops(plan: &ItineraryPlan) -> Vec<CorridorStop> {
    plan.days
        .iter()
        .flat_map(|d| d.activities.iter())
        .map(|a| CorridorStop::new(&a.id, &a.name, a.location()))
        .collect()
}

/// Every offline check over a saved plan
///
/// The corridor is only checked when a route polyline is at hand.
pub fn review_plan(
    plan: &ItineraryPlan,
    polyline: Option<&[GeoPoint]>,
    hint: Option<TripType>,
    region: Option<Region>,
    road_factor: f64,
    config: &ValidationConfig,
) -> Vec<Violation> {
    debug!(plan = %plan.id, has_polyline = polyline.is_some(), "review_plan: called");
    let mut violations = review_direction(plan, hint, config).violations;
    violations.extend(validate_pacing(&day_pacing(plan, road_factor), config).violations);
    violations.extend(review_coordinates(plan, region, config));
    if let Some(polyline) = polyline {
        violations.extend(validate_corridor(polyline, &plan_anchors(plan), &corridor_stops(plan), config).violations);
    }
    violations
}

impl Planner {
    /// Pacing and corridor checks for a hydrated plan
    ///
    /// All findings are advisory. An unreachable router only yields a
    /// "no route" warning.
    pub async fn validate_plan(
        &self,
        plan: &ItineraryPlan,
        trip_type: TripType,
        ctx: &dyn PipelineContext,
    ) -> Result<Vec<Violation>, PlannerError> {
        debug!(plan = %plan.id, %trip_type, "Planner::validate_plan: called");
        let pacing = validate_pacing(&day_pacing(plan, self.config.road_factor), &self.validation);
        let mut violations = pacing.violations;

        let anchors = plan_anchors(plan);
        if anchors.len() < 2 {
            return Ok(violations);
        }

        let waypoints = corridor_waypoints(&anchors, trip_type);
        let polyline = match guarded(ctx, self.tools.router.route(&waypoints, TravelMode::Driving)).await? {
            Ok(route) => route.geometry,
            Err(e) => {
                warn!(error = %e, "Planner::validate_plan: corridor route unavailable");
                Vec::new()
            }
        };

        let stops = corridor_stops(plan);
        violations.extend(validate_corridor(&polyline, &anchors, &stops, &self.validation).violations);
        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Activity, DayPlan, LocationSource, NavigationAction, Place, Severity, TimeSlot};
    use crate::planner::context::mock::RecordingContext;
    use crate::planner::test_support::{TestPlanner, planner_with};
    use crate::tools::mock::{MockResolver, MockRouter};
    use crate::validation::{CODE_EMPTY_DAY, CODE_ISOLATED, CODE_LONG_DRIVE, CODE_NO_ROUTE, CODE_SPARSE_DAY};

    fn activity(id: &str, lat: f64, lng: f64) -> Activity {
        Activity {
            id: id.into(),
            name: id.into(),
            time_slot: TimeSlot::Morning,
            notes: None,
            place: Place::synthetic(id, id, GeoPoint::new(lat, lng), "test"),
            source: LocationSource::Resolved,
        }
    }

    fn day(n: u32, city: &str, lat: f64, lng: f64, activities: Vec<Activity>) -> DayPlan {
        DayPlan {
            day_number: n,
            title: format!("Day {}", n),
            city: city.into(),
            country: "USA".into(),
            anchor_location: Some(Place::synthetic(format!("a{}", n), city, GeoPoint::new(lat, lng), "city")),
            activities,
            navigation_events: vec![],
            suggested_hosts: vec![],
        }
    }

    fn plan(days: Vec<DayPlan>) -> ItineraryPlan {
        ItineraryPlan {
            id: "plan-test".into(),
            request: "r".into(),
            title: "t".into(),
            summary: String::new(),
            days,
            violations: vec![],
        }
    }

    fn la_to_chicago() -> ItineraryPlan {
        plan(vec![
            day(1, "Los Angeles", 34.0522, -118.2437, vec![activity("a", 34.06, -118.25), activity("b", 34.07, -118.3)]),
            day(2, "Albuquerque", 35.0844, -106.6504, vec![activity("c", 35.09, -106.65), activity("d", 35.1, -106.6)]),
            day(3, "Chicago", 41.8781, -87.6298, vec![activity("e", 41.88, -87.63), activity("f", 41.89, -87.62)]),
        ])
    }

    #[test]
    fn test_day_pacing_uses_road_factor() {
        let p = la_to_chicago();
        let pacing = day_pacing(&p, 1.25);
        assert_eq!(pacing[0].driving_distance_meters, 0.0);
        let hop = GeoPoint::new(34.0522, -118.2437).distance_miles(&GeoPoint::new(35.0844, -106.6504));
        assert!((pacing[1].driving_distance_meters - miles_to_meters(hop) * 1.25).abs() < 1e-6);
    }

    #[test]
    fn test_day_pacing_adds_local_driving_only() {
        let mut p = la_to_chicago();
        p.days[0].navigation_events = vec![
            NavigationAction {
                from_activity_id: "a".into(),
                to_activity_id: "b".into(),
                mode: TravelMode::Driving,
                distance_meters: 5000.0,
                duration_minutes: 8.0,
                instructions: vec![],
            },
            NavigationAction {
                from_activity_id: "b".into(),
                to_activity_id: "a".into(),
                mode: TravelMode::Walking,
                distance_meters: 700.0,
                duration_minutes: 9.0,
                instructions: vec![],
            },
        ];
        assert_eq!(day_pacing(&p, 1.25)[0].driving_distance_meters, 5000.0);
    }

    #[test]
    fn test_day_pacing_skips_missing_anchor() {
        let mut p = la_to_chicago();
        p.days[1].anchor_location = None;
        let pacing = day_pacing(&p, 1.0);
        assert_eq!(pacing[1].driving_distance_meters, 0.0);
        let hop = GeoPoint::new(34.0522, -118.2437).distance_miles(&GeoPoint::new(41.8781, -87.6298));
        assert!((pacing[2].driving_distance_meters - miles_to_meters(hop)).abs() < 1e-6);
    }

    #[test]
    fn test_review_direction_clean() {
        let result = review_direction(&la_to_chicago(), None, &ValidationConfig::default());
        assert!(result.valid);
    }

    #[test]
    fn test_review_coordinates_flags_isolated_point() {
        let mut p = la_to_chicago();
        p.days[2].activities.push(activity("far", 47.6062, -122.3321));
        let violations = review_coordinates(&p, None, &ValidationConfig::default());
        assert!(
            violations
                .iter()
                .any(|v| v.code == CODE_ISOLATED && v.entity_id == "47.6062,-122.3321")
        );
        assert!(violations.iter().all(|v| v.severity == Severity::Warn));
    }

    #[test]
    fn test_review_plan_corridor_only_with_polyline() {
        let p = la_to_chicago();
        let config = ValidationConfig::default();

        let offline = review_plan(&p, None, None, None, 1.25, &config);
        assert!(offline.iter().any(|v| v.code == CODE_LONG_DRIVE));
        assert!(!offline.iter().any(|v| v.code == CODE_NO_ROUTE));

        let empty: Vec<GeoPoint> = Vec::new();
        let with_route = review_plan(&p, Some(&empty), None, None, 1.25, &config);
        assert!(with_route.iter().any(|v| v.code == CODE_NO_ROUTE));
    }

    #[test]
    fn test_corridor_waypoints_one_way() {
        let anchors = plan_anchors(&la_to_chicago());
        let waypoints = corridor_waypoints(&anchors, TripType::OneWay);
        assert_eq!(waypoints.len(), 2);
        assert_eq!(waypoints[0].name, "Los Angeles");
        assert_eq!(waypoints[1].name, "Chicago");
    }

    #[test]
    fn test_corridor_waypoints_round_trip() {
        let p = plan(vec![
            day(1, "Los Angeles", 34.0522, -118.2437, vec![]),
            day(2, "Las Vegas", 36.1699, -115.1398, vec![]),
            day(3, "Flagstaff", 35.1983, -111.6513, vec![]),
            day(4, "Los Angeles", 34.0522, -118.2437, vec![]),
        ]);
        let waypoints = corridor_waypoints(&plan_anchors(&p), TripType::RoundTrip);
        let names: Vec<&str> = waypoints.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["Los Angeles", "Flagstaff", "Los Angeles"]);
    }

    #[tokio::test]
    async fn test_validate_plan_long_drives() {
        let planner = planner_with(MockResolver::new(), vec![]);
        let ctx = RecordingContext::new();
        let violations = planner
            .validate_plan(&la_to_chicago(), TripType::OneWay, &ctx)
            .await
            .unwrap();
        assert!(violations.iter().any(|v| v.code == CODE_LONG_DRIVE && v.entity_id == "day-2"));
        assert!(!violations.iter().any(|v| v.code == CODE_NO_ROUTE));
    }

    #[tokio::test]
    async fn test_validate_plan_router_down() {
        let planner = TestPlanner::build(MockResolver::new(), MockRouter::failing(), vec![], 0);
        let ctx = RecordingContext::new();
        let violations = planner
            .validate_plan(&la_to_chicago(), TripType::OneWay, &ctx)
            .await
            .unwrap();
        assert!(violations.iter().any(|v| v.code == CODE_NO_ROUTE));
        assert!(violations.iter().all(|v| v.severity == Severity::Warn));
    }

    #[tokio::test]
    async fn test_validate_plan_empty_day() {
        let mut p = la_to_chicago();
        p.days[1].activities.clear();
        p.days[0].activities.truncate(1);
        p.days[2].activities.truncate(1);
        let planner = planner_with(MockResolver::new(), vec![]);
        let ctx = RecordingContext::new();
        let violations = planner.validate_plan(&p, TripType::OneWay, &ctx).await.unwrap();
        assert!(violations.iter().any(|v| v.code == CODE_EMPTY_DAY && v.entity_id == "day-2"));
        assert!(violations.iter().any(|v| v.code == CODE_SPARSE_DAY && v.entity_id == "day-1"));
        // A long driving day is exempt from the activity minimum
        assert!(!violations.iter().any(|v| v.code == CODE_SPARSE_DAY && v.entity_id == "day-3"));
    }
}

//! Route corridor checks
//!
//! Distances are measured perpendicular to the nearest polyline segment on a
//! local equirectangular projection, which is plenty accurate at the tens of
//! miles these thresholds care about.

use tracing::debug;

use super::ValidationConfig;
use super::direction::DayAnchor;
use crate::domain::{EARTH_RADIUS_MILES, EntityType, GeoPoint, ValidationResult, Violation};

pub const CODE_NO_ROUTE: &str = "INV-CORR-01";
pub const CODE_ANCHOR_OFF_ROUTE: &str = "INV-CORR-02";
pub const CODE_ACTIVITY_OFF_ROUTE: &str = "INV-CORR-03";

/// An individual stop to check against the corridor
#[derive(Debug, Clone, PartialEq)]
pub struct CorridorStop {
    pub id: String,
    pub name: String,
    pub point: GeoPoint,
}

impl CorridorStop {
    pub fn new(id: impl Into<String>, name: impl Into<String>, point: GeoPoint) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            point,
        }
    }
}

/// Miles from `p` to the segment `a`-`b`
pub fn distance_to_segment_miles(p: &GeoPoint, a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat0 = ((a.lat + b.lat + p.lat) / 3.0).to_radians();
    let project = |g: &GeoPoint| {
        (
            g.lng.to_radians() * lat0.cos() * EARTH_RADIUS_MILES,
            g.lat.to_radians() * EARTH_RADIUS_MILES,
        )
    };
    let (px, py) = project(p);
    let (ax, ay) = project(a);
    let (bx, by) = project(b);

    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

/// Miles from `p` to the nearest segment of `polyline`
pub fn distance_to_polyline_miles(p: &GeoPoint, polyline: &[GeoPoint]) -> f64 {
    match polyline {
        [] => f64::INFINITY,
        [only] => p.distance_miles(only),
        _ => polyline
            .windows(2)
            .map(|w| distance_to_segment_miles(p, &w[0], &w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

pub fn validate_corridor(
    polyline: &[GeoPoint],
    anchors: &[DayAnchor],
    activities: &[CorridorStop],
    config: &ValidationConfig,
) -> ValidationResult {
    debug!(points = polyline.len(), anchors = anchors.len(), activities = activities.len(), "validate_corridor: called");
    let mut violations = Vec::new();

    if polyline.len() < 2 {
        violations.push(
            Violation::warn(
                CODE_NO_ROUTE,
                EntityType::Route,
                "route",
                "Route polyline has fewer than 2 points; corridor cannot be validated",
                "Provide a driving route between the first and last stops",
            )
            .with_metric("points", polyline.len() as f64),
        );
        return ValidationResult::from_violations(violations);
    }

    for anchor in anchors {
        let off = distance_to_polyline_miles(&anchor.point, polyline);
        if off > config.corridor_anchor_miles {
            debug!(day = anchor.day_number, off, "validate_corridor: anchor off route");
            let place = anchor.city.clone().unwrap_or_else(|| format!("Day {}", anchor.day_number));
            violations.push(
                Violation::warn(
                    CODE_ANCHOR_OFF_ROUTE,
                    EntityType::Day,
                    format!("day-{}", anchor.day_number),
                    format!("{} is {:.0} miles off the driving route", place, off),
                    "should stay closer to the main route",
                )
                .with_metric("offRouteMiles", off),
            );
        }
    }

    for stop in activities {
        let off = distance_to_polyline_miles(&stop.point, polyline);
        if off > config.corridor_activity_miles {
            debug!(id = %stop.id, off, "validate_corridor: activity off route");
            violations.push(
                Violation::warn(
                    CODE_ACTIVITY_OFF_ROUTE,
                    EntityType::Activity,
                    &stop.id,
                    format!("{} is {:.0} miles off the driving route", stop.name, off),
                    format!("Replace {} with something along the route", stop.name),
                )
                .with_metric("offRouteMiles", off),
            );
        }
    }

    ValidationResult::from_violations(violations)
}

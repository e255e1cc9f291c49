//! Directional progress across days
//!
//! A road trip should make steady progress away from where it started, and
//! (for one-way trips) toward where it ends. These checks are the only ones
//! whose ERRORs send the planner back for another draft.

use tracing::debug;

use super::ValidationConfig;
use crate::domain::{EntityType, GeoPoint, TripType, ValidationResult, Violation};

pub const CODE_BACKTRACK: &str = "INV-DIR-01";
pub const CODE_AWAY_FROM_TERMINUS: &str = "INV-DIR-02";
pub const CODE_ORIGIN_REVISITED: &str = "INV-DIR-03";

/// A day's representative coordinate
#[derive(Debug, Clone, PartialEq)]
pub struct DayAnchor {
    pub day_number: u32,
    pub city: Option<String>,
    pub point: GeoPoint,
}

impl DayAnchor {
    pub fn new(day_number: u32, city: Option<&str>, point: GeoPoint) -> Self {
        Self {
            day_number,
            city: city.map(str::to_string),
            point,
        }
    }

    fn entity_id(&self) -> String {
        format!("day-{}", self.day_number)
    }
}

/// Origin or terminus of a trip
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub city: Option<String>,
    pub point: GeoPoint,
}

impl Endpoint {
    pub fn new(city: Option<&str>, point: GeoPoint) -> Self {
        Self {
            city: city.map(str::to_string),
            point,
        }
    }

    fn label(&self) -> String {
        match &self.city {
            Some(city) => city.clone(),
            None => format!("({:.3}, {:.3})", self.point.lat, self.point.lng),
        }
    }

    /// Same city by name, or within `tolerance` miles
    fn matches(&self, anchor: &DayAnchor, tolerance: f64) -> bool {
        let same_name = match (&self.city, &anchor.city) {
            (Some(a), Some(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
            _ => false,
        };
        same_name || self.point.distance_miles(&anchor.point) <= tolerance
    }
}

impl From<&DayAnchor> for Endpoint {
    fn from(anchor: &DayAnchor) -> Self {
        Self {
            city: anchor.city.clone(),
            point: anchor.point,
        }
    }
}

/// Derive origin and terminus from the first and last anchors
///
/// Round trips end where they start, so both endpoints are the first anchor.
pub fn infer_origin_and_terminus(anchors: &[DayAnchor], trip_type: TripType) -> Option<(Endpoint, Endpoint)> {
    let first = anchors.first()?;
    let last = anchors.last()?;
    let origin = Endpoint::from(first);
    let terminus = match trip_type {
        TripType::RoundTrip => origin.clone(),
        TripType::OneWay => Endpoint::from(last),
    };
    Some((origin, terminus))
}

/// Pick a trip type: explicit hint first, otherwise whether the trip ends
/// where it started
pub fn infer_trip_type(anchors: &[DayAnchor], hint: Option<TripType>, tolerance_miles: f64) -> TripType {
    if let Some(hint) = hint {
        return hint;
    }
    match (anchors.first(), anchors.last()) {
        (Some(first), Some(last)) if anchors.len() >= 2 => {
            if Endpoint::from(first).matches(last, tolerance_miles) {
                TripType::RoundTrip
            } else {
                TripType::OneWay
            }
        }
        _ => TripType::OneWay,
    }
}

/// Validate ordered day anchors against an origin and terminus
pub fn validate_direction(
    anchors: &[DayAnchor],
    origin: &Endpoint,
    terminus: &Endpoint,
    trip_type: TripType,
    config: &ValidationConfig,
) -> ValidationResult {
    debug!(days = anchors.len(), ?trip_type, origin = %origin.label(), terminus = %terminus.label(), "validate_direction: called");
    let tolerance = config.direction_tolerance_miles;
    let mut violations = Vec::new();

    if anchors.len() < 2 {
        return ValidationResult::from_violations(violations);
    }

    let from_origin: Vec<f64> = anchors.iter().map(|a| origin.point.distance_miles(&a.point)).collect();
    let to_terminus: Vec<f64> = anchors.iter().map(|a| terminus.point.distance_miles(&a.point)).collect();

    // Round trips only need outbound progress until the turnaround
    let outbound_end = match trip_type {
        TripType::OneWay => anchors.len() - 1,
        TripType::RoundTrip => from_origin
            .iter()
            .enumerate()
            .fold(0, |best, (i, d)| if *d > from_origin[best] { i } else { best }),
    };

    for i in 1..=outbound_end {
        let regression = from_origin[i - 1] - from_origin[i];
        if regression > tolerance {
            let anchor = &anchors[i];
            debug!(day = anchor.day_number, regression, "validate_direction: backward progress");
            violations.push(
                Violation::error(
                    CODE_BACKTRACK,
                    EntityType::Day,
                    anchor.entity_id(),
                    format!(
                        "Day {} is {:.0} miles closer to {} than day {}",
                        anchor.day_number,
                        regression,
                        origin.label(),
                        anchors[i - 1].day_number
                    ),
                    format!("must keep moving away from {} instead of doubling back", origin.label()),
                )
                .with_metric("previousDistanceMiles", from_origin[i - 1])
                .with_metric("distanceMiles", from_origin[i])
                .with_metric("regressionMiles", regression),
            );
        }
    }

    if trip_type == TripType::OneWay {
        for i in 1..anchors.len() {
            let drift = to_terminus[i] - to_terminus[i - 1];
            if drift > tolerance {
                let anchor = &anchors[i];
                debug!(day = anchor.day_number, drift, "validate_direction: moving away from terminus");
                violations.push(
                    Violation::error(
                        CODE_AWAY_FROM_TERMINUS,
                        EntityType::Day,
                        anchor.entity_id(),
                        format!(
                            "Day {} is {:.0} miles farther from {} than day {}",
                            anchor.day_number,
                            drift,
                            terminus.label(),
                            anchors[i - 1].day_number
                        ),
                        format!("must head toward {}", terminus.label()),
                    )
                    .with_metric("previousDistanceMiles", to_terminus[i - 1])
                    .with_metric("distanceMiles", to_terminus[i])
                    .with_metric("driftMiles", drift),
                );
            }
        }
    }

    // Days spent at the origin before setting off are a stay, not a return
    let last = anchors.len() - 1;
    let mut left_origin = !origin.matches(&anchors[0], tolerance);
    for (i, anchor) in anchors.iter().enumerate().skip(1) {
        let at_origin = origin.matches(anchor, tolerance);
        if !at_origin {
            left_origin = true;
            continue;
        }
        let allowed = trip_type == TripType::RoundTrip && i == last;
        if left_origin && !allowed {
            debug!(day = anchor.day_number, "validate_direction: origin revisited");
            violations.push(
                Violation::error(
                    CODE_ORIGIN_REVISITED,
                    EntityType::Day,
                    anchor.entity_id(),
                    format!("Day {} returns to the origin {}", anchor.day_number, origin.label()),
                    format!("must not be at the origin {}", origin.label()),
                )
                .with_metric("distanceMiles", from_origin[i]),
            );
        }
    }

    ValidationResult::from_violations(violations)
}

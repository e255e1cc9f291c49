//! ItineraryPlan - the hydrated, geocoded itinerary

use serde::{Deserialize, Serialize};

use super::draft::TimeSlot;
use super::geo::GeoPoint;
use super::violation::{Severity, Violation};
use crate::validation::GeoValidation;

/// How travellers move between two stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Driving,
    Walking,
    Cycling,
    Transit,
}

impl std::fmt::Display for TravelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Driving => write!(f, "driving"),
            Self::Walking => write!(f, "walking"),
            Self::Cycling => write!(f, "cycling"),
            Self::Transit => write!(f, "transit"),
        }
    }
}

/// A geocoded place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: String,
    pub name: String,
    pub location: GeoPoint,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_validation: Option<GeoValidation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_to_anchor_miles: Option<f64>,
}

impl Place {
    /// A synthetic place at a known point (no geocoder involved)
    pub fn synthetic(id: impl Into<String>, name: impl Into<String>, location: GeoPoint, category: &str) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location,
            category: category.to_string(),
            confidence: None,
            geo_validation: None,
            distance_to_anchor_miles: None,
        }
    }
}

/// Where an activity's coordinates came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    /// Geocoded by the place-resolution tool
    Resolved,
    /// Geocoding failed; jittered near the day anchor
    Fallback,
    /// Deterministic placeholder from the draft stage
    Draft,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub name: String,
    pub time_slot: TimeSlot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub place: Place,
    pub source: LocationSource,
}

impl Activity {
    pub fn location(&self) -> GeoPoint {
        self.place.location
    }
}

/// Movement between two consecutive activities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationAction {
    pub from_activity_id: String,
    pub to_activity_id: String,
    pub mode: TravelMode,
    pub distance_meters: f64,
    pub duration_minutes: f64,
    #[serde(default)]
    pub instructions: Vec<String>,
}

/// A local host suggested for the day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostCard {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub score: f64,
    #[serde(default)]
    pub match_reasons: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    pub day_number: u32,
    pub title: String,
    pub city: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_location: Option<Place>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub navigation_events: Vec<NavigationAction>,
    #[serde(default)]
    pub suggested_hosts: Vec<HostCard>,
}

impl DayPlan {
    pub fn anchor_point(&self) -> Option<GeoPoint> {
        self.anchor_location.as_ref().map(|p| p.location)
    }

    /// Total routed distance within the day
    pub fn routed_meters(&self) -> f64 {
        self.navigation_events.iter().map(|n| n.distance_meters).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryPlan {
    pub id: String,
    pub request: String,
    pub title: String,
    pub summary: String,
    pub days: Vec<DayPlan>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

impl ItineraryPlan {
    pub fn error_count(&self) -> usize {
        self.violations.iter().filter(|v| v.severity == Severity::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.violations.iter().filter(|v| v.severity == Severity::Warn).count()
    }

    /// Day anchors in day order, skipping days without one
    pub fn day_anchors(&self) -> Vec<(u32, Option<&str>, GeoPoint)> {
        self.days
            .iter()
            .filter_map(|d| d.anchor_point().map(|p| (d.day_number, Some(d.city.as_str()), p)))
            .collect()
    }
}

/// Result of resolving a day or trip anchor
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorResolution {
    /// The anchor area itself was geocoded
    Resolved(Place),
    /// Only a coarser point (the city, or the trip anchor) is known
    Fallback(GeoPoint),
    /// Nothing usable
    Failed,
}

impl AnchorResolution {
    pub fn point(&self) -> Option<GeoPoint> {
        match self {
            Self::Resolved(place) => Some(place.location),
            Self::Fallback(point) => Some(*point),
            Self::Failed => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place_at(lat: f64, lng: f64) -> Place {
        Place::synthetic("p", "P", GeoPoint::new(lat, lng), "test")
    }

    #[test]
    fn test_anchor_resolution_point() {
        let resolved = AnchorResolution::Resolved(place_at(1.0, 2.0));
        assert_eq!(resolved.point(), Some(GeoPoint::new(1.0, 2.0)));
        assert!(resolved.is_resolved());

        let fallback = AnchorResolution::Fallback(GeoPoint::new(3.0, 4.0));
        assert_eq!(fallback.point(), Some(GeoPoint::new(3.0, 4.0)));
        assert!(!fallback.is_resolved());

        assert_eq!(AnchorResolution::Failed.point(), None);
    }

    #[test]
    fn test_routed_meters() {
        let day = DayPlan {
            day_number: 1,
            title: "t".into(),
            city: "c".into(),
            country: "x".into(),
            anchor_location: Some(place_at(1.0, 1.0)),
            activities: vec![],
            navigation_events: vec![
                NavigationAction {
                    from_activity_id: "a".into(),
                    to_activity_id: "b".into(),
                    mode: TravelMode::Driving,
                    distance_meters: 1000.0,
                    duration_minutes: 3.0,
                    instructions: vec![],
                },
                NavigationAction {
                    from_activity_id: "b".into(),
                    to_activity_id: "c".into(),
                    mode: TravelMode::Walking,
                    distance_meters: 500.0,
                    duration_minutes: 6.0,
                    instructions: vec![],
                },
            ],
            suggested_hosts: vec![],
        };
        assert_eq!(day.routed_meters(), 1500.0);
        assert_eq!(day.anchor_point(), Some(GeoPoint::new(1.0, 1.0)));
    }
}

//! Collaborator contracts for geocoding, routing and host search

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::ToolError;
use crate::domain::{GeoPoint, HostCard, Place, TravelMode};

/// A place returned by the resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPlace {
    pub id: String,
    pub name: String,
    pub location: GeoPoint,
    pub category: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_to_anchor_miles: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl From<ResolvedPlace> for Place {
    fn from(resolved: ResolvedPlace) -> Self {
        Place {
            id: resolved.id,
            name: resolved.name,
            location: resolved.location,
            category: resolved.category,
            confidence: Some(resolved.confidence),
            geo_validation: None,
            distance_to_anchor_miles: resolved.distance_to_anchor_miles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    pub location: GeoPoint,
}

impl Waypoint {
    pub fn new(name: impl Into<String>, location: GeoPoint) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }
}

/// One leg between consecutive waypoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSegment {
    pub from: String,
    pub to: String,
    pub mode: TravelMode,
    pub distance_meters: f64,
    pub duration_minutes: f64,
    #[serde(default)]
    pub instructions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub segments: Vec<RouteSegment>,
    /// Full route polyline, used for corridor checks
    #[serde(default)]
    pub geometry: Vec<GeoPoint>,
}

impl RouteResult {
    pub fn distance_meters(&self) -> f64 {
        self.segments.iter().map(|s| s.distance_meters).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostResult {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub photo: Option<String>,
    pub score: f64,
    #[serde(default)]
    pub match_reasons: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
}

impl From<HostResult> for HostCard {
    fn from(host: HostResult) -> Self {
        HostCard {
            id: host.id,
            name: host.name,
            description: host.description,
            photo: host.photo,
            score: host.score,
            match_reasons: host.match_reasons,
            interests: host.interests,
        }
    }
}

/// Geocoder
#[async_trait]
pub trait PlaceResolver: Send + Sync {
    /// Resolve `name` within `context` (usually "City, Country"), optionally
    /// biased toward `anchor`
    async fn resolve(&self, name: &str, context: &str, anchor: Option<GeoPoint>) -> Result<ResolvedPlace, ToolError>;
}

/// Turn-by-turn routing
#[async_trait]
pub trait Router: Send + Sync {
    /// Route through `waypoints` in order; one segment per consecutive pair
    async fn route(&self, waypoints: &[Waypoint], mode: TravelMode) -> Result<RouteResult, ToolError>;
}

/// Local host discovery
#[async_trait]
pub trait HostSearch: Send + Sync {
    async fn search(&self, query: &str, location: &str, limit: usize) -> Result<Vec<HostResult>, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_place_into_place() {
        let resolved = ResolvedPlace {
            id: "osm-1".into(),
            name: "Gateway Arch".into(),
            location: GeoPoint::new(38.6247, -90.1848),
            category: "tourism".into(),
            confidence: 0.8,
            distance_to_anchor_miles: Some(1.2),
            city: Some("St. Louis".into()),
        };
        let place: Place = resolved.into();
        assert_eq!(place.confidence, Some(0.8));
        assert_eq!(place.distance_to_anchor_miles, Some(1.2));
        assert!(place.geo_validation.is_none());
    }

    #[test]
    fn test_route_distance() {
        let seg = |m| RouteSegment {
            from: "a".into(),
            to: "b".into(),
            mode: TravelMode::Driving,
            distance_meters: m,
            duration_minutes: 1.0,
            instructions: vec![],
        };
        let route = RouteResult {
            segments: vec![seg(100.0), seg(250.0)],
            geometry: vec![],
        };
        assert_eq!(route.distance_meters(), 350.0);
    }
}

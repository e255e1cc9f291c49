//! Coordinate trust checks
//!
//! Catches the classic geocoder failure modes: `(0,0)` defaults, garbage
//! ranges, a match on the wrong continent, and US lookups that land in open
//! water instead of the inland place that was asked for.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{EntityType, GeoPoint, Violation};

pub const CODE_NULL_ISLAND: &str = "INV-GEO-01";
pub const CODE_OUT_OF_RANGE: &str = "INV-GEO-02";
pub const CODE_REGION_MISMATCH: &str = "INV-GEO-03";
pub const CODE_OCEAN: &str = "INV-GEO-04";
pub const CODE_ISOLATED: &str = "INV-GEO-05";

/// Built-in regions with bounding boxes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Region {
    UsContinental,
    Europe,
}

/// (min_lat, max_lat, min_lng, max_lng)
struct Bounds(f64, f64, f64, f64);

impl Region {
    pub const ALL: [Region; 2] = [Region::UsContinental, Region::Europe];

    fn bounds(&self) -> Bounds {
        match self {
            Self::UsContinental => Bounds(24.4, 49.5, -125.0, -66.9),
            Self::Europe => Bounds(34.5, 71.5, -25.0, 45.0),
        }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        let Bounds(min_lat, max_lat, min_lng, max_lng) = self.bounds();
        point.lat >= min_lat && point.lat <= max_lat && point.lng >= min_lng && point.lng <= max_lng
    }

    /// First built-in region containing the point
    pub fn infer(point: &GeoPoint) -> Option<Region> {
        Self::ALL.into_iter().find(|r| r.contains(point))
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UsContinental => write!(f, "US_CONTINENTAL"),
            Self::Europe => write!(f, "EUROPE"),
        }
    }
}

impl std::str::FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "us" | "usa" | "us_continental" => Ok(Self::UsContinental),
            "eu" | "europe" => Ok(Self::Europe),
            _ => Err(format!("Unknown region: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeoConfidence {
    /// Plausible and inside a known region
    High,
    /// Plausible, region unknown
    Medium,
    /// At least one ERROR
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoValidation {
    pub valid: bool,
    pub confidence: GeoConfidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

/// Optional inputs to [`validate_coordinate`]
#[derive(Debug, Clone)]
pub struct GeoOptions<'a> {
    /// Region the point is expected to fall in
    pub region: Option<Region>,
    /// Other points of the same itinerary, for the isolation check
    pub other_coordinates: &'a [GeoPoint],
    pub isolation_miles: f64,
}

impl Default for GeoOptions<'_> {
    fn default() -> Self {
        Self {
            region: None,
            other_coordinates: &[],
            isolation_miles: 600.0,
        }
    }
}

impl<'a> GeoOptions<'a> {
    pub fn with_region(mut self, region: Option<Region>) -> Self {
        self.region = region;
        self
    }

    pub fn with_others(mut self, others: &'a [GeoPoint]) -> Self {
        self.other_coordinates = others;
        self
    }
}

/// Open-water longitudes inside the continental US bounding box
fn looks_like_ocean(point: &GeoPoint) -> bool {
    // Pacific, west of the coastline
    let pacific = point.lng < -124.8;
    // Atlantic, east of the seaboard south of Cape Cod
    let atlantic = point.lng > -69.8 && point.lat < 41.2;
    // Gulf of Mexico, south of the Mississippi delta and clear of the
    // Texas barrier islands and the Florida peninsula
    let gulf = point.lat < 28.3 && point.lng > -96.2 && point.lng < -83.0;
    pacific || atlantic || gulf
}

/// Validate a single coordinate
pub fn validate_coordinate(lat: f64, lng: f64, options: &GeoOptions<'_>) -> GeoValidation {
    debug!(lat, lng, region = ?options.region, others = options.other_coordinates.len(), "validate_coordinate: called");
    let point = GeoPoint::new(lat, lng);
    let entity_id = format!("{:.4},{:.4}", lat, lng);
    let mut violations = Vec::new();

    if point.is_null_island() {
        violations.push(Violation::error(
            CODE_NULL_ISLAND,
            EntityType::Coordinate,
            &entity_id,
            "Coordinate is exactly (0, 0), a geocoder default rather than a real place",
            "Re-resolve the place with a more specific query",
        ));
        return finish(violations, None);
    }

    if !lat.is_finite() || !lng.is_finite() || !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        violations.push(
            Violation::error(
                CODE_OUT_OF_RANGE,
                EntityType::Coordinate,
                &entity_id,
                format!("Coordinate ({}, {}) is outside valid latitude/longitude ranges", lat, lng),
                "Discard this coordinate and re-resolve the place",
            )
            .with_metric("lat", if lat.is_finite() { lat } else { 0.0 })
            .with_metric("lng", if lng.is_finite() { lng } else { 0.0 }),
        );
        return finish(violations, None);
    }

    let region = match options.region {
        Some(expected) => {
            if !expected.contains(&point) {
                debug!(%expected, "validate_coordinate: region mismatch");
                violations.push(Violation::error(
                    CODE_REGION_MISMATCH,
                    EntityType::Coordinate,
                    &entity_id,
                    format!("Coordinate ({:.4}, {:.4}) is outside the expected region {}", lat, lng, expected),
                    format!("Re-resolve the place constrained to {}", expected),
                ));
                None
            } else {
                Some(expected)
            }
        }
        None => Region::infer(&point),
    };

    if region == Some(Region::UsContinental) && looks_like_ocean(&point) {
        debug!("validate_coordinate: ocean longitude inside US region");
        violations.push(
            Violation::error(
                CODE_OCEAN,
                EntityType::Coordinate,
                &entity_id,
                format!("Coordinate ({:.4}, {:.4}) appears to be in open water", lat, lng),
                "Re-resolve the place; the geocoder likely matched a coastal or maritime feature",
            )
            .with_metric("lng", lng),
        );
    }

    let others: Vec<&GeoPoint> = options
        .other_coordinates
        .iter()
        .filter(|o| **o != point)
        .collect();
    if !others.is_empty() {
        let nearest = others
            .iter()
            .map(|o| point.distance_miles(o))
            .fold(f64::INFINITY, f64::min);
        if nearest > options.isolation_miles {
            debug!(nearest, "validate_coordinate: isolated point");
            violations.push(
                Violation::warn(
                    CODE_ISOLATED,
                    EntityType::Coordinate,
                    &entity_id,
                    format!("Coordinate is {:.0} miles from the nearest other stop", nearest),
                    "Check that the place name resolved to the intended town",
                )
                .with_metric("nearestMiles", nearest),
            );
        }
    }

    finish(violations, region)
}

fn finish(violations: Vec<Violation>, region: Option<Region>) -> GeoValidation {
    let failed = violations.iter().any(Violation::is_error);
    let confidence = if failed {
        GeoConfidence::Failed
    } else if region.is_some() {
        GeoConfidence::High
    } else {
        GeoConfidence::Medium
    };
    GeoValidation {
        valid: !failed,
        confidence,
        region,
        violations,
    }
}

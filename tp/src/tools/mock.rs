//! In-memory tool doubles for unit tests

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::error::ToolError;
use super::traits::{HostResult, HostSearch, PlaceResolver, ResolvedPlace, RouteResult, RouteSegment, Router, Waypoint};
use crate::domain::{GeoPoint, TravelMode};

/// Resolves names from a fixed gazetteer, case-insensitively
#[derive(Default)]
pub struct MockResolver {
    places: HashMap<String, GeoPoint>,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_place(mut self, name: &str, lat: f64, lng: f64) -> Self {
        self.places.insert(name.to_lowercase(), GeoPoint::new(lat, lng));
        self
    }

    /// The usual road-trip cities
    pub fn us_cities() -> Self {
        Self::new()
            .with_place("Los Angeles, USA", 34.0522, -118.2437)
            .with_place("Los Angeles", 34.0522, -118.2437)
            .with_place("Flagstaff, USA", 35.1983, -111.6513)
            .with_place("Albuquerque, USA", 35.0844, -106.6504)
            .with_place("Amarillo, USA", 35.222, -101.8313)
            .with_place("Oklahoma City, USA", 35.4676, -97.5164)
            .with_place("St. Louis, USA", 38.627, -90.1994)
            .with_place("Chicago, USA", 41.8781, -87.6298)
            .with_place("Las Vegas, USA", 36.1699, -115.1398)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlaceResolver for MockResolver {
    async fn resolve(&self, name: &str, context: &str, anchor: Option<GeoPoint>) -> Result<ResolvedPlace, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let query = super::nominatim::build_query(name, context);
        self.queries.lock().unwrap().push(query.clone());

        let location = self
            .places
            .get(&query.to_lowercase())
            .or_else(|| self.places.get(&name.to_lowercase()))
            .copied()
            .ok_or(ToolError::NotFound { query })?;
        Ok(ResolvedPlace {
            id: format!("mock-{}", name.to_lowercase().replace(' ', "-")),
            name: name.to_string(),
            location,
            category: "place".to_string(),
            confidence: 0.9,
            distance_to_anchor_miles: anchor.map(|a| a.distance_miles(&location)),
            city: None,
        })
    }
}

/// Straight-line router: 1.2x great-circle distance at 60 km/h
#[derive(Default)]
pub struct MockRouter {
    pub fail: bool,
    calls: AtomicUsize,
}

impl MockRouter {
    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Router for MockRouter {
    async fn route(&self, waypoints: &[Waypoint], mode: TravelMode) -> Result<RouteResult, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ToolError::Api {
                status: 503,
                message: "router down".to_string(),
            });
        }
        let segments = waypoints
            .windows(2)
            .map(|pair| {
                let meters = crate::domain::miles_to_meters(pair[0].location.distance_miles(&pair[1].location)) * 1.2;
                RouteSegment {
                    from: pair[0].name.clone(),
                    to: pair[1].name.clone(),
                    mode,
                    distance_meters: meters,
                    duration_minutes: meters / 1000.0,
                    instructions: vec![format!("Head to {}", pair[1].name)],
                }
            })
            .collect();
        Ok(RouteResult {
            segments,
            geometry: waypoints.iter().map(|w| w.location).collect(),
        })
    }
}

/// One host per searched city
#[derive(Default)]
pub struct MockHostSearch;

#[async_trait]
impl HostSearch for MockHostSearch {
    async fn search(&self, _query: &str, location: &str, limit: usize) -> Result<Vec<HostResult>, ToolError> {
        let city = location.split(',').next().unwrap_or_default().trim().to_string();
        Ok(vec![HostResult {
            id: format!("host-{}", city.to_lowercase().replace(' ', "-")),
            name: format!("{} local", city),
            description: "Knows the area".to_string(),
            photo: None,
            score: 1.0,
            match_reasons: vec![],
            interests: vec![],
        }]
        .into_iter()
        .take(limit)
        .collect())
    }
}

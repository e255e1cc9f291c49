//! Geographic primitives: points, distances, jitter

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in statute miles
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

pub const METERS_PER_MILE: f64 = 1609.344;

/// A WGS84 coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance in miles
    pub fn distance_miles(&self, other: &GeoPoint) -> f64 {
        haversine_miles(self.lat, self.lng, other.lat, other.lng)
    }

    pub fn is_null_island(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }

    /// Offset this point by up to `radius_deg` on each axis, reproducibly for `seed`
    pub fn seeded_jitter(&self, seed: u64, radius_deg: f64) -> GeoPoint {
        let mut rng = StdRng::seed_from_u64(seed);
        self.offset(&mut rng, radius_deg)
    }

    /// Offset this point by up to `radius_deg` on each axis
    pub fn random_jitter(&self, radius_deg: f64) -> GeoPoint {
        let mut rng = rand::rng();
        self.offset(&mut rng, radius_deg)
    }

    fn offset<R: Rng>(&self, rng: &mut R, radius_deg: f64) -> GeoPoint {
        if radius_deg <= 0.0 {
            return *self;
        }
        let lat = (self.lat + rng.random_range(-radius_deg..radius_deg)).clamp(-90.0, 90.0);
        let lng = (self.lng + rng.random_range(-radius_deg..radius_deg)).clamp(-180.0, 180.0);
        GeoPoint { lat, lng }
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5},{:.5}", self.lat, self.lng)
    }
}

pub fn haversine_miles(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2) + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_MILES * c
}

pub fn miles_to_meters(miles: f64) -> f64 {
    miles * METERS_PER_MILE
}

pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

/// Stable seed for a (day, activity) slot
pub fn slot_seed(day_index: usize, activity_index: usize) -> u64 {
    ((day_index as u64 + 1) << 32) ^ (activity_index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

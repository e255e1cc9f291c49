//! Validation suite
//!
//! Pure validators over coordinates and itineraries. Each returns a
//! [`ValidationResult`](crate::domain::ValidationResult) whose `valid` flag is
//! false exactly when an ERROR-severity violation is present. Only direction
//! errors feed back into regeneration; everything else is advisory.

mod config;
mod constraints;
mod corridor;
mod direction;
mod geo;
mod pacing;

pub use config::ValidationConfig;
pub use constraints::build_regeneration_constraints;
pub use corridor::{
    CODE_ACTIVITY_OFF_ROUTE, CODE_ANCHOR_OFF_ROUTE, CODE_NO_ROUTE, CorridorStop, distance_to_polyline_miles,
    distance_to_segment_miles, validate_corridor,
};
pub use direction::{
    CODE_AWAY_FROM_TERMINUS, CODE_BACKTRACK, CODE_ORIGIN_REVISITED, DayAnchor, Endpoint, infer_origin_and_terminus,
    infer_trip_type, validate_direction,
};
pub use geo::{
    CODE_ISOLATED, CODE_NULL_ISLAND, CODE_OCEAN, CODE_OUT_OF_RANGE, CODE_REGION_MISMATCH, GeoConfidence, GeoOptions,
    GeoValidation, Region, validate_coordinate,
};
pub use pacing::{CODE_EMPTY_DAY, CODE_LONG_DRIVE, CODE_SPARSE_DAY, CODE_UNEVEN, DayPacing, validate_pacing};

impl ValidationConfig {
    /// Geo options carrying this config's isolation threshold
    pub fn geo_options<'a>(&self, region: Option<Region>, others: &'a [crate::domain::GeoPoint]) -> GeoOptions<'a> {
        GeoOptions {
            region,
            other_coordinates: others,
            isolation_miles: self.isolation_miles,
        }
    }
}

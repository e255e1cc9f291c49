//! Domain types for the trip planner
//!
//! Snapshot in, draft in the middle, hydrated plan out. Violations ride
//! along on the plan.

mod draft;
mod geo;
mod plan;
mod snapshot;
mod violation;

pub use draft::{DraftActivity, DraftDay, DraftItinerary, TimeSlot, TripType};
pub use geo::{EARTH_RADIUS_MILES, GeoPoint, METERS_PER_MILE, haversine_miles, meters_to_miles, miles_to_meters, slot_seed};
pub use plan::{
    Activity, AnchorResolution, DayPlan, HostCard, ItineraryPlan, LocationSource, NavigationAction, Place, TravelMode,
};
pub use snapshot::PlannerSnapshot;
pub use violation::{EntityType, Severity, ValidationResult, Violation};

// Re-export jobstore types for convenience
pub use jobstore::{GenerationMode, Job, JobProgress, JobStatus, JobUpdate};

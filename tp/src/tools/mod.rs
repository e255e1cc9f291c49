//! External tools used during hydration
//!
//! Geocoding, routing and host search sit behind traits so the planner can
//! be driven by real services or by in-memory doubles.

mod error;
mod hosts;
mod nominatim;
mod osrm;
mod traits;

#[cfg(test)]
pub mod mock;

use std::sync::Arc;

use tracing::debug;

pub use error::ToolError;
pub use hosts::{CatalogHostSearch, HostEntry};
pub use nominatim::{NominatimResolver, build_query};
pub use osrm::OsrmRouter;
pub use traits::{HostResult, HostSearch, PlaceResolver, ResolvedPlace, RouteResult, RouteSegment, Router, Waypoint};

use crate::config::Config;

/// The set of tools one planner uses
#[derive(Clone)]
pub struct Toolbox {
    pub resolver: Arc<dyn PlaceResolver>,
    pub router: Arc<dyn Router>,
    pub hosts: Arc<dyn HostSearch>,
}

impl Toolbox {
    pub fn new(resolver: Arc<dyn PlaceResolver>, router: Arc<dyn Router>, hosts: Arc<dyn HostSearch>) -> Self {
        Self { resolver, router, hosts }
    }

    /// Build the HTTP-backed tools described by config
    pub fn from_config(config: &Config) -> Result<Self, ToolError> {
        debug!("Toolbox::from_config: called");
        let resolver = NominatimResolver::from_config(&config.geocoder)?;
        let router = OsrmRouter::from_config(&config.routing)?;
        let hosts = match &config.hosts.catalog_path {
            Some(path) => CatalogHostSearch::load(path)?,
            None => {
                debug!("Toolbox::from_config: no host catalog configured");
                CatalogHostSearch::default()
            }
        };
        Ok(Self::new(Arc::new(resolver), Arc::new(router), Arc::new(hosts)))
    }
}

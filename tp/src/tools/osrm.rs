//! OSRM route service client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::error::ToolError;
use super::traits::{RouteResult, RouteSegment, Router, Waypoint};
use crate::config::RoutingConfig;
use crate::domain::{GeoPoint, TravelMode};

pub struct OsrmRouter {
    http: Client,
    base_url: String,
}

impl OsrmRouter {
    pub fn from_config(config: &RoutingConfig) -> Result<Self, ToolError> {
        debug!(base_url = %config.base_url, "OsrmRouter::from_config: called");
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn route_url(&self, waypoints: &[Waypoint], mode: TravelMode) -> String {
        let coords: Vec<String> = waypoints
            .iter()
            .map(|w| format!("{:.6},{:.6}", w.location.lng, w.location.lat))
            .collect();
        format!("{}/route/v1/{}/{}", self.base_url, profile(mode), coords.join(";"))
    }
}

/// OSRM has no transit profile; driving is the closest stand-in
fn profile(mode: TravelMode) -> &'static str {
    match mode {
        TravelMode::Driving | TravelMode::Transit => "driving",
        TravelMode::Walking => "foot",
        TravelMode::Cycling => "bike",
    }
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    /// GeoJSON order: [lng, lat]
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    distance: f64,
    duration: f64,
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    #[serde(default)]
    name: String,
    maneuver: OsrmManeuver,
}

#[derive(Debug, Deserialize)]
struct OsrmManeuver {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    modifier: Option<String>,
}

fn describe_step(step: &OsrmStep) -> String {
    let mut text = step.maneuver.kind.replace('_', " ");
    if let Some(modifier) = &step.maneuver.modifier {
        text.push(' ');
        text.push_str(modifier);
    }
    if !step.name.is_empty() {
        text.push_str(" onto ");
        text.push_str(&step.name);
    }
    text
}

fn into_route_result(response: OsrmResponse, waypoints: &[Waypoint], mode: TravelMode) -> Result<RouteResult, ToolError> {
    if response.code != "Ok" {
        return Err(ToolError::InvalidResponse(format!(
            "{}: {}",
            response.code,
            response.message.unwrap_or_default()
        )));
    }
    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| ToolError::InvalidResponse("no routes returned".to_string()))?;
    if route.legs.len() + 1 != waypoints.len() {
        return Err(ToolError::InvalidResponse(format!(
            "expected {} legs, got {}",
            waypoints.len() - 1,
            route.legs.len()
        )));
    }

    let segments = route
        .legs
        .iter()
        .zip(waypoints.windows(2))
        .map(|(leg, pair)| RouteSegment {
            from: pair[0].name.clone(),
            to: pair[1].name.clone(),
            mode,
            distance_meters: leg.distance,
            duration_minutes: leg.duration / 60.0,
            instructions: leg.steps.iter().map(describe_step).collect(),
        })
        .collect();
    let geometry = route
        .geometry
        .coordinates
        .iter()
        .map(|[lng, lat]| GeoPoint::new(*lat, *lng))
        .collect();

    Ok(RouteResult { segments, geometry })
}

#[async_trait]
impl Router for OsrmRouter {
    async fn route(&self, waypoints: &[Waypoint], mode: TravelMode) -> Result<RouteResult, ToolError> {
        debug!(waypoints = waypoints.len(), %mode, "OsrmRouter::route: called");
        if waypoints.len() < 2 {
            return Err(ToolError::InvalidArgument("a route needs at least 2 waypoints".to_string()));
        }

        let url = self.route_url(waypoints, mode);
        let response = self
            .http
            .get(&url)
            .query(&[("overview", "full"), ("geometries", "geojson"), ("steps", "true")])
            .send()
            .await?;
        let status = response.status();
        // OSRM reports NoRoute and friends as 400 with a JSON body
        if !status.is_success() && status.as_u16() != 400 {
            let message = response.text().await.unwrap_or_default();
            return Err(ToolError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: OsrmResponse = response.json().await?;
        into_route_result(body, waypoints, mode)
    }
}

//! OpenStreetMap Nominatim geocoder

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::error::ToolError;
use super::traits::{PlaceResolver, ResolvedPlace};
use crate::config::GeocoderConfig;
use crate::domain::GeoPoint;

/// Nominatim `/search` client
///
/// Does no throttling of its own; callers funnel requests through a
/// [`RateLimiter`](crate::scheduler::RateLimiter).
pub struct NominatimResolver {
    http: Client,
    base_url: String,
    email: Option<String>,
    bias_radius_deg: f64,
}

impl NominatimResolver {
    pub fn from_config(config: &GeocoderConfig) -> Result<Self, ToolError> {
        debug!(base_url = %config.base_url, "NominatimResolver::from_config: called");
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            email: config.email.clone(),
            bias_radius_deg: config.bias_radius_deg,
        })
    }

    fn query_params(&self, query: &str, anchor: Option<GeoPoint>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", query.to_string()),
            ("format", "jsonv2".to_string()),
            ("limit", "1".to_string()),
            ("addressdetails", "1".to_string()),
        ];
        if let Some(anchor) = anchor {
            let r = self.bias_radius_deg;
            // Unbounded viewbox: a preference, not a filter
            params.push((
                "viewbox",
                format!("{},{},{},{}", anchor.lng - r, anchor.lat + r, anchor.lng + r, anchor.lat - r),
            ));
        }
        if let Some(email) = &self.email {
            params.push(("email", email.clone()));
        }
        params
    }
}

/// Build the free-text query from a name and its context
pub fn build_query(name: &str, context: &str) -> String {
    let name = name.trim();
    let context = context.trim();
    if context.is_empty() || name.eq_ignore_ascii_case(context) {
        name.to_string()
    } else {
        format!("{}, {}", name, context)
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    place_id: u64,
    #[serde(default)]
    name: Option<String>,
    display_name: String,
    lat: String,
    lon: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    importance: Option<f64>,
    #[serde(default)]
    address: Option<Address>,
}

#[derive(Debug, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
}

fn parse_hit(hit: SearchHit, anchor: Option<GeoPoint>) -> Result<ResolvedPlace, ToolError> {
    let lat: f64 = hit
        .lat
        .parse()
        .map_err(|_| ToolError::InvalidResponse(format!("bad latitude '{}'", hit.lat)))?;
    let lng: f64 = hit
        .lon
        .parse()
        .map_err(|_| ToolError::InvalidResponse(format!("bad longitude '{}'", hit.lon)))?;
    let location = GeoPoint::new(lat, lng);
    let name = match hit.name.filter(|n| !n.is_empty()) {
        Some(name) => name,
        None => hit.display_name.split(',').next().unwrap_or_default().trim().to_string(),
    };
    let category = match (hit.category, hit.kind) {
        (Some(c), Some(k)) => format!("{}:{}", c, k),
        (Some(c), None) => c,
        (None, Some(k)) => k,
        (None, None) => "place".to_string(),
    };

    Ok(ResolvedPlace {
        id: format!("osm-{}", hit.place_id),
        name,
        location,
        category,
        confidence: hit.importance.unwrap_or(0.5).clamp(0.0, 1.0),
        distance_to_anchor_miles: anchor.map(|a| a.distance_miles(&location)),
        city: hit.address.and_then(|a| a.city.or(a.town).or(a.village)),
    })
}

#[async_trait]
impl PlaceResolver for NominatimResolver {
    async fn resolve(&self, name: &str, context: &str, anchor: Option<GeoPoint>) -> Result<ResolvedPlace, ToolError> {
        let query = build_query(name, context);
        debug!(%query, ?anchor, "NominatimResolver::resolve: called");
        if query.is_empty() {
            return Err(ToolError::InvalidArgument("empty place query".to_string()));
        }

        let url = format!("{}/search", self.base_url);
        let response = self.http.get(&url).query(&self.query_params(&query, anchor)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!(%status, "NominatimResolver::resolve: error status");
            return Err(ToolError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let hits: Vec<SearchHit> = response.json().await?;
        match hits.into_iter().next() {
            Some(hit) => parse_hit(hit, anchor),
            None => {
                debug!(%query, "NominatimResolver::resolve: no results");
                Err(ToolError::NotFound { query })
            }
        }
    }
}

//! Host catalog search
//!
//! Hosts come from a YAML catalog and are matched on city only. Ranking by
//! interests is left to whatever service eventually replaces the catalog.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::error::ToolError;
use super::traits::{HostResult, HostSearch};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HostEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub photo: Option<String>,
    pub city: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
}

#[derive(Debug, Default)]
pub struct CatalogHostSearch {
    entries: Vec<HostEntry>,
}

impl CatalogHostSearch {
    pub fn new(entries: Vec<HostEntry>) -> Self {
        Self { entries }
    }

    /// Load a catalog file (a YAML list of hosts)
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ToolError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "CatalogHostSearch::load: called");
        let content = std::fs::read_to_string(path)?;
        let entries: Vec<HostEntry> = serde_yaml::from_str(&content)?;
        info!(count = entries.len(), path = %path.display(), "Loaded host catalog");
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split "City, Country" into its parts
fn split_location(location: &str) -> (String, Option<String>) {
    let mut parts = location.split(',').map(str::trim).filter(|p| !p.is_empty());
    let city = parts.next().unwrap_or_default().to_lowercase();
    let country = parts.last().map(str::to_lowercase);
    (city, country)
}

#[async_trait]
impl HostSearch for CatalogHostSearch {
    async fn search(&self, query: &str, location: &str, limit: usize) -> Result<Vec<HostResult>, ToolError> {
        debug!(%query, %location, limit, "CatalogHostSearch::search: called");
        let (city, country) = split_location(location);
        if city.is_empty() {
            return Err(ToolError::InvalidArgument("host search needs a city".to_string()));
        }

        let results = self
            .entries
            .iter()
            .filter(|e| e.city.to_lowercase() == city)
            .filter(|e| match (&country, &e.country) {
                (Some(want), Some(have)) => have.to_lowercase() == *want,
                _ => true,
            })
            .take(limit)
            .map(|e| HostResult {
                id: e.id.clone(),
                name: e.name.clone(),
                description: e.description.clone(),
                photo: e.photo.clone(),
                score: 1.0,
                match_reasons: vec![format!("Lives in {}", e.city)],
                interests: e.interests.clone(),
            })
            .collect::<Vec<_>>();

        debug!(found = results.len(), "CatalogHostSearch::search: done");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CATALOG: &str = r#"
- id: host-1
  name: Rosa
  description: Retired chef who knows every taqueria
  city: Albuquerque
  country: USA
  interests: [food, hiking]
- id: host-2
  name: Dev
  city: Albuquerque
  country: Mexico
- id: host-3
  name: Marlene
  city: Tulsa
  photo: https://example.com/marlene.jpg
"#;

    fn catalog() -> CatalogHostSearch {
        CatalogHostSearch::new(serde_yaml::from_str(CATALOG).unwrap())
    }

    #[tokio::test]
    async fn test_search_filters_by_city_and_country() {
        let hosts = catalog().search("food", "Albuquerque, USA", 5).await.unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].name, "Rosa");
        assert_eq!(hosts[0].interests, vec!["food", "hiking"]);

        let any_country = catalog().search("", "albuquerque", 5).await.unwrap();
        assert_eq!(any_country.len(), 2);
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let hosts = catalog().search("", "Albuquerque", 1).await.unwrap();
        assert_eq!(hosts.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_city_is_empty() {
        assert!(catalog().search("", "Boise, USA", 3).await.unwrap().is_empty());
        assert!(catalog().search("", " , ", 3).await.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CATALOG.as_bytes()).unwrap();
        let catalog = CatalogHostSearch::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 3);
    }
}

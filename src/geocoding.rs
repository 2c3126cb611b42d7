//! Geocoding client backed by the OpenWeather direct geocoding API
//!
//! Runs first in every aggregation: the places lookup needs coordinates, so
//! a geocoding failure fails the whole request before any other provider is
//! called.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::config::PanelConfig;
use crate::models::Location;
use crate::{PanelError, Result, USER_AGENT};

/// How many suggestions the autocomplete lookup asks for
const SUGGESTION_LIMIT: u8 = 5;

/// Resolves free-text place queries to coordinates
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a query to its best-matching location.
    /// Zero results is an error: nothing downstream can run without coordinates.
    async fn geocode(&self, query: &str) -> Result<Location>;

    /// Return display names matching a partial query, for autocomplete.
    async fn suggest(&self, query: &str) -> Result<Vec<String>>;
}

/// OpenWeather direct geocoding client
pub struct OpenWeatherGeocoder {
    client: Client,
    api_key: String,
    base_url: String,
}

/// One geocoding result from OpenWeather
#[derive(Debug, Deserialize)]
struct GeoEntry {
    name: String,
    lat: f64,
    lon: f64,
    country: Option<String>,
    state: Option<String>,
}

impl GeoEntry {
    /// "name, state, country" with absent parts omitted
    fn display_name(&self) -> String {
        let mut parts = vec![self.name.clone()];
        if let Some(state) = &self.state
            && !state.is_empty()
        {
            parts.push(state.clone());
        }
        if let Some(country) = &self.country
            && !country.is_empty()
        {
            parts.push(country.clone());
        }
        parts.join(", ")
    }
}

impl OpenWeatherGeocoder {
    /// Create a new geocoder from configuration
    pub fn new(config: &PanelConfig) -> Result<Self> {
        let api_key = config
            .providers
            .openweather_api_key
            .clone()
            .ok_or_else(|| PanelError::config("OpenWeather API key is not configured"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.providers.timeout_seconds.into()))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PanelError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.providers.openweather_base_url.clone(),
        })
    }

    async fn lookup(&self, query: &str, limit: u8) -> Result<Vec<GeoEntry>> {
        let url = format!("{}/geo/1.0/direct", self.base_url);
        let limit = limit.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("limit", limit.as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PanelError::network(format!("Geocoding request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PanelError::api(format!(
                "Geocoding request failed with status {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PanelError::api(format!("Failed to parse geocoding response: {e}")))
    }
}

#[async_trait]
impl Geocoder for OpenWeatherGeocoder {
    #[instrument(skip(self))]
    async fn geocode(&self, query: &str) -> Result<Location> {
        debug!("Geocoding place query: '{query}'");

        let entries = self.lookup(query, 1).await?;
        let Some(entry) = entries.into_iter().next() else {
            return Err(PanelError::api(format!("No location found for '{query}'")));
        };

        info!(
            "Resolved '{}' to {} ({:.4}, {:.4})",
            query, entry.name, entry.lat, entry.lon
        );
        Ok(Location::new(entry.lat, entry.lon, entry.name))
    }

    #[instrument(skip(self))]
    async fn suggest(&self, query: &str) -> Result<Vec<String>> {
        let entries = self.lookup(query, SUGGESTION_LIMIT).await?;
        Ok(entries.iter().map(GeoEntry::display_name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn entry(name: &str, state: Option<&str>, country: Option<&str>) -> GeoEntry {
        GeoEntry {
            name: name.to_string(),
            lat: 0.0,
            lon: 0.0,
            country: country.map(str::to_string),
            state: state.map(str::to_string),
        }
    }

    #[rstest]
    #[case(entry("Rio de Janeiro", Some("Rio de Janeiro"), Some("BR")), "Rio de Janeiro, Rio de Janeiro, BR")]
    #[case(entry("Paris", None, Some("FR")), "Paris, FR")]
    #[case(entry("Atlantis", None, None), "Atlantis")]
    #[case(entry("Springfield", Some(""), Some("US")), "Springfield, US")]
    fn display_name_skips_absent_parts(#[case] entry: GeoEntry, #[case] expected: &str) {
        assert_eq!(entry.display_name(), expected);
    }

    #[test]
    fn parses_openweather_payload() {
        let body = r#"[{"name":"Rio de Janeiro","lat":-22.9068,"lon":-43.1729,"country":"BR","state":"Rio de Janeiro"}]"#;
        let entries: Vec<GeoEntry> = serde_json::from_str(body).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Rio de Janeiro");
        assert_eq!(entries[0].lat, -22.9068);
    }

    #[test]
    fn geocoder_requires_api_key() {
        let config = PanelConfig::default();
        let result = OpenWeatherGeocoder::new(&config);
        assert!(matches!(result, Err(PanelError::Config { .. })));
    }
}

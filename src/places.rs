//! Points-of-interest search via the Overpass API
//!
//! Three category searches run concurrently around the resolved coordinates.
//! A category returning nothing is an empty list; a category call failing
//! fails the whole places lookup.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::config::PanelConfig;
use crate::models::{Location, Place, PlacesReport};
use crate::{PanelError, Result, USER_AGENT};

/// Search radius around the resolved location, in meters
const SEARCH_RADIUS_M: u32 = 10_000;

/// Maximum raw elements requested per category
const RESULT_CAP: u32 = 7;

/// Server-side query timeout, in seconds
const QUERY_TIMEOUT_S: u32 = 10;

/// One searchable place category, expressed as an OSM tag filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceCategory {
    pub label: &'static str,
    pub key: &'static str,
    pub value: &'static str,
}

/// The categories every places lookup covers
pub const CATEGORIES: [PlaceCategory; 3] = [
    PlaceCategory {
        label: "attractions",
        key: "tourism",
        value: "attraction",
    },
    PlaceCategory {
        label: "restaurants",
        key: "amenity",
        value: "restaurant",
    },
    PlaceCategory {
        label: "hotels",
        key: "tourism",
        value: "hotel",
    },
];

/// Searches one place category around a location
#[async_trait]
pub trait PlaceSearch: Send + Sync {
    async fn search(&self, category: &PlaceCategory, center: &Location) -> Result<Vec<Place>>;
}

/// Run all category searches concurrently and fold them into one report.
///
/// Every search is awaited even when a sibling fails; failures are folded
/// into a single error so the caller sees one places outcome.
pub async fn fetch_places(search: &dyn PlaceSearch, center: &Location) -> Result<PlacesReport> {
    let results = join_all(
        CATEGORIES
            .iter()
            .map(|category| search.search(category, center)),
    )
    .await;

    let mut failures: Vec<String> = Vec::new();
    let mut lists: Vec<Vec<Place>> = Vec::new();
    for (category, result) in CATEGORIES.iter().zip(results) {
        match result {
            Ok(places) => {
                debug!("{}: {} places", category.label, places.len());
                lists.push(places);
            }
            Err(err) => {
                warn!("{} search failed: {err}", category.label);
                failures.push(err.to_string());
                lists.push(Vec::new());
            }
        }
    }

    if !failures.is_empty() {
        return Err(PanelError::api(failures.join("; ")));
    }

    let mut lists = lists.into_iter();
    Ok(PlacesReport {
        attractions: lists.next().unwrap_or_default(),
        restaurants: lists.next().unwrap_or_default(),
        hotels: lists.next().unwrap_or_default(),
    })
}

/// Overpass API client
pub struct OverpassClient {
    client: Client,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(default)]
    tags: ElementTags,
}

#[derive(Debug, Deserialize, Default)]
struct ElementTags {
    name: Option<String>,
    #[serde(rename = "addr:street")]
    street: Option<String>,
    #[serde(rename = "addr:housenumber")]
    housenumber: Option<String>,
    #[serde(rename = "addr:city")]
    city: Option<String>,
}

impl OverpassClient {
    /// Create a new client from configuration
    pub fn new(config: &PanelConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.providers.timeout_seconds.into()))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PanelError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.providers.overpass_api_url.clone(),
        })
    }
}

/// Overpass QL query for named elements of one category around a point
fn build_query(category: &PlaceCategory, center: &Location) -> String {
    format!(
        "[out:json][timeout:{QUERY_TIMEOUT_S}];node[\"{}\"=\"{}\"][\"name\"](around:{SEARCH_RADIUS_M},{},{});out {RESULT_CAP};",
        category.key, category.value, center.latitude, center.longitude
    )
}

/// Street, house number and locality joined with ", ", absent parts omitted
fn format_address(tags: &ElementTags) -> String {
    [&tags.street, &tags.housenumber, &tags.city]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}

/// Keep the first occurrence of every name
fn dedupe_by_name(places: Vec<Place>) -> Vec<Place> {
    let mut unique: Vec<Place> = Vec::new();
    for place in places {
        if !unique.iter().any(|seen| seen.name == place.name) {
            unique.push(place);
        }
    }
    unique
}

#[async_trait]
impl PlaceSearch for OverpassClient {
    #[instrument(skip(self, center), fields(category = category.label))]
    async fn search(&self, category: &PlaceCategory, center: &Location) -> Result<Vec<Place>> {
        let query = build_query(category, center);
        debug!("Overpass query: {query}");

        let response = self
            .client
            .post(&self.api_url)
            .form(&[("data", query.as_str())])
            .send()
            .await
            .map_err(|e| PanelError::network(format!("Overpass request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PanelError::api(format!(
                "Overpass request failed with status {status}: {body}"
            )));
        }

        let parsed: OverpassResponse = response
            .json()
            .await
            .map_err(|e| PanelError::api(format!("Failed to parse Overpass response: {e}")))?;

        let places: Vec<Place> = parsed
            .elements
            .into_iter()
            .filter_map(|element| {
                let name = element.tags.name.clone().filter(|name| !name.is_empty())?;
                Some(Place {
                    name,
                    address: format_address(&element.tags),
                    rating: None,
                })
            })
            .collect();
        let places = dedupe_by_name(places);

        info!(
            "Found {} {} near {}",
            places.len(),
            category.label,
            center.name
        );
        Ok(places)
    }
}

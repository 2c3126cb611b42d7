//! Models for the aggregated city-info response

use super::WeatherReport;
use serde::{Deserialize, Serialize};

/// Summary text shown when the encyclopedia found nothing for a place.
/// A soft-miss, not an error.
pub const NO_INFO_SUMMARY: &str = "No information found for this place.";

/// Cleaned encyclopedia entry for a place
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WikiSummary {
    /// Cleaned summary text, or the no-information sentinel
    pub summary: String,
    /// Canonical page title, absent on a soft-miss
    pub page_title: Option<String>,
    /// Image URLs, lead image first, deduplicated
    pub image_urls: Vec<String>,
}

impl WikiSummary {
    /// The soft-miss value: no page could be resolved for the place
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            summary: NO_INFO_SUMMARY.to_string(),
            page_title: None,
            image_urls: Vec::new(),
        }
    }

    /// Whether this entry is the soft-miss sentinel
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.page_title.is_none()
    }
}

/// One point of interest near the resolved location
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Place {
    /// Display name from the map element's name tag
    pub name: String,
    /// Formatted address, absent parts omitted
    pub address: String,
    /// Rating placeholder, no rating source is integrated
    pub rating: Option<f64>,
}

/// Nearby places grouped by category
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct PlacesReport {
    pub attractions: Vec<Place>,
    pub restaurants: Vec<Place>,
    pub hotels: Vec<Place>,
}

/// AI-generated travel insights for a place
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AiInsights {
    /// Short narrative summary for a traveler
    pub traveler_summary: String,
    /// Exactly three short tips
    pub quick_tips: Vec<String>,
}

/// The merged response for one place query
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CityInfo {
    /// Resolved place name
    pub city: String,
    pub weather: WeatherReport,
    pub wikipedia: WikiSummary,
    pub ai_insights: AiInsights,
    pub places: PlacesReport,
}

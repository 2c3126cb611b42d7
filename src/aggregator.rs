//! Request-level aggregation across all providers
//!
//! The geocoder runs first and gates everything else. Weather, encyclopedia
//! and places then fan out concurrently and are all joined; the insight
//! generation runs last because it consumes the encyclopedia summary. One
//! failing provider fails the whole response with every failure message
//! preserved.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument, warn};

use crate::config::PanelConfig;
use crate::geocoding::{Geocoder, OpenWeatherGeocoder};
use crate::insights::{GeminiClient, InsightGenerator};
use crate::models::{CityInfo, WikiSummary};
use crate::places::{OverpassClient, PlaceSearch, fetch_places};
use crate::weather::{OpenWeatherClient, WeatherProvider};
use crate::wikipedia::{WikiProvider, WikiResolver, WikipediaApi};
use crate::{PanelError, Result};

/// Coordinates one place query across the five providers
pub struct CityInfoService {
    geocoder: Arc<dyn Geocoder>,
    weather: Arc<dyn WeatherProvider>,
    wikipedia: Arc<dyn WikiProvider>,
    places: Arc<dyn PlaceSearch>,
    insights: Arc<dyn InsightGenerator>,
}

impl CityInfoService {
    /// Assemble a service from provider implementations
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        weather: Arc<dyn WeatherProvider>,
        wikipedia: Arc<dyn WikiProvider>,
        places: Arc<dyn PlaceSearch>,
        insights: Arc<dyn InsightGenerator>,
    ) -> Self {
        Self {
            geocoder,
            weather,
            wikipedia,
            places,
            insights,
        }
    }

    /// Build the service with the real HTTP clients
    pub fn from_config(config: &PanelConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(OpenWeatherGeocoder::new(config)?),
            Arc::new(OpenWeatherClient::new(config)?),
            Arc::new(WikiResolver::new(
                WikipediaApi::new(config)?,
                config.defaults.title_suffix.clone(),
            )),
            Arc::new(OverpassClient::new(config)?),
            Arc::new(GeminiClient::new(config)?),
        ))
    }

    /// Aggregate everything known about one place.
    ///
    /// Returns the merged record, or one combined error carrying every
    /// provider failure message joined with `"; "`.
    #[instrument(skip(self))]
    pub async fn aggregate(&self, place_query: &str) -> Result<CityInfo> {
        let place_query = place_query.trim();
        if place_query.is_empty() {
            return Err(PanelError::validation(
                "query parameter \"city\" is required",
            ));
        }

        // Places needs coordinates, so a geocoding failure fails fast
        // before any other provider is called.
        let location = self.geocoder.geocode(place_query).await?;
        debug!("Fanning out providers for {}", location.name);

        let today = Utc::now().date_naive();
        let (weather, wikipedia, places) = tokio::join!(
            self.weather.report(place_query, today),
            self.wikipedia.resolve(place_query),
            fetch_places(self.places.as_ref(), &location),
        );

        // Insight generation consumes the encyclopedia summary, so it can
        // only start once the join is complete. A failed resolver degrades
        // to the sentinel; its own failure is still reported below.
        let background = match &wikipedia {
            Ok(summary) => summary.summary.clone(),
            Err(_) => WikiSummary::not_found().summary,
        };
        let ai_insights = self.insights.insights(&location.name, &background).await;

        match (weather, wikipedia, ai_insights, places) {
            (Ok(weather), Ok(wikipedia), Ok(ai_insights), Ok(places)) => Ok(CityInfo {
                city: location.name,
                weather,
                wikipedia,
                ai_insights,
                places,
            }),
            (weather, wikipedia, ai_insights, places) => {
                let messages: Vec<String> = [
                    weather.err().map(|e| e.to_string()),
                    wikipedia.err().map(|e| e.to_string()),
                    ai_insights.err().map(|e| e.to_string()),
                    places.err().map(|e| e.to_string()),
                ]
                .into_iter()
                .flatten()
                .collect();

                warn!(
                    "Aggregation for '{place_query}' failed: {}",
                    messages.join("; ")
                );
                Err(PanelError::aggregation_of(messages))
            }
        }
    }
}

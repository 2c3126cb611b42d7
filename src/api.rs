//! HTTP API surface
//!
//! Thin axum handlers over the aggregation service. Input errors map to 400,
//! provider failures to 502/503; the error body always carries one combined
//! message.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::aggregator::CityInfoService;
use crate::config::PanelConfig;
use crate::geocoding::{Geocoder, OpenWeatherGeocoder};
use crate::models::{CityInfo, CurrentWeather};
use crate::weather::OpenWeatherClient;
use crate::{PanelError, Result};

/// Shared state behind every handler
pub struct AppState {
    service: CityInfoService,
    weather: Arc<OpenWeatherClient>,
    geocoder: Arc<OpenWeatherGeocoder>,
}

impl AppState {
    /// Build all clients and the aggregation service from configuration
    pub fn from_config(config: &PanelConfig) -> Result<Self> {
        Ok(Self {
            service: CityInfoService::from_config(config)?,
            weather: Arc::new(OpenWeatherClient::new(config)?),
            geocoder: Arc::new(OpenWeatherGeocoder::new(config)?),
        })
    }
}

#[derive(Deserialize)]
pub struct CityParams {
    #[serde(default)]
    city: String,
}

#[derive(Deserialize)]
pub struct SuggestParams {
    #[serde(default)]
    query: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/city_info", get(city_info))
        .route("/weather", get(current_weather))
        .route("/autocomplete_cities", get(autocomplete_cities))
        .with_state(state)
}

async fn city_info(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CityParams>,
) -> std::result::Result<Json<CityInfo>, ApiError> {
    state
        .service
        .aggregate(&params.city)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn current_weather(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CityParams>,
) -> std::result::Result<Json<CurrentWeather>, ApiError> {
    state
        .weather
        .current(&params.city)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn autocomplete_cities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuggestParams>,
) -> std::result::Result<Json<Vec<String>>, ApiError> {
    if params.query.trim().is_empty() {
        return Ok(Json(Vec::new()));
    }
    state
        .geocoder
        .suggest(params.query.trim())
        .await
        .map(Json)
        .map_err(error_response)
}

fn error_response(err: PanelError) -> ApiError {
    let status = match &err {
        PanelError::Validation { .. } => StatusCode::BAD_REQUEST,
        PanelError::Network { .. } => StatusCode::SERVICE_UNAVAILABLE,
        PanelError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        PanelError::Api { .. } | PanelError::Parse { .. } | PanelError::Aggregation { .. } => {
            StatusCode::BAD_GATEWAY
        }
    };
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_bad_requests() {
        let (status, _) = error_response(PanelError::validation("city is required"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn provider_failures_are_bad_gateway() {
        let (status, _) = error_response(PanelError::aggregation_of(vec!["x".to_string()]));
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, _) = error_response(PanelError::api("status 500"));
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn transport_failures_are_service_unavailable() {
        let (status, _) = error_response(PanelError::network("timed out"));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}

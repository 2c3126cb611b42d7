//! Travel panel backend
//!
//! One place query fans out to weather, encyclopedia, points-of-interest and
//! generative-insight providers; the results merge into a single response or
//! a single combined failure.

pub mod aggregator;
pub mod api;
pub mod config;
pub mod error;
pub mod geocoding;
pub mod insights;
pub mod models;
pub mod places;
pub mod weather;
pub mod web;
pub mod wikipedia;

// Re-export core types for public API
pub use aggregator::CityInfoService;
pub use config::PanelConfig;
pub use error::PanelError;
pub use models::{
    AiInsights, CityInfo, CurrentWeather, DayForecast, Location, Place, PlacesReport,
    WeatherReport, WikiSummary,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User agent sent with every outbound provider request
pub const USER_AGENT: &str = concat!("travel-panel/", env!("CARGO_PKG_VERSION"));

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, PanelError>;

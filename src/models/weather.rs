//! Weather models: current conditions, raw forecast readings and the
//! per-day summaries derived from them

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One 3-hour forecast reading, normalized from the provider response
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastEntry {
    /// Reading timestamp in the provider's reference time
    pub timestamp: NaiveDateTime,
    /// Minimum temperature for the interval
    pub temp_min: f64,
    /// Maximum temperature for the interval
    pub temp_max: f64,
    /// Condition icon code, e.g. "01d" or "10n"
    pub icon: String,
    /// Condition description text
    pub description: String,
}

/// Daily forecast summary aggregated from 3-hour readings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DayForecast {
    /// Calendar day this summary covers
    pub date: NaiveDate,
    /// Lowest temperature across the day, 1 decimal
    pub temp_min: f64,
    /// Highest temperature across the day, 1 decimal
    pub temp_max: f64,
    /// Icon URL for the day's representative condition
    pub icon: String,
    /// The day's representative condition description
    pub description: String,
}

/// Current conditions plus the daily forecast for a city
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherReport {
    /// City name as reported by the weather provider
    pub city: String,
    /// Current temperature, 1 decimal
    pub current_temp: f64,
    /// Current condition description
    pub current_desc: String,
    /// Icon URL for the current condition
    pub current_icon: String,
    /// Per-day summaries, today excluded, at most 5 entries
    pub forecast: Vec<DayForecast>,
}

/// Standalone current-weather response
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CurrentWeather {
    /// City name as reported by the weather provider
    pub city: String,
    /// Current temperature, 1 decimal
    pub temperature: f64,
    /// Current condition description
    pub description: String,
    /// Icon URL for the current condition
    pub icon: String,
}

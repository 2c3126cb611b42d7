//! Data models shared across providers and the aggregation layer

pub mod city_info;
pub mod location;
pub mod weather;

pub use city_info::{AiInsights, CityInfo, Place, PlacesReport, WikiSummary};
pub use location::Location;
pub use weather::{CurrentWeather, DayForecast, ForecastEntry, WeatherReport};

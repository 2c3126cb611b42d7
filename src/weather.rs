//! Weather client for the OpenWeather API and the daily forecast aggregation
//!
//! One call to the 5-day/3-hour forecast endpoint produces both the current
//! conditions (first reading of the series) and the per-day summaries. The
//! aggregation itself is a pure function over normalized readings.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::config::PanelConfig;
use crate::models::{CurrentWeather, DayForecast, ForecastEntry, WeatherReport};
use crate::{PanelError, Result, USER_AGENT};

/// Maximum number of days in the aggregated forecast
const FORECAST_DAYS: usize = 5;

/// Timestamp format of the forecast series (provider reference time)
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Produces the weather portion of the aggregated response
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Fetch current conditions and the daily forecast for a city.
    /// `today` is the request's current date; it is excluded from the forecast.
    async fn report(&self, city_query: &str, today: NaiveDate) -> Result<WeatherReport>;
}

/// OpenWeather forecast/current-weather client
pub struct OpenWeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
    units: String,
    language: String,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
}

#[derive(Debug, Deserialize)]
struct OwCondition {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastItem {
    dt_txt: String,
    main: OwMain,
    weather: Vec<OwCondition>,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastItem>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwCurrentMain,
    weather: Vec<OwCondition>,
}

impl OpenWeatherClient {
    /// Create a new weather client from configuration
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
            units: config.defaults.units.clone(),
            language: config.defaults.language.clone(),
        })
    }

    /// Fetch current conditions only, for the standalone weather endpoint
    #[instrument(skip(self))]
    pub async fn current(&self, city_query: &str) -> Result<CurrentWeather> {
        let city_query = city_query.trim();
        if city_query.is_empty() {
            return Err(PanelError::validation("query parameter \"city\" is required"));
        }

        let url = format!("{}/data/2.5/weather", self.base_url);
        let parsed: OwCurrentResponse = self.get_json(&url, city_query).await?;

        let condition = parsed.weather.first();
        Ok(CurrentWeather {
            city: parsed.name,
            temperature: round1(parsed.main.temp),
            description: condition.map(|c| c.description.clone()).unwrap_or_default(),
            icon: condition.map(|c| icon_url(&c.icon)).unwrap_or_default(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, city: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", self.units.as_str()),
                ("lang", self.language.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PanelError::network(format!("Weather request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PanelError::api(format!(
                "Weather request failed with status {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PanelError::api(format!("Failed to parse weather response: {e}")))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    #[instrument(skip(self))]
    async fn report(&self, city_query: &str, today: NaiveDate) -> Result<WeatherReport> {
        debug!("Fetching 5-day forecast for '{city_query}'");

        let url = format!("{}/data/2.5/forecast", self.base_url);
        let parsed: OwForecastResponse = self.get_json(&url, city_query).await?;

        let current = parsed
            .list
            .first()
            .ok_or_else(|| PanelError::api("Forecast response contained no data"))?;
        let condition = current.weather.first();
        let current_temp = round1(current.main.temp);
        let current_desc = condition.map(|c| c.description.clone()).unwrap_or_default();
        let current_icon = condition.map(|c| icon_url(&c.icon)).unwrap_or_default();

        let entries: Vec<ForecastEntry> = parsed
            .list
            .iter()
            .filter_map(|item| {
                let timestamp =
                    NaiveDateTime::parse_from_str(&item.dt_txt, TIMESTAMP_FORMAT).ok()?;
                let condition = item.weather.first();
                Some(ForecastEntry {
                    timestamp,
                    temp_min: item.main.temp_min,
                    temp_max: item.main.temp_max,
                    icon: condition.map(|c| c.icon.clone()).unwrap_or_default(),
                    description: condition.map(|c| c.description.clone()).unwrap_or_default(),
                })
            })
            .collect();

        let forecast = daily_forecast(&entries, today);
        info!(
            "Forecast for {}: {} readings into {} days",
            parsed.city.name,
            entries.len(),
            forecast.len()
        );

        Ok(WeatherReport {
            city: parsed.city.name,
            current_temp,
            current_desc,
            current_icon,
            forecast,
        })
    }
}

/// Group 3-hour readings into per-day summaries.
///
/// Today's readings are dropped entirely (current conditions are reported
/// separately), output stays in chronological order and is truncated to
/// [`FORECAST_DAYS`] entries.
pub fn daily_forecast(entries: &[ForecastEntry], today: NaiveDate) -> Vec<DayForecast> {
    struct DayAcc {
        date: NaiveDate,
        temp_min: f64,
        temp_max: f64,
        icons: Vec<String>,
        descriptions: Vec<String>,
    }

    let mut days: Vec<DayAcc> = Vec::new();
    for entry in entries {
        let date = entry.timestamp.date();
        if date == today {
            continue;
        }

        match days.iter_mut().find(|day| day.date == date) {
            Some(day) => {
                day.temp_min = day.temp_min.min(entry.temp_min);
                day.temp_max = day.temp_max.max(entry.temp_max);
                day.icons.push(entry.icon.clone());
                day.descriptions.push(entry.description.clone());
            }
            None => days.push(DayAcc {
                date,
                temp_min: entry.temp_min,
                temp_max: entry.temp_max,
                icons: vec![entry.icon.clone()],
                descriptions: vec![entry.description.clone()],
            }),
        }
    }

    days.into_iter()
        .take(FORECAST_DAYS)
        .map(|day| DayForecast {
            date: day.date,
            temp_min: round1(day.temp_min),
            temp_max: round1(day.temp_max),
            icon: icon_url(&normalize_icon(&most_frequent(&day.icons))),
            description: most_frequent(&day.descriptions),
        })
        .collect()
}

/// Most frequent value; exact ties resolve to the first-encountered value.
/// An empty slice yields an empty string.
fn most_frequent(values: &[String]) -> String {
    let mut counted: Vec<(&String, usize)> = Vec::new();
    for value in values {
        match counted.iter_mut().find(|(v, _)| *v == value) {
            Some((_, count)) => *count += 1,
            None => counted.push((value, 1)),
        }
    }

    let mut best: Option<(&String, usize)> = None;
    for (value, count) in counted {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.clone()).unwrap_or_default()
}

/// Rewrite night-variant icon codes to the day variant ("10n" -> "10d")
fn normalize_icon(code: &str) -> String {
    match code.strip_suffix('n') {
        Some(prefix) => format!("{prefix}d"),
        None => code.to_string(),
    }
}

/// Full icon URL for an OpenWeather icon code
fn icon_url(code: &str) -> String {
    format!("https://openweathermap.org/img/wn/{code}@2x.png")
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn reading(dt: &str, min: f64, max: f64, icon: &str, desc: &str) -> ForecastEntry {
        ForecastEntry {
            timestamp: NaiveDateTime::parse_from_str(dt, TIMESTAMP_FORMAT).unwrap(),
            temp_min: min,
            temp_max: max,
            icon: icon.to_string(),
            description: desc.to_string(),
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn excludes_today_and_keeps_chronological_order() {
        let entries = vec![
            reading("2026-08-07 09:00:00", 20.0, 24.0, "01d", "clear sky"),
            reading("2026-08-08 09:00:00", 18.0, 22.0, "02d", "few clouds"),
            reading("2026-08-09 09:00:00", 17.0, 21.0, "03d", "scattered clouds"),
        ];

        let days = daily_forecast(&entries, date("2026-08-07"));
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, date("2026-08-08"));
        assert_eq!(days[1].date, date("2026-08-09"));
    }

    #[test]
    fn truncates_to_five_days() {
        let mut entries = Vec::new();
        for day in 8..=15 {
            entries.push(reading(
                &format!("2026-08-{day:02} 12:00:00"),
                15.0,
                25.0,
                "01d",
                "clear sky",
            ));
        }

        let days = daily_forecast(&entries, date("2026-08-07"));
        assert_eq!(days.len(), 5);
        assert_eq!(days[4].date, date("2026-08-12"));
    }

    #[test]
    fn accumulates_min_max_across_the_day() {
        let entries = vec![
            reading("2026-08-08 03:00:00", 14.2, 16.8, "01d", "clear sky"),
            reading("2026-08-08 12:00:00", 19.55, 26.34, "01d", "clear sky"),
            reading("2026-08-08 21:00:00", 15.0, 18.0, "01n", "clear sky"),
        ];

        let days = daily_forecast(&entries, date("2026-08-07"));
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].temp_min, 14.2);
        assert_eq!(days[0].temp_max, 26.3);
    }

    #[rstest]
    #[case(&["01d", "01d", "02n"], "01d")]
    #[case(&["01n", "01n", "02d"], "01d")]
    #[case(&["02d", "10n", "10n"], "10d")]
    fn representative_icon_is_normalized_majority(#[case] icons: &[&str], #[case] expected: &str) {
        let entries: Vec<ForecastEntry> = icons
            .iter()
            .enumerate()
            .map(|(i, icon)| {
                reading(
                    &format!("2026-08-08 {:02}:00:00", 3 * i),
                    10.0,
                    20.0,
                    icon,
                    "whatever",
                )
            })
            .collect();

        let days = daily_forecast(&entries, date("2026-08-07"));
        assert_eq!(
            days[0].icon,
            format!("https://openweathermap.org/img/wn/{expected}@2x.png")
        );
    }

    #[test]
    fn tie_breaks_to_first_encountered() {
        let values = vec![
            "light rain".to_string(),
            "overcast".to_string(),
            "overcast".to_string(),
            "light rain".to_string(),
        ];
        assert_eq!(most_frequent(&values), "light rain");
    }

    #[test]
    fn most_frequent_of_empty_is_empty() {
        assert_eq!(most_frequent(&[]), "");
    }

    #[rstest]
    #[case("10n", "10d")]
    #[case("01d", "01d")]
    #[case("04n", "04d")]
    fn night_icons_become_day_icons(#[case] code: &str, #[case] expected: &str) {
        assert_eq!(normalize_icon(code), expected);
    }

    #[test]
    fn temperatures_round_to_one_decimal() {
        let entries = vec![reading("2026-08-08 12:00:00", 14.25, 26.34, "01d", "clear")];
        let days = daily_forecast(&entries, date("2026-08-07"));
        assert_eq!(days[0].temp_min, 14.3);
        assert_eq!(days[0].temp_max, 26.3);
    }

    #[test]
    fn weather_client_requires_api_key() {
        let config = PanelConfig::default();
        assert!(matches!(
            OpenWeatherClient::new(&config),
            Err(PanelError::Config { .. })
        ));
    }

    #[test]
    fn parses_forecast_payload() {
        let body = r#"{
            "city": {"name": "Rio de Janeiro"},
            "list": [
                {
                    "dt_txt": "2026-08-07 12:00:00",
                    "main": {"temp": 24.37, "temp_min": 22.1, "temp_max": 25.9},
                    "weather": [{"description": "clear sky", "icon": "01d"}]
                }
            ]
        }"#;
        let parsed: OwForecastResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.city.name, "Rio de Janeiro");
        assert_eq!(parsed.list.len(), 1);
        assert_eq!(parsed.list[0].weather[0].icon, "01d");
    }
}

//! Configuration management for the travel panel
//!
//! Handles loading configuration from files and environment variables,
//! and provides validation for all configuration settings. Provider
//! clients receive this struct at construction time; nothing reads
//! ambient globals.

use crate::PanelError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the travel panel
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PanelConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// External provider settings
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Default request parameters
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port the API listens on
    #[serde(default = "default_port")]
    pub port: u16,
}

/// External provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// OpenWeather API key (geocoding + weather/forecast)
    pub openweather_api_key: Option<String>,
    /// Gemini API key (insight generation)
    pub gemini_api_key: Option<String>,
    /// Base URL for the OpenWeather API
    #[serde(default = "default_openweather_base_url")]
    pub openweather_base_url: String,
    /// Wikipedia MediaWiki API endpoint
    #[serde(default = "default_wikipedia_api_url")]
    pub wikipedia_api_url: String,
    /// Overpass API endpoint
    #[serde(default = "default_overpass_api_url")]
    pub overpass_api_url: String,
    /// Base URL for the Gemini generative API
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    /// Gemini model identifier
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    /// Per-request timeout in seconds for all outbound calls
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Default request parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Language code passed to providers that localize responses
    #[serde(default = "default_language")]
    pub language: String,
    /// Measurement units for weather data
    #[serde(default = "default_units")]
    pub units: String,
    /// Disambiguation suffix tried first on encyclopedia lookups
    #[serde(default = "default_title_suffix")]
    pub title_suffix: String,
}

// Default value functions
fn default_port() -> u16 {
    3000
}

fn default_openweather_base_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_wikipedia_api_url() -> String {
    "https://en.wikipedia.org/w/api.php".to_string()
}

fn default_overpass_api_url() -> String {
    "https://overpass-api.de/api/interpreter".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_units() -> String {
    "metric".to_string()
}

fn default_title_suffix() -> String {
    "city".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openweather_api_key: None,
            gemini_api_key: None,
            openweather_base_url: default_openweather_base_url(),
            wikipedia_api_url: default_wikipedia_api_url(),
            overpass_api_url: default_overpass_api_url(),
            gemini_base_url: default_gemini_base_url(),
            gemini_model: default_gemini_model(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            units: default_units(),
            title_suffix: default_title_suffix(),
        }
    }
}

impl PanelConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. TRAVEL_PANEL__PROVIDERS__OPENWEATHER_API_KEY
        builder = builder.add_source(
            Environment::with_prefix("TRAVEL_PANEL")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let config: PanelConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Default configuration file location
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("travel-panel").join("config.toml"))
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(PanelError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(PanelError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if self.providers.timeout_seconds == 0 || self.providers.timeout_seconds > 300 {
            return Err(
                PanelError::config("Provider timeout must be between 1 and 300 seconds").into(),
            );
        }

        for (name, url) in [
            ("OpenWeather base URL", &self.providers.openweather_base_url),
            ("Wikipedia API URL", &self.providers.wikipedia_api_url),
            ("Overpass API URL", &self.providers.overpass_api_url),
            ("Gemini base URL", &self.providers.gemini_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(PanelError::config(format!(
                    "{name} must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        for (name, key) in [
            ("OpenWeather", &self.providers.openweather_api_key),
            ("Gemini", &self.providers.gemini_api_key),
        ] {
            if let Some(key) = key
                && key.is_empty()
            {
                return Err(PanelError::config(format!(
                    "{name} API key cannot be empty if provided. Either remove it or provide a valid key."
                ))
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PanelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 3000);
        assert_eq!(
            config.providers.openweather_base_url,
            "https://api.openweathermap.org"
        );
        assert_eq!(config.defaults.title_suffix, "city");
        assert!(config.providers.openweather_api_key.is_none());
    }

    #[test]
    fn test_validation_rejects_invalid_log_level() {
        let mut config = PanelConfig::default();
        config.logging.level = "loud".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid log level")
        );
    }

    #[test]
    fn test_validation_rejects_empty_api_key() {
        let mut config = PanelConfig::default();
        config.providers.openweather_api_key = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_url() {
        let mut config = PanelConfig::default();
        config.providers.overpass_api_url = "ftp://overpass".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let mut config = PanelConfig::default();
        config.providers.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_path_generation() {
        let path = PanelConfig::config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("travel-panel"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }
}

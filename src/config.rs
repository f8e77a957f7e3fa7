//! Configuration management for the `WindRadar` application
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::WindRadarError;
use crate::alerts::StreakPolicy;
use anyhow::{Context, Result};
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the `WindRadar` application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WindRadarConfig {
    /// Weather and geocoding API configuration
    pub weather: WeatherConfig,
    /// Local storage configuration
    pub storage: StorageConfig,
    /// Alert checking configuration
    pub alerts: AlertsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Embedded HTTP server configuration
    pub server: ServerConfig,
}

/// Weather API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Base URL for the forecast API
    pub forecast_base_url: String,
    /// Base URL for the geocoding API
    pub geocoding_base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
    /// Maximum number of retries for transient failures
    pub max_retries: u32,
    /// Unit requested for wind speeds (kmh, ms, mph, kn)
    pub wind_speed_unit: String,
    /// Number of city suggestions requested per lookup
    pub suggestion_count: u32,
}

/// Local storage configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the embedded database
    pub path: String,
}

/// Alert evaluation and scheduling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// How many days ahead of now a qualifying hour may trigger an alert
    pub max_day_forward: u32,
    /// Interval between background checks in minutes
    pub check_interval_minutes: u32,
    /// Delay before the first background check in minutes
    pub initial_delay_minutes: u32,
    /// How out-of-window hours affect a running streak
    pub streak_policy: StreakPolicy,
    /// Timezone used when the selected city carries none
    pub default_timezone: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

/// Embedded HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port the JSON API listens on
    pub port: u16,
}

// Default value functions
fn default_forecast_base_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_geocoding_base_url() -> String {
    "https://geocoding-api.open-meteo.com/v1".to_string()
}

fn default_weather_timeout() -> u32 {
    30
}

fn default_weather_max_retries() -> u32 {
    3
}

fn default_wind_speed_unit() -> String {
    "kmh".to_string()
}

fn default_suggestion_count() -> u32 {
    5
}

fn default_storage_path() -> String {
    dirs::data_dir()
        .map(|dir| dir.join("windradar").join("db"))
        .unwrap_or_else(|| PathBuf::from("windradar-db"))
        .to_string_lossy()
        .into_owned()
}

fn default_max_day_forward() -> u32 {
    1
}

fn default_check_interval() -> u32 {
    60
}

fn default_initial_delay() -> u32 {
    5
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            forecast_base_url: default_forecast_base_url(),
            geocoding_base_url: default_geocoding_base_url(),
            timeout_seconds: default_weather_timeout(),
            max_retries: default_weather_max_retries(),
            wind_speed_unit: default_wind_speed_unit(),
            suggestion_count: default_suggestion_count(),
        }
    }
}

impl WeatherConfig {
    /// Display label of the requested wind speed unit
    #[must_use]
    pub fn wind_unit_label(&self) -> &str {
        match self.wind_speed_unit.as_str() {
            "kmh" => "km/h",
            "ms" => "m/s",
            other => other,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            max_day_forward: default_max_day_forward(),
            check_interval_minutes: default_check_interval(),
            initial_delay_minutes: default_initial_delay(),
            streak_policy: StreakPolicy::default(),
            default_timezone: default_timezone(),
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

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl WindRadarConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // WINDRADAR_ALERTS__MAX_DAY_FORWARD=2 style overrides
        builder = builder.add_source(
            Environment::with_prefix("WINDRADAR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: WindRadarConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("windradar").join("config.toml"))
    }

    /// Apply default values to empty or zeroed configuration fields
    pub fn apply_defaults(&mut self) {
        if self.weather.forecast_base_url.is_empty() {
            self.weather.forecast_base_url = default_forecast_base_url();
        }
        if self.weather.geocoding_base_url.is_empty() {
            self.weather.geocoding_base_url = default_geocoding_base_url();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_weather_timeout();
        }
        if self.weather.wind_speed_unit.is_empty() {
            self.weather.wind_speed_unit = default_wind_speed_unit();
        }
        if self.weather.suggestion_count == 0 {
            self.weather.suggestion_count = default_suggestion_count();
        }
        if self.storage.path.is_empty() {
            self.storage.path = default_storage_path();
        }
        if self.alerts.max_day_forward == 0 {
            self.alerts.max_day_forward = default_max_day_forward();
        }
        if self.alerts.check_interval_minutes == 0 {
            self.alerts.check_interval_minutes = default_check_interval();
        }
        if self.alerts.default_timezone.is_empty() {
            self.alerts.default_timezone = default_timezone();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.server.port == 0 {
            self.server.port = default_port();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Timezone used when a city carries none or an unknown one
    pub fn default_timezone(&self) -> Result<Tz> {
        self.alerts.default_timezone.parse::<Tz>().map_err(|_| {
            WindRadarError::config(format!(
                "Unknown default timezone '{}'",
                self.alerts.default_timezone
            ))
            .into()
        })
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.weather.timeout_seconds > 300 {
            return Err(
                WindRadarError::config("Weather API timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.weather.max_retries > 10 {
            return Err(WindRadarError::config("Weather API max retries cannot exceed 10").into());
        }

        if self.weather.suggestion_count > 100 {
            return Err(WindRadarError::config("Suggestion count cannot exceed 100").into());
        }

        // Open-Meteo serves at most 16 forecast days
        if self.alerts.max_day_forward > 16 {
            return Err(WindRadarError::config("Alert look-ahead cannot exceed 16 days").into());
        }

        if self.alerts.check_interval_minutes < 15 {
            return Err(
                WindRadarError::config("Alert check interval must be at least 15 minutes").into(),
            );
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(WindRadarError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(WindRadarError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let valid_units = ["kmh", "ms", "mph", "kn"];
        if !valid_units.contains(&self.weather.wind_speed_unit.as_str()) {
            return Err(WindRadarError::config(format!(
                "Invalid wind speed unit '{}'. Must be one of: {}",
                self.weather.wind_speed_unit,
                valid_units.join(", ")
            ))
            .into());
        }

        for url in [&self.weather.forecast_base_url, &self.weather.geocoding_base_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(WindRadarError::config(format!(
                    "API base URL '{url}' must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        self.default_timezone()?;

        Ok(())
    }
}

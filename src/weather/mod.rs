//! Forecast and geocoding sources

use async_trait::async_trait;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::WindRadarError;
use crate::models::{CitySelection, DailyForecast, GeocodingResult, HourlyForecast};

pub mod open_meteo;

pub use open_meteo::OpenMeteoClient;

/// Which forecast series the display follows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMode {
    Hourly,
    #[default]
    Daily,
}

/// A fetched forecast in the requested mode
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", content = "forecast", rename_all = "snake_case")]
pub enum ForecastResult {
    Hourly(HourlyForecast),
    Daily(DailyForecast),
}

/// Point forecast lookups
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Hourly series for the coordinates, timestamps in `timezone`
    async fn hourly(
        &self,
        latitude: f64,
        longitude: f64,
        timezone: &str,
    ) -> Result<HourlyForecast, WindRadarError>;

    async fn daily(
        &self,
        latitude: f64,
        longitude: f64,
        timezone: &str,
    ) -> Result<DailyForecast, WindRadarError>;

    /// Fetch the series `mode` asks for at `city`, timestamps in `zone`
    async fn fetch(
        &self,
        city: &CitySelection,
        zone: Tz,
        mode: ForecastMode,
    ) -> Result<ForecastResult, WindRadarError> {
        let timezone = zone.name();
        match mode {
            ForecastMode::Hourly => Ok(ForecastResult::Hourly(
                self.hourly(city.latitude, city.longitude, timezone).await?,
            )),
            ForecastMode::Daily => Ok(ForecastResult::Daily(
                self.daily(city.latitude, city.longitude, timezone).await?,
            )),
        }
    }
}

/// City name search for the location picker
#[async_trait]
pub trait CitySuggestionProvider: Send + Sync {
    async fn search(&self, name: &str, count: u32) -> Result<Vec<GeocodingResult>, WindRadarError>;
}

//! Open-Meteo forecast and geocoding client
//!
//! Both APIs are key-free. Requests go through a middleware client that
//! retries transient failures with exponential backoff, so callers see a
//! single result per call.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::{CitySuggestionProvider, ForecastProvider};
use crate::config::WeatherConfig;
use crate::error::WindRadarError;
use crate::models::{DailyForecast, DailyUnits, GeocodingResult, HourlyForecast, HourlyUnits};

const HOURLY_FIELDS: &str =
    "temperature_2m,wind_speed_10m,wind_gusts_10m,wind_direction_10m,cloud_cover,rain";
const DAILY_FIELDS: &str = "temperature_2m_min,temperature_2m_max,wind_speed_10m_max,wind_gusts_10m_max,rain_sum,sunshine_duration,daylight_duration";

pub struct OpenMeteoClient {
    client: ClientWithMiddleware,
    forecast_base_url: String,
    geocoding_base_url: String,
    wind_speed_unit: String,
}

impl OpenMeteoClient {
    pub fn new(config: &WeatherConfig) -> anyhow::Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(Duration::from_secs(u64::from(config.timeout_seconds)))
            .user_agent(concat!("windradar/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(inner)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            forecast_base_url: config.forecast_base_url.trim_end_matches('/').to_string(),
            geocoding_base_url: config.geocoding_base_url.trim_end_matches('/').to_string(),
            wind_speed_unit: config.wind_speed_unit.clone(),
        })
    }

    fn forecast_url(&self, latitude: f64, longitude: f64, timezone: &str, series: &str) -> String {
        let fields = if series == "hourly" {
            HOURLY_FIELDS
        } else {
            DAILY_FIELDS
        };
        format!(
            "{}/forecast?latitude={}&longitude={}&timezone={}&{}={}&wind_speed_unit={}",
            self.forecast_base_url,
            latitude,
            longitude,
            urlencoding::encode(timezone),
            series,
            fields,
            self.wind_speed_unit
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, WindRadarError> {
        debug!("Calling the API");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| WindRadarError::api(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WindRadarError::api(format!("{status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| WindRadarError::api(format!("unexpected response: {e}")))
    }
}

#[async_trait]
impl ForecastProvider for OpenMeteoClient {
    #[instrument(skip(self))]
    async fn hourly(
        &self,
        latitude: f64,
        longitude: f64,
        timezone: &str,
    ) -> Result<HourlyForecast, WindRadarError> {
        let url = self.forecast_url(latitude, longitude, timezone, "hourly");
        let response: HourlyResponse = self.get_json(&url).await?;
        response
            .hourly
            .map(|data| data.into_forecast(response.hourly_units.unwrap_or_default()))
            .ok_or_else(|| WindRadarError::api("response has no hourly data"))
    }

    #[instrument(skip(self))]
    async fn daily(
        &self,
        latitude: f64,
        longitude: f64,
        timezone: &str,
    ) -> Result<DailyForecast, WindRadarError> {
        let url = self.forecast_url(latitude, longitude, timezone, "daily");
        let response: DailyResponse = self.get_json(&url).await?;
        response
            .daily
            .map(|data| data.into_forecast(response.daily_units.unwrap_or_default()))
            .ok_or_else(|| WindRadarError::api("response has no daily data"))
    }
}

#[async_trait]
impl CitySuggestionProvider for OpenMeteoClient {
    #[instrument(skip(self))]
    async fn search(&self, name: &str, count: u32) -> Result<Vec<GeocodingResult>, WindRadarError> {
        let url = format!(
            "{}/search?name={}&count={}&language=en&format=json",
            self.geocoding_base_url,
            urlencoding::encode(name),
            count
        );
        let response: GeocodingResponse = self.get_json(&url).await?;
        Ok(response.results.unwrap_or_default())
    }
}

type Column = Option<Vec<Option<f64>>>;

#[derive(Debug, Deserialize)]
struct HourlyResponse {
    hourly: Option<HourlyData>,
    hourly_units: Option<HourlyUnitsData>,
}

#[derive(Debug, Deserialize)]
struct HourlyData {
    time: Vec<String>,
    temperature_2m: Column,
    wind_speed_10m: Column,
    wind_gusts_10m: Column,
    wind_direction_10m: Column,
    cloud_cover: Column,
    rain: Column,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HourlyUnitsData {
    temperature_2m: String,
    wind_speed_10m: String,
    wind_gusts_10m: String,
    wind_direction_10m: String,
    cloud_cover: String,
    rain: String,
}

impl HourlyData {
    fn into_forecast(self, units: HourlyUnitsData) -> HourlyForecast {
        HourlyForecast {
            time: self.time,
            temperature: self.temperature_2m.unwrap_or_default(),
            wind_speed: self.wind_speed_10m.unwrap_or_default(),
            wind_gusts: self.wind_gusts_10m.unwrap_or_default(),
            wind_direction: self.wind_direction_10m.unwrap_or_default(),
            cloud_cover: self.cloud_cover.unwrap_or_default(),
            rain: self.rain.unwrap_or_default(),
            units: HourlyUnits {
                temperature: units.temperature_2m,
                wind_speed: units.wind_speed_10m,
                wind_gusts: units.wind_gusts_10m,
                wind_direction: units.wind_direction_10m,
                cloud_cover: units.cloud_cover,
                rain: units.rain,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct DailyResponse {
    daily: Option<DailyData>,
    daily_units: Option<DailyUnitsData>,
}

#[derive(Debug, Deserialize)]
struct DailyData {
    time: Vec<String>,
    temperature_2m_min: Column,
    temperature_2m_max: Column,
    wind_speed_10m_max: Column,
    wind_gusts_10m_max: Column,
    rain_sum: Column,
    sunshine_duration: Column,
    daylight_duration: Column,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DailyUnitsData {
    temperature_2m_max: String,
    wind_speed_10m_max: String,
    wind_gusts_10m_max: String,
    rain_sum: String,
    sunshine_duration: String,
    daylight_duration: String,
}

impl DailyData {
    fn into_forecast(self, units: DailyUnitsData) -> DailyForecast {
        DailyForecast {
            time: self.time,
            temperature_min: self.temperature_2m_min.unwrap_or_default(),
            temperature_max: self.temperature_2m_max.unwrap_or_default(),
            wind_speed_max: self.wind_speed_10m_max.unwrap_or_default(),
            wind_gusts_max: self.wind_gusts_10m_max.unwrap_or_default(),
            rain_sum: self.rain_sum.unwrap_or_default(),
            sunshine_duration: self.sunshine_duration.unwrap_or_default(),
            daylight_duration: self.daylight_duration.unwrap_or_default(),
            units: DailyUnits {
                temperature: units.temperature_2m_max,
                wind_speed: units.wind_speed_10m_max,
                wind_gusts: units.wind_gusts_10m_max,
                rain: units.rain_sum,
                sunshine_duration: units.sunshine_duration,
                daylight_duration: units.daylight_duration,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeocodingResult>>,
}

//! Hourly and daily forecast series
//!
//! Both series are kept in the column layout the forecast API returns:
//! one timestamp array plus one array per measurement, aligned by index.
//! Measurements are optional per index because the API reports gaps as
//! `null`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp layout of hourly entries (local wall-clock time)
pub const HOURLY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Parse an hourly timestamp such as `2025-10-02T14:00`
#[must_use]
pub fn parse_local_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, HOURLY_TIME_FORMAT).ok()
}

/// Units reported alongside the hourly series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyUnits {
    pub temperature: String,
    pub wind_speed: String,
    pub wind_gusts: String,
    pub wind_direction: String,
    pub cloud_cover: String,
    pub rain: String,
}

/// Units reported alongside the daily series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyUnits {
    pub temperature: String,
    pub wind_speed: String,
    pub wind_gusts: String,
    pub rain: String,
    pub sunshine_duration: String,
    pub daylight_duration: String,
}

/// Hourly forecast series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecast {
    pub time: Vec<String>,
    pub temperature: Vec<Option<f64>>,
    pub wind_speed: Vec<Option<f64>>,
    pub wind_gusts: Vec<Option<f64>>,
    pub wind_direction: Vec<Option<f64>>,
    pub cloud_cover: Vec<Option<f64>>,
    pub rain: Vec<Option<f64>>,
    pub units: HourlyUnits,
}

/// One row of the hourly series, as seen by the alert evaluator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourlyRecord {
    /// `None` when the timestamp could not be parsed
    pub time: Option<NaiveDateTime>,
    pub wind_speed: Option<f64>,
    pub wind_gust: Option<f64>,
    pub wind_direction: Option<f64>,
}

fn value_at(values: &[Option<f64>], index: usize) -> Option<f64> {
    values.get(index).copied().flatten()
}

fn pick<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices
        .iter()
        .filter_map(|&i| values.get(i).cloned())
        .collect()
}

impl HourlyForecast {
    #[must_use]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Rows in timestamp order
    pub fn records(&self) -> impl Iterator<Item = HourlyRecord> + '_ {
        self.time.iter().enumerate().map(|(i, raw)| HourlyRecord {
            time: parse_local_time(raw),
            wind_speed: value_at(&self.wind_speed, i),
            wind_gust: value_at(&self.wind_gusts, i),
            wind_direction: value_at(&self.wind_direction, i),
        })
    }

    /// Keep only the rows at `indices`, in that order
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            time: pick(&self.time, indices),
            temperature: pick(&self.temperature, indices),
            wind_speed: pick(&self.wind_speed, indices),
            wind_gusts: pick(&self.wind_gusts, indices),
            wind_direction: pick(&self.wind_direction, indices),
            cloud_cover: pick(&self.cloud_cover, indices),
            rain: pick(&self.rain, indices),
            units: self.units.clone(),
        }
    }

    /// Drop rows earlier than `start_of_hour`.
    ///
    /// Rows with unparseable timestamps are kept. When nothing would remain
    /// the series is returned unchanged.
    #[must_use]
    pub fn upcoming(&self, start_of_hour: NaiveDateTime) -> Self {
        let kept: Vec<usize> = self
            .time
            .iter()
            .enumerate()
            .filter(|(_, raw)| parse_local_time(raw).is_none_or(|t| t >= start_of_hour))
            .map(|(i, _)| i)
            .collect();

        if kept.is_empty() {
            self.clone()
        } else {
            self.select(&kept)
        }
    }
}

/// Daily forecast series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub time: Vec<String>,
    pub temperature_min: Vec<Option<f64>>,
    pub temperature_max: Vec<Option<f64>>,
    pub wind_speed_max: Vec<Option<f64>>,
    pub wind_gusts_max: Vec<Option<f64>>,
    pub rain_sum: Vec<Option<f64>>,
    /// Seconds of sunshine per day
    pub sunshine_duration: Vec<Option<f64>>,
    /// Seconds of daylight per day
    pub daylight_duration: Vec<Option<f64>>,
    pub units: DailyUnits,
}

impl DailyForecast {
    #[must_use]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

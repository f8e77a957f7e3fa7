//! Presentation of forecasts and alerts
//!
//! Turns raw forecast columns into display rows and renders dates the way
//! the forecast list shows them ("Thursday 2nd October", "Thursday 14:00").

use std::f64::consts::PI;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::models::{Alert, DailyForecast, HourlyForecast, parse_local_time};
use crate::weather::ForecastResult;

const MISSING: &str = "—";

fn parse_flexible(raw: &str) -> Option<NaiveDateTime> {
    parse_local_time(raw).or_else(|| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
}

fn ordinal_suffix(day: u32) -> &'static str {
    if (11..=13).contains(&day) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// `2025-10-02` → `Thursday 2nd October`; unparseable input is returned as is
#[must_use]
pub fn format_day_with_ordinal(raw: &str) -> String {
    match parse_flexible(raw) {
        Some(t) => format!(
            "{} {}{} {}",
            t.format("%A"),
            t.day(),
            ordinal_suffix(t.day()),
            t.format("%B")
        ),
        None => raw.to_string(),
    }
}

/// `2025-10-02T14:00` → `Thursday 14:00`; unparseable input is returned as is
#[must_use]
pub fn format_day_and_time(raw: &str) -> String {
    parse_flexible(raw).map_or_else(|| raw.to_string(), |t| t.format("%A %H:%M").to_string())
}

/// Daylight factor from the time of day: 0 at 06:00 and 18:00, 1 at noon
#[must_use]
pub fn hour_brightness(hour: u32, minute: u32) -> f64 {
    let hour = f64::from(hour) + f64::from(minute) / 60.0;
    (PI * (hour - 6.0) / 12.0).sin().clamp(0.0, 1.0)
}

/// Share of daylight that was sunny, in [0, 1]
#[must_use]
pub fn sunshine_brightness(sunshine_seconds: Option<f64>, daylight_seconds: Option<f64>) -> f64 {
    match (sunshine_seconds, daylight_seconds) {
        (Some(sun), Some(day)) if day > 0.0 => (sun / day).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

#[must_use]
pub fn brightness_emoji(brightness: f64) -> &'static str {
    match brightness {
        b if b < 0.15 => "☁️",
        b if b < 0.35 => "🌥️",
        b if b < 0.55 => "🌥",
        b if b < 0.75 => "🌤️",
        _ => "🌞",
    }
}

fn number(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{v:.decimals$}"))
}

fn with_unit(value: Option<f64>, decimals: usize, unit: &str) -> String {
    match value {
        Some(_) if !unit.is_empty() => format!("{} {unit}", number(value, decimals)),
        _ => number(value, decimals),
    }
}

fn at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyItem {
    pub time: String,
    pub temperature: String,
    pub wind: String,
    pub gust: String,
    pub wind_unit: String,
    pub clouds: String,
    pub wind_direction: Option<f64>,
    pub brightness: f64,
    pub emoji: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyItem {
    pub date: String,
    pub temperature_min: String,
    pub temperature_max: String,
    pub wind: String,
    pub gust: String,
    pub wind_unit: String,
    pub rain: String,
    pub brightness: f64,
    pub emoji: &'static str,
}

#[must_use]
pub fn hourly_items(forecast: &HourlyForecast) -> Vec<HourlyItem> {
    let units = &forecast.units;
    forecast
        .time
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let brightness =
                parse_local_time(raw).map_or(1.0, |t| hour_brightness(t.hour(), t.minute()));
            HourlyItem {
                time: format_day_and_time(raw),
                temperature: with_unit(at(&forecast.temperature, i), 1, &units.temperature),
                wind: number(at(&forecast.wind_speed, i), 1),
                gust: number(at(&forecast.wind_gusts, i), 1),
                wind_unit: units.wind_speed.clone(),
                clouds: with_unit(at(&forecast.cloud_cover, i), 0, &units.cloud_cover),
                wind_direction: at(&forecast.wind_direction, i),
                brightness,
                emoji: brightness_emoji(brightness),
            }
        })
        .collect()
}

#[must_use]
pub fn daily_items(forecast: &DailyForecast) -> Vec<DailyItem> {
    let units = &forecast.units;
    forecast
        .time
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let brightness = sunshine_brightness(
                at(&forecast.sunshine_duration, i),
                at(&forecast.daylight_duration, i),
            );
            DailyItem {
                date: format_day_with_ordinal(raw),
                temperature_min: with_unit(at(&forecast.temperature_min, i), 0, &units.temperature),
                temperature_max: with_unit(at(&forecast.temperature_max, i), 0, &units.temperature),
                wind: number(at(&forecast.wind_speed_max, i), 1),
                gust: number(at(&forecast.wind_gusts_max, i), 1),
                wind_unit: units.wind_speed.clone(),
                rain: with_unit(at(&forecast.rain_sum, i), 1, &units.rain),
                brightness,
                emoji: brightness_emoji(brightness),
            }
        })
        .collect()
}

/// Display rows for a fetched forecast
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", content = "items", rename_all = "snake_case")]
pub enum ForecastView {
    Hourly(Vec<HourlyItem>),
    Daily(Vec<DailyItem>),
}

impl From<&ForecastResult> for ForecastView {
    fn from(result: &ForecastResult) -> Self {
        match result {
            ForecastResult::Hourly(hourly) => Self::Hourly(hourly_items(hourly)),
            ForecastResult::Daily(daily) => Self::Daily(daily_items(daily)),
        }
    }
}

fn threshold(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

/// One-line description, e.g. `Wind ≥ 25 km/h • 06:00–18:00 • Dir 180–240°`
#[must_use]
pub fn alert_summary(alert: &Alert, unit: &str) -> String {
    let mut parts = Vec::new();
    if alert.wind_min > 0.0 {
        parts.push(format!("Wind ≥ {} {unit}", threshold(alert.wind_min)));
    }
    if alert.gust_min > 0.0 {
        parts.push(format!("Gusts ≥ {} {unit}", threshold(alert.gust_min)));
    }
    parts.push(format!("{:02}:00–{:02}:00", alert.hours.start, alert.hours.end));
    if let Some(direction) = &alert.direction {
        parts.push(format!(
            "Dir {}–{}°",
            threshold(direction.start),
            threshold(direction.end)
        ));
    }
    if let Some(city) = &alert.city {
        parts.push(city.name.clone());
    }
    parts.join(" • ")
}

/// An alert as listed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertView {
    pub id: String,
    pub title: String,
    pub enabled: bool,
    pub summary: String,
}

impl AlertView {
    #[must_use]
    pub fn new(alert: &Alert, unit: &str) -> Self {
        Self {
            id: alert.id.clone(),
            title: alert.title().to_string(),
            enabled: alert.enabled,
            summary: alert_summary(alert, unit),
        }
    }
}

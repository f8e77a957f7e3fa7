//! Selected city and geocoding suggestion models

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// The city the forecast and alerts follow
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CitySelection {
    /// Display name (e.g. "Zandvoort, North Holland, Netherlands")
    pub name: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// IANA timezone identifier reported by the geocoder
    pub timezone: Option<String>,
}

impl CitySelection {
    #[must_use]
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
            timezone: None,
        }
    }

    #[must_use]
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// A stored record that was never filled in
    #[must_use]
    pub fn is_unset(&self) -> bool {
        self.name.trim().is_empty() || (self.latitude == 0.0 && self.longitude == 0.0)
    }

    /// The city's timezone, or `fallback` when missing or unknown
    #[must_use]
    pub fn zone_or(&self, fallback: Tz) -> Tz {
        self.timezone
            .as_deref()
            .and_then(|tz| tz.parse::<Tz>().ok())
            .unwrap_or(fallback)
    }

    /// Round coordinates to `precision` decimal places
    #[must_use]
    pub fn rounded_coordinates(&self, precision: u32) -> (f64, f64) {
        let multiplier = 10_f64.powi(i32::try_from(precision).unwrap_or(4));
        let lat = (self.latitude * multiplier).round() / multiplier;
        let lon = (self.longitude * multiplier).round() / multiplier;
        (lat, lon)
    }

    /// Key identifying the forecast grid cell of this city
    #[must_use]
    pub fn location_key(&self) -> String {
        let (lat, lon) = self.rounded_coordinates(2);
        format!("{lat:.2}:{lon:.2}")
    }
}

/// A city suggestion returned by the geocoding API
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeocodingResult {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub admin1: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl From<GeocodingResult> for CitySelection {
    fn from(result: GeocodingResult) -> Self {
        let name = [Some(result.name), result.admin1, result.country]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            name,
            latitude: result.latitude,
            longitude: result.longitude,
            timezone: result.timezone,
        }
    }
}

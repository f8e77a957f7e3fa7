//! Data models for the WindRadar application
//!
//! This module contains the core domain models organized by concern:
//! - Alert: user-defined wind alert rules and their windows
//! - Location: selected city and geocoding suggestions
//! - Forecast: hourly and daily forecast series

pub mod alert;
pub mod forecast;
pub mod location;

// Re-export all public types for convenient access
pub use alert::{Alert, AlertDraft, BoundCity, DirectionWindow, HourWindow};
pub use forecast::{
    DailyForecast, DailyUnits, HOURLY_TIME_FORMAT, HourlyForecast, HourlyRecord, HourlyUnits,
    parse_local_time,
};
pub use location::{CitySelection, GeocodingResult};

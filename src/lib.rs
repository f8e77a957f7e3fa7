//! `WindRadar` - wind forecasts with user-defined wind alerts
//!
//! This library provides forecast retrieval, wind alert evaluation with
//! once-per-day notification, the forecast refresh orchestration and the
//! HTTP API the service exposes.

pub mod alerts;
pub mod api;
pub mod app;
pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod models;
pub mod notify;
pub mod orchestrator;
pub mod store;
pub mod suggestions;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use alerts::{AlertCheckJob, AlertEvaluator, AlertResult, CheckReport, StreakPolicy};
pub use app::App;
pub use config::WindRadarConfig;
pub use error::WindRadarError;
pub use models::{Alert, AlertDraft, CitySelection, DailyForecast, GeocodingResult, HourlyForecast};
pub use orchestrator::{ForecastHandle, ForecastOrchestrator, UiState};
pub use store::Store;
pub use weather::{ForecastMode, ForecastResult, OpenMeteoClient};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, WindRadarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}

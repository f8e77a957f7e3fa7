//! Wind alert rules and their hour/direction windows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WindRadarError;

/// Inclusive hour-of-day window. `start > end` wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourWindow {
    pub start: u32,
    pub end: u32,
}

impl HourWindow {
    #[must_use]
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Whether `hour` (0-23) falls inside the window
    #[must_use]
    pub fn contains(&self, hour: u32) -> bool {
        if self.start <= self.end {
            (self.start..=self.end).contains(&hour)
        } else {
            hour >= self.start || hour <= self.end
        }
    }
}

/// Inclusive compass window in degrees. `start > end` wraps through north.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionWindow {
    pub start: f64,
    pub end: f64,
}

impl DirectionWindow {
    #[must_use]
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Whether a wind direction falls inside the window.
    /// The direction is normalized to [0, 360) first; the bounds are not.
    #[must_use]
    pub fn contains(&self, degrees: f64) -> bool {
        let degrees = degrees.rem_euclid(360.0);
        if self.start <= self.end {
            degrees >= self.start && degrees <= self.end
        } else {
            degrees >= self.start || degrees <= self.end
        }
    }
}

/// City an alert is pinned to instead of following the selected city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundCity {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone the alert hours are read in
    #[serde(default)]
    pub timezone: Option<String>,
}

/// A persisted wind alert rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub name: Option<String>,
    /// Minimum sustained wind; `<= 0` disables the wind criterion
    pub wind_min: f64,
    /// Minimum gust; `<= 0` disables the gust criterion
    pub gust_min: f64,
    pub hours: HourWindow,
    pub direction: Option<DirectionWindow>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub city: Option<BoundCity>,
}

impl Alert {
    /// Whether a wind reading meets the wind threshold
    #[must_use]
    pub fn wind_matches(&self, wind: f64) -> bool {
        self.wind_min > 0.0 && wind >= self.wind_min
    }

    /// Whether a gust reading meets the gust threshold
    #[must_use]
    pub fn gust_matches(&self, gust: f64) -> bool {
        self.gust_min > 0.0 && gust >= self.gust_min
    }

    /// Display title, falling back to a generic label
    #[must_use]
    pub fn title(&self) -> &str {
        self.name.as_deref().unwrap_or("Alert")
    }
}

/// User input for a new alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDraft {
    #[serde(default)]
    pub name: String,
    pub wind_min: f64,
    pub gust_min: f64,
    #[serde(default)]
    pub dir_start: Option<f64>,
    #[serde(default)]
    pub dir_end: Option<f64>,
    pub start_hour: u32,
    pub end_hour: u32,
    #[serde(default)]
    pub city: Option<BoundCity>,
}

impl AlertDraft {
    /// Validate the draft and turn it into an enabled alert with a fresh id
    pub fn into_alert(self, now: DateTime<Utc>) -> Result<Alert, WindRadarError> {
        self.validate()?;

        let direction = match (self.dir_start, self.dir_end) {
            (Some(start), Some(end)) => Some(DirectionWindow::new(start, end)),
            _ => None,
        };
        let name = self.name.trim();

        Ok(Alert {
            id: Uuid::new_v4().to_string(),
            name: (!name.is_empty()).then(|| name.to_string()),
            wind_min: self.wind_min,
            gust_min: self.gust_min,
            hours: HourWindow::new(self.start_hour, self.end_hour),
            direction,
            enabled: true,
            created_at: now,
            city: self.city,
        })
    }

    fn validate(&self) -> Result<(), WindRadarError> {
        if !self.wind_min.is_finite() || !self.gust_min.is_finite() {
            return Err(WindRadarError::validation("thresholds must be numbers"));
        }
        if self.wind_min < 0.0 || self.gust_min < 0.0 {
            return Err(WindRadarError::validation("thresholds cannot be negative"));
        }
        if self.wind_min == 0.0 && self.gust_min == 0.0 {
            return Err(WindRadarError::validation(
                "at least one of wind or gust threshold must be set",
            ));
        }
        if self.start_hour > 23 || self.end_hour > 23 {
            return Err(WindRadarError::validation("hours must be between 0 and 23"));
        }
        match (self.dir_start, self.dir_end) {
            (None, None) => {}
            (Some(start), Some(end)) => {
                let in_range = |d: f64| (0.0..=360.0).contains(&d);
                if !in_range(start) || !in_range(end) {
                    return Err(WindRadarError::validation(
                        "directions must be between 0 and 360 degrees",
                    ));
                }
            }
            _ => {
                return Err(WindRadarError::validation(
                    "direction window needs both a start and an end",
                ));
            }
        }
        if let Some(city) = &self.city {
            if !(-90.0..=90.0).contains(&city.latitude)
                || !(-180.0..=180.0).contains(&city.longitude)
            {
                return Err(WindRadarError::validation("bound city has invalid coordinates"));
            }
        }
        Ok(())
    }
}

//! The background alert check
//!
//! A run loads the selected city and the enabled alerts, fetches the hourly
//! forecast once per location, evaluates every alert against it and sends a
//! notification for each alert that fires. Alerts pinned to their own city
//! are fetched separately, in the default timezone.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono_tz::Tz;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::AlertEvaluator;
use crate::clock::Clock;
use crate::error::WindRadarError;
use crate::models::{Alert, CitySelection};
use crate::notify::{Notification, Notifier};
use crate::store::{AlertRepository, CitySelectionRepository};
use crate::weather::ForecastProvider;

/// Summary of one check run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub alerts_checked: usize,
    pub notifications_sent: usize,
    pub failed_locations: usize,
    pub pruned_days: usize,
}

pub struct AlertCheckJob {
    alerts: Arc<AlertRepository>,
    cities: Arc<CitySelectionRepository>,
    provider: Arc<dyn ForecastProvider>,
    evaluator: AlertEvaluator,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    default_zone: Tz,
    running: Mutex<()>,
}

impl AlertCheckJob {
    #[must_use]
    pub fn new(
        alerts: Arc<AlertRepository>,
        cities: Arc<CitySelectionRepository>,
        provider: Arc<dyn ForecastProvider>,
        evaluator: AlertEvaluator,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        default_zone: Tz,
    ) -> Self {
        Self {
            alerts,
            cities,
            provider,
            evaluator,
            notifier,
            clock,
            default_zone,
            running: Mutex::new(()),
        }
    }

    /// Run a check immediately; concurrent calls run one after the other
    #[instrument(name = "alert_check", skip(self))]
    pub async fn run_now(&self) -> Result<CheckReport, WindRadarError> {
        let _guard = self.running.lock().await;
        let mut report = CheckReport::default();

        let Some(city) = self.cities.current() else {
            debug!("No city selected, nothing to check");
            return Ok(report);
        };

        for (location, alerts) in self.group_by_location(&city).await {
            report.alerts_checked += alerts.len();
            match self.check_location(&location, &alerts).await {
                Ok(sent) => report.notifications_sent += sent,
                Err(e) => {
                    warn!(location = %location.name, "Skipping alerts: {e}");
                    report.failed_locations += 1;
                }
            }
        }

        let today = self.clock.local_now(city.zone_or(self.default_zone)).date();
        let yesterday = today.pred_opt().unwrap_or(today);
        report.pruned_days = self.evaluator.ledger().prune_before(yesterday).await?;

        info!(
            checked = report.alerts_checked,
            sent = report.notifications_sent,
            "Alert check finished"
        );
        Ok(report)
    }

    /// Enabled alerts keyed by the location they watch
    async fn group_by_location(&self, selected: &CitySelection) -> Vec<(CitySelection, Vec<Alert>)> {
        let mut groups: BTreeMap<String, (CitySelection, Vec<Alert>)> = BTreeMap::new();

        for alert in self.alerts.list_enabled().await {
            let location = match &alert.city {
                Some(bound) => CitySelection {
                    name: bound.name.clone(),
                    latitude: bound.latitude,
                    longitude: bound.longitude,
                    timezone: bound.timezone.clone(),
                },
                None => selected.clone(),
            };
            groups
                .entry(location.location_key())
                .or_insert_with(|| (location, Vec::new()))
                .1
                .push(alert);
        }
        groups.into_values().collect()
    }

    /// Evaluate `alerts` for one location; returns the number of notifications sent
    async fn check_location(
        &self,
        location: &CitySelection,
        alerts: &[Alert],
    ) -> Result<usize, WindRadarError> {
        let zone = location.zone_or(self.default_zone);
        let forecast = self
            .provider
            .hourly(location.latitude, location.longitude, zone.name())
            .await?;
        let now = self.clock.local_now(zone);
        let mut sent = 0;

        for alert in alerts {
            let result = match self.evaluator.evaluate(alert, &forecast, now).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(alert_id = %alert.id, "Evaluation failed: {e}");
                    continue;
                }
            };
            debug!(alert_id = %alert.id, should_alert = result.should_alert, "Alert check done");

            let Some(notification) =
                Notification::wind_alert(&alert.id, &result, &forecast.units.wind_speed)
            else {
                continue;
            };
            if let Err(e) = self.notifier.notify(&notification).await {
                warn!(alert_id = %alert.id, "Notification failed, retrying next run: {e:#}");
                continue;
            }
            sent += 1;
            if let Err(e) = self.evaluator.mark_alerted(alert, &result).await {
                warn!(alert_id = %alert.id, "Failed to record notified day: {e}");
            }
        }
        Ok(sent)
    }
}

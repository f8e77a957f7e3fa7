//! Service wiring shared by the binary and the HTTP API

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::alerts::{AlertCheckJob, AlertEvaluator};
use crate::clock::Clock;
use crate::config::WindRadarConfig;
use crate::error::WindRadarError;
use crate::models::{Alert, AlertDraft, CitySelection, GeocodingResult};
use crate::notify::Notifier;
use crate::orchestrator::{ForecastHandle, ForecastOrchestrator};
use crate::store::{AlertRepository, AlertedDaysLedger, CitySelectionRepository, Store};
use crate::suggestions::{CitySuggestions, DEFAULT_DEBOUNCE};
use crate::weather::{CitySuggestionProvider, ForecastProvider};

pub struct App {
    pub alerts: Arc<AlertRepository>,
    pub cities: Arc<CitySelectionRepository>,
    pub ledger: Arc<AlertedDaysLedger>,
    pub forecast: ForecastHandle,
    pub suggestions: CitySuggestions,
    pub check: Arc<AlertCheckJob>,
    pub clock: Arc<dyn Clock>,
    /// Label used when rendering wind thresholds
    pub wind_unit: String,
}

impl App {
    /// Open the repositories on `store` and start the background tasks
    pub async fn assemble(
        config: &WindRadarConfig,
        store: Store,
        forecasts: Arc<dyn ForecastProvider>,
        geocoder: Arc<dyn CitySuggestionProvider>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let default_zone = config.default_timezone()?;
        let alerts = Arc::new(
            AlertRepository::open(store.clone())
                .await
                .context("Failed to load alerts")?,
        );
        let cities = Arc::new(
            CitySelectionRepository::open(store.clone())
                .await
                .context("Failed to load the selected city")?,
        );
        let ledger = Arc::new(
            AlertedDaysLedger::open(store)
                .await
                .context("Failed to load the alert ledger")?,
        );

        let evaluator = AlertEvaluator::new(
            ledger.clone(),
            config.alerts.max_day_forward,
            config.alerts.streak_policy,
        );
        let check = Arc::new(AlertCheckJob::new(
            alerts.clone(),
            cities.clone(),
            forecasts.clone(),
            evaluator,
            notifier,
            clock.clone(),
            default_zone,
        ));
        let forecast =
            ForecastOrchestrator::new(forecasts, clock.clone(), default_zone).spawn(cities.observe());
        let suggestions =
            CitySuggestions::spawn(geocoder, config.weather.suggestion_count, DEFAULT_DEBOUNCE);

        Ok(Self {
            alerts,
            cities,
            ledger,
            forecast,
            suggestions,
            check,
            clock,
            wind_unit: config.weather.wind_unit_label().to_string(),
        })
    }

    /// Save a new alert and check it right away in the background
    pub async fn create_alert(&self, draft: AlertDraft) -> Result<Alert, WindRadarError> {
        let alert = draft.into_alert(self.clock.now())?;
        self.alerts.upsert(alert.clone()).await?;

        let check = self.check.clone();
        tokio::spawn(async move {
            if let Err(e) = check.run_now().await {
                warn!("Alert check after creation failed: {e}");
            }
        });
        Ok(alert)
    }

    /// Delete an alert together with its notification history
    pub async fn delete_alert(&self, id: &str) -> Result<(), WindRadarError> {
        if !self.alerts.delete(id).await? {
            return Err(WindRadarError::not_found(format!("alert {id}")));
        }
        self.ledger.forget_alert(id).await
    }

    /// Make a picked suggestion the current city
    pub async fn select_city(&self, picked: GeocodingResult) -> Result<CitySelection, WindRadarError> {
        if !(-90.0..=90.0).contains(&picked.latitude) || !(-180.0..=180.0).contains(&picked.longitude) {
            return Err(WindRadarError::validation("city has invalid coordinates"));
        }
        let city = CitySelection::from(picked);
        self.cities.save(city.clone()).await?;
        info!(city = %city.name, "City picked");
        Ok(city)
    }
}

//! Dates on which each alert already fired
//!
//! One notification per alert per calendar day. The whole ledger is a
//! single record; it stays small because dates before the look-ahead
//! horizon are pruned on every check run.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::debug;

use super::{Store, read_record, remove_record, write_record};
use crate::error::WindRadarError;

const LEDGER_KEY: &str = "alerted_days";

type Ledger = BTreeMap<String, BTreeSet<NaiveDate>>;

pub struct AlertedDaysLedger {
    store: Store,
    days: Mutex<Ledger>,
}

impl AlertedDaysLedger {
    pub async fn open(store: Store) -> anyhow::Result<Self> {
        let days: Ledger = read_record(store.ledger(), LEDGER_KEY)
            .await?
            .unwrap_or_default();
        Ok(Self {
            store,
            days: Mutex::new(days),
        })
    }

    /// Dates the alert has already been notified for
    pub async fn alerted_days(&self, alert_id: &str) -> BTreeSet<NaiveDate> {
        self.days
            .lock()
            .await
            .get(alert_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Mark `date` as notified; returns false when it already was
    pub async fn record(&self, alert_id: &str, date: NaiveDate) -> Result<bool, WindRadarError> {
        let mut days = self.days.lock().await;
        if !days.entry(alert_id.to_string()).or_default().insert(date) {
            return Ok(false);
        }
        debug!(alert_id, %date, "Recorded alerted day");
        self.persist(&days).await?;
        Ok(true)
    }

    /// Drop every date recorded for the alert
    pub async fn forget_alert(&self, alert_id: &str) -> Result<(), WindRadarError> {
        let mut days = self.days.lock().await;
        if days.remove(alert_id).is_some() {
            self.persist(&days).await?;
        }
        Ok(())
    }

    /// Drop dates earlier than `cutoff`; returns how many were removed
    pub async fn prune_before(&self, cutoff: NaiveDate) -> Result<usize, WindRadarError> {
        let mut days = self.days.lock().await;
        let before: usize = days.values().map(BTreeSet::len).sum();
        for dates in days.values_mut() {
            dates.retain(|d| *d >= cutoff);
        }
        days.retain(|_, dates| !dates.is_empty());
        let removed = before - days.values().map(BTreeSet::len).sum::<usize>();

        if removed > 0 {
            debug!(removed, %cutoff, "Pruned alerted days");
            self.persist(&days).await?;
        }
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<(), WindRadarError> {
        let mut days = self.days.lock().await;
        days.clear();
        remove_record(self.store.ledger(), LEDGER_KEY)
            .await
            .map_err(|e| WindRadarError::storage(format!("failed to clear ledger: {e}")))
    }

    async fn persist(&self, days: &Ledger) -> Result<(), WindRadarError> {
        write_record(self.store.ledger(), LEDGER_KEY, days)
            .await
            .map_err(|e| WindRadarError::storage(format!("failed to write ledger: {e}")))
    }
}

//! The alerts table: rules keyed by id, listed newest first

use std::collections::BTreeMap;

use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{Store, read_record, write_record};
use crate::error::WindRadarError;
use crate::models::Alert;

const TABLE_KEY: &str = "table";

type AlertTable = BTreeMap<String, Alert>;

fn newest_first(table: &AlertTable) -> Vec<Alert> {
    let mut alerts: Vec<Alert> = table.values().cloned().collect();
    alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    alerts
}

/// Persistent alert rules
pub struct AlertRepository {
    store: Store,
    table: Mutex<AlertTable>,
}

impl AlertRepository {
    /// Load the alerts table from `store`
    pub async fn open(store: Store) -> anyhow::Result<Self> {
        let table: AlertTable = read_record(store.alerts(), TABLE_KEY)
            .await?
            .unwrap_or_default();
        debug!("Loaded {} alerts", table.len());

        Ok(Self {
            store,
            table: Mutex::new(table),
        })
    }

    /// All alerts, newest first
    pub async fn list(&self) -> Vec<Alert> {
        newest_first(&*self.table.lock().await)
    }

    /// Enabled alerts, newest first
    pub async fn list_enabled(&self) -> Vec<Alert> {
        self.list().await.into_iter().filter(|a| a.enabled).collect()
    }

    /// Insert or replace an alert by id
    pub async fn upsert(&self, alert: Alert) -> Result<(), WindRadarError> {
        let mut table = self.table.lock().await;
        info!(alert_id = %alert.id, "Saving alert");
        table.insert(alert.id.clone(), alert);
        self.persist(&table).await
    }

    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Result<Alert, WindRadarError> {
        let mut table = self.table.lock().await;
        let alert = table
            .get_mut(id)
            .ok_or_else(|| WindRadarError::not_found(format!("alert {id}")))?;
        alert.enabled = enabled;
        let updated = alert.clone();
        info!(alert_id = %id, enabled, "Toggled alert");
        self.persist(&table).await?;
        Ok(updated)
    }

    /// Delete an alert; returns whether it existed
    pub async fn delete(&self, id: &str) -> Result<bool, WindRadarError> {
        let mut table = self.table.lock().await;
        if table.remove(id).is_none() {
            return Ok(false);
        }
        info!(alert_id = %id, "Deleted alert");
        self.persist(&table).await?;
        Ok(true)
    }

    async fn persist(&self, table: &AlertTable) -> Result<(), WindRadarError> {
        write_record(self.store.alerts(), TABLE_KEY, table)
            .await
            .map_err(|e| WindRadarError::storage(format!("failed to write alerts: {e}")))
    }
}

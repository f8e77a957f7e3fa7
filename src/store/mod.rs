//! Embedded persistence for alerts, the selected city and the alerted-days ledger
//!
//! Every record is a postcard blob stored under a fixed key in a fjall
//! keyspace. Repositories keep an in-memory copy guarded by an async mutex
//! and write through on every change, so read-modify-write cycles are
//! serialized per repository.

use anyhow::Result;
use fjall::Keyspace;
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;
use std::sync::Arc;
use tokio::task;

pub mod alerts;
pub mod city;
pub mod ledger;

pub use alerts::AlertRepository;
pub use city::CitySelectionRepository;
pub use ledger::AlertedDaysLedger;

const ALERTS_KEYSPACE: &str = "alerts";
const SETTINGS_KEYSPACE: &str = "settings";
const LEDGER_KEYSPACE: &str = "ledger";

struct StoreInner {
    // keeps the database open for as long as any keyspace handle lives
    _db: fjall::Database,
    alerts: Keyspace,
    settings: Keyspace,
    ledger: Keyspace,
}

/// Handle to the on-disk database; cheap to clone
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Open (or create) the database under `path`
    #[tracing::instrument(name = "open_store", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path).open()?;
        let alerts = db.keyspace(ALERTS_KEYSPACE, fjall::KeyspaceCreateOptions::default)?;
        let settings = db.keyspace(SETTINGS_KEYSPACE, fjall::KeyspaceCreateOptions::default)?;
        let ledger = db.keyspace(LEDGER_KEYSPACE, fjall::KeyspaceCreateOptions::default)?;
        tracing::debug!("Store opened");

        Ok(Self {
            inner: Arc::new(StoreInner {
                _db: db,
                alerts,
                settings,
                ledger,
            }),
        })
    }

    pub(crate) fn alerts(&self) -> &Keyspace {
        &self.inner.alerts
    }

    pub(crate) fn settings(&self) -> &Keyspace {
        &self.inner.settings
    }

    pub(crate) fn ledger(&self) -> &Keyspace {
        &self.inner.ledger
    }
}

fn get_from_keyspace(keyspace: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    Ok(keyspace.get(key)?.map(|v| v.to_vec()))
}

/// Read and decode the record stored under `key`
#[tracing::instrument(name = "read_record", level = "debug", skip(keyspace))]
pub(crate) async fn read_record<T: DeserializeOwned + Send + 'static>(
    keyspace: &Keyspace,
    key: &str,
) -> Result<Option<T>> {
    let keyspace = keyspace.clone();
    let key_bytes = key.as_bytes().to_vec();

    let maybe_bytes = task::spawn_blocking(move || get_from_keyspace(keyspace, key_bytes)).await??;

    match maybe_bytes {
        Some(bytes) => Ok(Some(postcard::from_bytes(&bytes)?)),
        None => {
            tracing::debug!("Key not found");
            Ok(None)
        }
    }
}

/// Encode and store `value` under `key`
#[tracing::instrument(name = "write_record", level = "debug", skip(keyspace, value))]
pub(crate) async fn write_record<T: Serialize>(
    keyspace: &Keyspace,
    key: &str,
    value: &T,
) -> Result<()> {
    let keyspace = keyspace.clone();
    let key = key.as_bytes().to_vec();
    let bytes = postcard::to_stdvec(value)?;

    task::spawn_blocking(move || keyspace.insert(key, bytes)).await??;
    Ok(())
}

/// Remove the record stored under `key`
pub(crate) async fn remove_record(keyspace: &Keyspace, key: &str) -> Result<()> {
    let keyspace = keyspace.clone();
    let key = key.as_bytes().to_vec();
    task::spawn_blocking(move || keyspace.remove(key)).await??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        values: Vec<Option<f64>>,
    }

    #[tokio::test]
    async fn test_record_round_trip_and_removal() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let sample = Sample {
            name: "gusts".to_string(),
            values: vec![Some(1.5), None],
        };

        write_record(store.settings(), "sample", &sample).await.unwrap();
        let loaded: Option<Sample> = read_record(store.settings(), "sample").await.unwrap();
        assert_eq!(loaded, Some(sample));

        remove_record(store.settings(), "sample").await.unwrap();
        let loaded: Option<Sample> = read_record(store.settings(), "sample").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_keyspaces_are_separate() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();

        write_record(store.alerts(), "shared", &1_u32).await.unwrap();
        let other: Option<u32> = read_record(store.ledger(), "shared").await.unwrap();
        assert!(other.is_none());
    }
}

use tokio::sync::watch;
use tracing::info;

use super::{Store, read_record, write_record};
use crate::error::WindRadarError;
use crate::models::CitySelection;

const SELECTED_CITY_KEY: &str = "selected_city";

fn usable(city: Option<CitySelection>) -> Option<CitySelection> {
    city.filter(|c| !c.is_unset())
}

/// The single persisted city selection
pub struct CitySelectionRepository {
    store: Store,
    current: watch::Sender<Option<CitySelection>>,
}

impl CitySelectionRepository {
    pub async fn open(store: Store) -> anyhow::Result<Self> {
        let stored: Option<CitySelection> = read_record(store.settings(), SELECTED_CITY_KEY).await?;
        let (current, _) = watch::channel(usable(stored));
        Ok(Self { store, current })
    }

    /// The selected city, `None` when nothing usable was saved
    #[must_use]
    pub fn current(&self) -> Option<CitySelection> {
        self.current.borrow().clone()
    }

    /// Stream of the selected city; the current value is seen immediately
    #[must_use]
    pub fn observe(&self) -> watch::Receiver<Option<CitySelection>> {
        self.current.subscribe()
    }

    /// Replace the selected city
    pub async fn save(&self, city: CitySelection) -> Result<(), WindRadarError> {
        write_record(self.store.settings(), SELECTED_CITY_KEY, &city)
            .await
            .map_err(|e| WindRadarError::storage(format!("failed to save city: {e}")))?;
        info!(city = %city.name, "Selected city");
        self.current.send_replace(usable(Some(city)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_empty_store_has_no_city() {
        let dir = TempDir::new().unwrap();
        let repo = CitySelectionRepository::open(Store::open(dir.path()).unwrap())
            .await
            .unwrap();
        assert!(repo.current().is_none());
    }

    #[tokio::test]
    async fn test_saved_city_is_observed_and_persisted() {
        let dir = TempDir::new().unwrap();
        let city = CitySelection::new("Zandvoort", 52.37, 4.53).with_timezone("Europe/Amsterdam");
        {
            let repo = CitySelectionRepository::open(Store::open(dir.path()).unwrap())
                .await
                .unwrap();
            let mut observer = repo.observe();
            repo.save(city.clone()).await.unwrap();
            assert!(observer.has_changed().unwrap());
            assert_eq!(observer.borrow_and_update().as_ref(), Some(&city));
        }

        let repo = CitySelectionRepository::open(Store::open(dir.path()).unwrap())
            .await
            .unwrap();
        assert_eq!(repo.current(), Some(city));
    }

    #[tokio::test]
    async fn test_blank_city_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let repo = CitySelectionRepository::open(Store::open(dir.path()).unwrap())
            .await
            .unwrap();
        repo.save(CitySelection::new("", 0.0, 0.0)).await.unwrap();
        assert!(repo.current().is_none());
    }
}

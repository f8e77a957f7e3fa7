//! Forecast refresh orchestration
//!
//! One task owns the displayed forecast. It listens to the selected city,
//! the forecast mode and manual refresh requests; any of them cancels the
//! fetch in flight by dropping it and starts a new one, so a result for a
//! superseded input is never published.

use std::sync::Arc;

use chrono_tz::Tz;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::models::CitySelection;
use crate::weather::{ForecastMode, ForecastProvider, ForecastResult};

pub const NO_CITY_MESSAGE: &str = "No city selected";

/// Display state of an asynchronously loaded value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum UiState<T> {
    Loading,
    Ready(T),
    Error(String),
}

impl<T> UiState<T> {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

enum Trigger {
    Reload,
    Stop,
}

struct Inputs {
    cities: watch::Receiver<Option<CitySelection>>,
    modes: watch::Receiver<ForecastMode>,
    refreshes: mpsc::Receiver<()>,
    city: Option<CitySelection>,
    mode: ForecastMode,
}

impl Inputs {
    /// Wait for the next input that warrants a new fetch
    async fn next_trigger(&mut self) -> Trigger {
        loop {
            tokio::select! {
                changed = self.cities.changed() => {
                    if changed.is_err() {
                        return Trigger::Stop;
                    }
                    let city = self.cities.borrow_and_update().clone();
                    if city != self.city {
                        self.city = city;
                        return Trigger::Reload;
                    }
                }
                changed = self.modes.changed() => {
                    if changed.is_err() {
                        return Trigger::Stop;
                    }
                    let mode = *self.modes.borrow_and_update();
                    if mode != self.mode {
                        self.mode = mode;
                        return Trigger::Reload;
                    }
                }
                request = self.refreshes.recv() => {
                    return match request {
                        Some(()) => Trigger::Reload,
                        None => Trigger::Stop,
                    };
                }
            }
        }
    }
}

/// Builds the forecast display state for the selected city
pub struct ForecastOrchestrator {
    provider: Arc<dyn ForecastProvider>,
    clock: Arc<dyn Clock>,
    default_zone: Tz,
}

impl ForecastOrchestrator {
    #[must_use]
    pub fn new(provider: Arc<dyn ForecastProvider>, clock: Arc<dyn Clock>, default_zone: Tz) -> Self {
        Self {
            provider,
            clock,
            default_zone,
        }
    }

    /// Start following `cities`; the task lives as long as the returned handle
    #[must_use]
    pub fn spawn(self, mut cities: watch::Receiver<Option<CitySelection>>) -> ForecastHandle {
        let (mode_tx, mut modes) = watch::channel(ForecastMode::default());
        let (refresh_tx, refreshes) = mpsc::channel(1);
        let (state_tx, state_rx) = watch::channel(UiState::Loading);

        let city = cities.borrow_and_update().clone();
        let mode = *modes.borrow_and_update();
        let inputs = Inputs {
            city,
            mode,
            cities,
            modes,
            refreshes,
        };
        let task = tokio::spawn(self.run(inputs, state_tx));

        ForecastHandle {
            mode: mode_tx,
            refresh: refresh_tx,
            state: state_rx,
            task,
        }
    }

    async fn run(self, mut inputs: Inputs, state: watch::Sender<UiState<ForecastResult>>) {
        loop {
            let trigger = match inputs.city.clone() {
                None => {
                    state.send_replace(UiState::Error(NO_CITY_MESSAGE.to_string()));
                    inputs.next_trigger().await
                }
                Some(city) => {
                    state.send_replace(UiState::Loading);
                    let fetch = self.load(city, inputs.mode);
                    tokio::pin!(fetch);

                    tokio::select! {
                        outcome = &mut fetch => {
                            state.send_replace(outcome);
                            inputs.next_trigger().await
                        }
                        trigger = inputs.next_trigger() => {
                            debug!("Fetch superseded");
                            trigger
                        }
                    }
                }
            };

            if let Trigger::Stop = trigger {
                debug!("Forecast inputs closed");
                break;
            }
        }
    }

    async fn load(&self, city: CitySelection, mode: ForecastMode) -> UiState<ForecastResult> {
        let zone = city.zone_or(self.default_zone);
        debug!(city = %city.name, ?mode, %zone, "Fetching forecast");
        match self.provider.fetch(&city, zone, mode).await {
            Ok(ForecastResult::Hourly(hourly)) => {
                let hour_start = self.clock.local_hour_start(zone);
                UiState::Ready(ForecastResult::Hourly(hourly.upcoming(hour_start)))
            }
            Ok(daily) => UiState::Ready(daily),
            Err(e) => {
                warn!(city = %city.name, "Forecast fetch failed: {e}");
                UiState::Error(e.to_string())
            }
        }
    }
}

/// Control surface of a running orchestrator; dropping it stops the task
pub struct ForecastHandle {
    mode: watch::Sender<ForecastMode>,
    refresh: mpsc::Sender<()>,
    state: watch::Receiver<UiState<ForecastResult>>,
    task: JoinHandle<()>,
}

impl ForecastHandle {
    pub fn set_mode(&self, mode: ForecastMode) {
        self.mode.send_replace(mode);
    }

    #[must_use]
    pub fn mode(&self) -> ForecastMode {
        *self.mode.borrow()
    }

    /// Request a new fetch; coalesces with a request that is still pending
    pub fn refresh(&self) {
        if let Err(mpsc::error::TrySendError::Closed(())) = self.refresh.try_send(()) {
            warn!("Refresh requested after the orchestrator stopped");
        }
    }

    #[must_use]
    pub fn state(&self) -> UiState<ForecastResult> {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<UiState<ForecastResult>> {
        self.state.clone()
    }
}

impl Drop for ForecastHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::WindRadarError;
    use crate::models::{DailyForecast, HourlyForecast};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    /// Daily fetches block until a permit is released; hourly ones return at once
    struct GatedProvider {
        daily_gate: Semaphore,
        calls: AtomicUsize,
        daily_completed: AtomicUsize,
        zones: StdMutex<Vec<String>>,
        fail: bool,
    }

    impl GatedProvider {
        fn new(daily_permits: usize) -> Self {
            Self {
                daily_gate: Semaphore::new(daily_permits),
                calls: AtomicUsize::new(0),
                daily_completed: AtomicUsize::new(0),
                zones: StdMutex::new(Vec::new()),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl ForecastProvider for GatedProvider {
        async fn hourly(&self, _: f64, _: f64, zone: &str) -> Result<HourlyForecast, WindRadarError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.zones.lock().unwrap().push(zone.to_string());
            if self.fail {
                return Err(WindRadarError::api("offline"));
            }
            Ok(HourlyForecast {
                time: (10..16).map(|h| format!("2025-10-02T{h:02}:00")).collect(),
                wind_speed: (10..16).map(|h| Some(f64::from(h))).collect(),
                ..HourlyForecast::default()
            })
        }

        async fn daily(&self, _: f64, _: f64, _: &str) -> Result<DailyForecast, WindRadarError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _permit = self.daily_gate.acquire().await;
            self.daily_completed.fetch_add(1, Ordering::SeqCst);
            Ok(DailyForecast {
                time: vec!["2025-10-02".to_string()],
                ..DailyForecast::default()
            })
        }
    }

    fn start(
        provider: Arc<GatedProvider>,
        city: Option<CitySelection>,
    ) -> (ForecastHandle, watch::Sender<Option<CitySelection>>) {
        start_in(provider, city, chrono_tz::UTC)
    }

    fn start_in(
        provider: Arc<GatedProvider>,
        city: Option<CitySelection>,
        default_zone: Tz,
    ) -> (ForecastHandle, watch::Sender<Option<CitySelection>>) {
        let (city_tx, city_rx) = watch::channel(city);
        let clock = FixedClock(Utc.with_ymd_and_hms(2025, 10, 2, 12, 30, 0).unwrap());
        let handle = ForecastOrchestrator::new(provider, Arc::new(clock), default_zone).spawn(city_rx);
        (handle, city_tx)
    }

    fn zandvoort() -> CitySelection {
        CitySelection::new("Zandvoort", 52.37, 4.53)
    }

    async fn settled(handle: &ForecastHandle) -> UiState<ForecastResult> {
        let mut rx = handle.subscribe();
        let state = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| !s.is_loading()))
            .await
            .expect("orchestrator did not settle")
            .unwrap()
            .clone();
        state
    }

    #[tokio::test]
    async fn test_no_city_reports_error_without_fetching() {
        let provider = Arc::new(GatedProvider::new(1));
        let (handle, _city) = start(provider.clone(), None);

        assert_eq!(settled(&handle).await, UiState::Error(NO_CITY_MESSAGE.to_string()));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_initial_mode_is_daily() {
        let provider = Arc::new(GatedProvider::new(1));
        let (handle, _city) = start(provider, Some(zandvoort()));

        assert_eq!(handle.mode(), ForecastMode::Daily);
        match settled(&handle).await {
            UiState::Ready(ForecastResult::Daily(daily)) => assert_eq!(daily.len(), 1),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mode_switch_drops_in_flight_fetch() {
        let provider = Arc::new(GatedProvider::new(0));
        let (handle, _city) = start(provider.clone(), Some(zandvoort()));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(handle.state().is_loading());

        handle.set_mode(ForecastMode::Hourly);
        let state = settled(&handle).await;
        let UiState::Ready(ForecastResult::Hourly(hourly)) = state else {
            panic!("expected hourly data, got {state:?}");
        };
        // 10:00 and 11:00 are before the current hour
        assert_eq!(hourly.time.first().map(String::as_str), Some("2025-10-02T12:00"));
        assert_eq!(hourly.len(), 4);

        provider.daily_gate.add_permits(1);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(provider.daily_completed.load(Ordering::SeqCst), 0);
        assert!(matches!(handle.state(), UiState::Ready(ForecastResult::Hourly(_))));
    }

    #[tokio::test]
    async fn test_city_without_timezone_fetches_and_filters_in_default_zone() {
        let provider = Arc::new(GatedProvider::new(1));
        let (handle, _city) = start_in(provider.clone(), Some(zandvoort()), chrono_tz::Europe::Amsterdam);
        handle.set_mode(ForecastMode::Hourly);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let state = settled(&handle).await;
        let UiState::Ready(ForecastResult::Hourly(hourly)) = state else {
            panic!("expected hourly data, got {state:?}");
        };
        // 12:30 UTC is 14:30 in Amsterdam
        assert_eq!(hourly.time.first().map(String::as_str), Some("2025-10-02T14:00"));
        assert_eq!(provider.zones.lock().unwrap().as_slice(), ["Europe/Amsterdam"]);
    }

    #[tokio::test]
    async fn test_city_timezone_wins_over_default_zone() {
        let provider = Arc::new(GatedProvider::new(1));
        let city = zandvoort().with_timezone("Europe/London");
        let (handle, _city) = start_in(provider.clone(), Some(city), chrono_tz::UTC);
        handle.set_mode(ForecastMode::Hourly);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let state = settled(&handle).await;
        let UiState::Ready(ForecastResult::Hourly(hourly)) = state else {
            panic!("expected hourly data, got {state:?}");
        };
        assert_eq!(hourly.time.first().map(String::as_str), Some("2025-10-02T13:00"));
        assert_eq!(provider.zones.lock().unwrap().as_slice(), ["Europe/London"]);
    }

    #[tokio::test]
    async fn test_refresh_and_distinct_city_changes() {
        let provider = Arc::new(GatedProvider::new(10));
        let (handle, city_tx) = start(provider.clone(), Some(zandvoort()));
        settled(&handle).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        city_tx.send_replace(Some(zandvoort()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        handle.refresh();
        tokio::time::sleep(Duration::from_millis(20)).await;
        settled(&handle).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

        city_tx.send_replace(Some(CitySelection::new("Tarifa", 36.01, -5.6)));
        tokio::time::sleep(Duration::from_millis(20)).await;
        settled(&handle).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fetch_failure_surfaces_as_error() {
        let provider = Arc::new(GatedProvider {
            fail: true,
            ..GatedProvider::new(1)
        });
        let (handle, _city) = start(provider, Some(zandvoort()));
        handle.set_mode(ForecastMode::Hourly);

        tokio::time::sleep(Duration::from_millis(20)).await;
        match settled(&handle).await {
            UiState::Error(message) => assert!(message.contains("offline")),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_task() {
        let provider = Arc::new(GatedProvider::new(0));
        let (handle, city_tx) = start(provider.clone(), Some(zandvoort()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(handle);
        tokio::time::sleep(Duration::from_millis(20)).await;

        city_tx.send_replace(Some(CitySelection::new("Tarifa", 36.01, -5.6)));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}

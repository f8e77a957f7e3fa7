//! City name autocomplete
//!
//! Typed queries are debounced, blank and repeated queries are dropped and
//! a newer query cancels the lookup of an older one.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::models::GeocodingResult;
use crate::weather::CitySuggestionProvider;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Suggestions together with the query they answer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Suggestions {
    pub query: String,
    pub results: Vec<GeocodingResult>,
}

/// Wait until `queries` has been quiet for `delay`; false when the sender is gone
async fn settle(queries: &mut watch::Receiver<String>, delay: Duration) -> bool {
    loop {
        tokio::select! {
            changed = queries.changed() => {
                if changed.is_err() {
                    return false;
                }
            }
            () = tokio::time::sleep(delay) => return true,
        }
    }
}

async fn run(
    provider: Arc<dyn CitySuggestionProvider>,
    count: u32,
    delay: Duration,
    mut queries: watch::Receiver<String>,
    output: watch::Sender<Suggestions>,
) {
    let mut last_query: Option<String> = None;
    let mut pending = false;

    loop {
        if !pending && queries.changed().await.is_err() {
            break;
        }
        pending = false;
        if !settle(&mut queries, delay).await {
            break;
        }

        let query = queries.borrow_and_update().trim().to_string();
        if query.is_empty() || last_query.as_deref() == Some(query.as_str()) {
            continue;
        }
        last_query = Some(query.clone());
        debug!(%query, "Looking up cities");

        tokio::select! {
            result = provider.search(&query, count) => {
                let results = result.unwrap_or_else(|e| {
                    warn!(%query, "City lookup failed: {e}");
                    Vec::new()
                });
                output.send_replace(Suggestions { query, results });
            }
            changed = queries.changed() => {
                if changed.is_err() {
                    break;
                }
                // the cancelled query may come back and must be looked up again
                last_query = None;
                pending = true;
            }
        }
    }
}

/// Running suggestion pipeline; dropping it stops the task
pub struct CitySuggestions {
    queries: watch::Sender<String>,
    results: watch::Receiver<Suggestions>,
    task: JoinHandle<()>,
}

impl CitySuggestions {
    #[must_use]
    pub fn spawn(provider: Arc<dyn CitySuggestionProvider>, count: u32, debounce: Duration) -> Self {
        let (queries, query_rx) = watch::channel(String::new());
        let (output, results) = watch::channel(Suggestions::default());
        let task = tokio::spawn(run(provider, count, debounce, query_rx, output));
        Self {
            queries,
            results,
            task,
        }
    }

    /// Replace the text being typed
    pub fn set_query(&self, query: impl Into<String>) {
        self.queries.send_replace(query.into());
    }

    #[must_use]
    pub fn current(&self) -> Suggestions {
        self.results.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Suggestions> {
        self.results.clone()
    }

    /// Submit `query` and wait for the suggestions answering it
    pub async fn lookup(&self, query: &str, timeout: Duration) -> Vec<GeocodingResult> {
        let query = query.trim().to_string();
        if query.is_empty() {
            return Vec::new();
        }
        let mut results = self.subscribe();
        self.set_query(query.clone());

        match tokio::time::timeout(timeout, results.wait_for(|s| s.query == query)).await {
            Ok(Ok(answer)) => answer.results.clone(),
            _ => {
                warn!(%query, "No suggestions in time");
                Vec::new()
            }
        }
    }
}

impl Drop for CitySuggestions {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WindRadarError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingProvider {
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CitySuggestionProvider for RecordingProvider {
        async fn search(&self, name: &str, count: u32) -> Result<Vec<GeocodingResult>, WindRadarError> {
            self.queries.lock().unwrap().push(name.to_string());
            if name == "fail" {
                return Err(WindRadarError::api("geocoder down"));
            }
            Ok((0..count.min(2))
                .map(|i| GeocodingResult {
                    name: format!("{name} {i}"),
                    country: None,
                    admin1: None,
                    latitude: 1.0,
                    longitude: 1.0,
                    timezone: None,
                })
                .collect())
        }
    }

    fn pipeline() -> (Arc<RecordingProvider>, CitySuggestions) {
        let provider = Arc::new(RecordingProvider::default());
        let suggestions = CitySuggestions::spawn(provider.clone(), 5, DEFAULT_DEBOUNCE);
        (provider, suggestions)
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_is_debounced() {
        let (provider, suggestions) = pipeline();
        assert!(suggestions.current().results.is_empty());

        for partial in ["Z", "Za", "Zan", "Zand"] {
            suggestions.set_query(partial);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(*provider.queries.lock().unwrap(), vec!["Zand"]);
        let current = suggestions.current();
        assert_eq!(current.query, "Zand");
        assert_eq!(current.results.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_and_repeated_queries_are_dropped() {
        let (provider, suggestions) = pipeline();

        suggestions.set_query("   ");
        tokio::time::sleep(Duration::from_millis(500)).await;
        suggestions.set_query("Tarifa");
        tokio::time::sleep(Duration::from_millis(500)).await;
        suggestions.set_query("Tarifa ");
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(*provider.queries.lock().unwrap(), vec!["Tarifa"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_error_yields_empty_list() {
        let (_provider, suggestions) = pipeline();
        let results = suggestions.lookup("fail", Duration::from_secs(2)).await;
        assert!(results.is_empty());
        assert_eq!(suggestions.current().query, "fail");
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_waits_for_matching_answer() {
        let (_provider, suggestions) = pipeline();
        let results = suggestions.lookup("Zandvoort", Duration::from_secs(2)).await;
        assert_eq!(results[0].name, "Zandvoort 0");

        // answered from the current state without a second lookup
        let again = suggestions.lookup("Zandvoort", Duration::from_secs(2)).await;
        assert_eq!(again, results);
    }
}

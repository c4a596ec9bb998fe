//! Debounced free-text place search.
//!
//! Each keystroke restarts a fixed quiet-period timer; only the query
//! still current when the timer fires is sent, and a response whose
//! query has since been superseded is discarded on arrival — stale
//! results never reach subscribers. An empty or whitespace-only query
//! clears results synchronously without touching the network.
//!
//! What a selected result drives (center the map, prefill a new-place
//! form) is the caller's decision; this type only produces result sets.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use meetmap_client::ApiClient;
use meetmap_geocoder::place_search;
use meetmap_models::Place;
use tokio::sync::watch;

/// Quiet period between the last keystroke and the network call.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);

/// The current result set: `None` means cleared / no active query.
pub type SearchResults = Option<Vec<Place>>;

/// Rate-limits free-text queries with a last-query-wins discipline.
pub struct SearchDebouncer {
    client: Arc<dyn ApiClient>,
    path: String,
    quiet_period: Duration,
    generation: Arc<AtomicU64>,
    results: watch::Sender<SearchResults>,
}

impl SearchDebouncer {
    /// Creates a debouncer issuing searches against `path` (e.g.,
    /// `"/places/search"`) with the default quiet period.
    #[must_use]
    pub fn new(client: Arc<dyn ApiClient>, path: impl Into<String>) -> Self {
        Self::with_quiet_period(client, path, DEFAULT_QUIET_PERIOD)
    }

    /// Creates a debouncer with an explicit quiet period.
    #[must_use]
    pub fn with_quiet_period(
        client: Arc<dyn ApiClient>,
        path: impl Into<String>,
        quiet_period: Duration,
    ) -> Self {
        let (results, _) = watch::channel(None);
        Self {
            client,
            path: path.into(),
            quiet_period,
            generation: Arc::new(AtomicU64::new(0)),
            results,
        }
    }

    /// Feeds the current input value. Restarts the quiet-period timer;
    /// an empty query cancels any pending timer and clears results
    /// immediately.
    pub fn input(&self, query: &str) {
        // Bumping the generation is what cancels the pending timer and
        // invalidates any in-flight response.
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let query = query.trim().to_string();
        if query.is_empty() {
            self.results.send_replace(None);
            return;
        }

        let client = Arc::clone(&self.client);
        let path = self.path.clone();
        let counter = Arc::clone(&self.generation);
        let results = self.results.clone();
        let quiet_period = self.quiet_period;

        tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            if counter.load(Ordering::SeqCst) != generation {
                // Superseded while waiting; never sent.
                return;
            }

            match place_search::search(client.as_ref(), &path, &query).await {
                Ok(places) => {
                    if counter.load(Ordering::SeqCst) == generation {
                        // send_replace so the value sticks even when no
                        // receiver is subscribed yet.
                        results.send_replace(Some(places));
                    } else {
                        log::debug!("Discarding stale search response for {query:?}");
                    }
                }
                Err(e) => {
                    if counter.load(Ordering::SeqCst) == generation {
                        log::warn!("Place search for {query:?} failed: {e}");
                    }
                }
            }
        });
    }

    /// Subscribes to result updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SearchResults> {
        self.results.subscribe()
    }

    /// Returns the current result set.
    #[must_use]
    pub fn results(&self) -> SearchResults {
        self.results.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use meetmap_client::{ApiClient, ClientError, mock::MockApiClient};
    use serde_json::{Value, json};

    async fn settle(debouncer: &SearchDebouncer) {
        // Paused-clock tests: sleeping past the quiet period auto-advances
        // through every pending timer in order.
        tokio::time::sleep(debouncer.quiet_period * 3).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_last_query_within_the_quiet_period_is_sent() {
        let mock = Arc::new(MockApiClient::new());
        mock.on(
            "GET",
            "/places/search?query=abc",
            json!([{ "id": 1, "name": "abc cafe" }]),
        );
        let debouncer = SearchDebouncer::new(mock.clone(), "/places/search");

        debouncer.input("a");
        debouncer.input("ab");
        debouncer.input("abc");
        settle(&debouncer).await;

        assert_eq!(mock.calls().len(), 1);
        assert_eq!(mock.call_count("GET", "/places/search?query=abc"), 1);
        let results = debouncer.results().unwrap();
        assert_eq!(results[0].name, "abc cafe");
    }

    #[tokio::test(start_paused = true)]
    async fn results_are_retained_without_any_subscriber() {
        let mock = Arc::new(MockApiClient::new());
        mock.on(
            "GET",
            "/places/search?query=dorm",
            json!([{ "id": 4, "name": "dorm store" }]),
        );
        let debouncer = SearchDebouncer::new(mock.clone(), "/places/search");

        // No receiver from subscribe() exists anywhere.
        debouncer.input("dorm");
        settle(&debouncer).await;
        assert_eq!(debouncer.results().unwrap()[0].id, 4);

        debouncer.input("");
        assert!(debouncer.results().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_queries_each_fire() {
        let mock = Arc::new(MockApiClient::new());
        mock.on("GET", "/places/search?query=ab", json!([]));
        mock.on("GET", "/places/search?query=cd", json!([]));
        let debouncer = SearchDebouncer::new(mock.clone(), "/places/search");

        debouncer.input("ab");
        settle(&debouncer).await;
        debouncer.input("cd");
        settle(&debouncer).await;

        assert_eq!(mock.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_query_clears_synchronously_without_network() {
        let mock = Arc::new(MockApiClient::new());
        mock.on("GET", "/places/search?query=abc", json!([{ "id": 1 }]));
        let debouncer = SearchDebouncer::new(mock.clone(), "/places/search");

        debouncer.input("abc");
        settle(&debouncer).await;
        assert!(debouncer.results().is_some());

        debouncer.input("   ");
        // Cleared before any timer could fire.
        assert!(debouncer.results().is_none());
        settle(&debouncer).await;
        // The pending timer was cancelled; no further network call.
        assert_eq!(mock.calls().len(), 1);
        assert!(debouncer.results().is_none());
    }

    /// Answers `ab` only once released, `abc` immediately — lets a test
    /// deliver the older response after the newer one.
    struct OutOfOrderClient {
        release_ab: tokio::sync::Semaphore,
    }

    #[async_trait]
    impl ApiClient for OutOfOrderClient {
        async fn get(&self, path: &str) -> Result<Value, ClientError> {
            if path.ends_with("query=ab") {
                let permit = self.release_ab.acquire().await.unwrap();
                permit.forget();
                Ok(json!([{ "id": 1, "name": "ab result" }]))
            } else {
                Ok(json!([{ "id": 2, "name": "abc result" }]))
            }
        }

        async fn post(&self, path: &str, _body: &Value) -> Result<Value, ClientError> {
            Err(ClientError::Status {
                status: 405,
                path: path.to_string(),
            })
        }

        async fn patch(&self, path: &str, _body: &Value) -> Result<Value, ClientError> {
            Err(ClientError::Status {
                status: 405,
                path: path.to_string(),
            })
        }

        async fn delete(&self, path: &str) -> Result<Value, ClientError> {
            Err(ClientError::Status {
                status: 405,
                path: path.to_string(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn late_arriving_stale_response_is_discarded() {
        let client = Arc::new(OutOfOrderClient {
            release_ab: tokio::sync::Semaphore::new(0),
        });
        let debouncer = SearchDebouncer::new(client.clone(), "/places/search");

        // "ab" fires and its request parks in flight.
        debouncer.input("ab");
        settle(&debouncer).await;

        // "abc" supersedes it and completes first.
        debouncer.input("abc");
        settle(&debouncer).await;
        assert_eq!(debouncer.results().unwrap()[0].name, "abc result");

        // The old response finally lands and must not flash in.
        client.release_ab.add_permits(1);
        tokio::task::yield_now().await;
        assert_eq!(debouncer.results().unwrap()[0].name, "abc result");
    }
}

//! Debounced, cancelable location search.

use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;

use crate::{
    debounce::Debouncer,
    error::WeatherError,
    model::SearchResult,
    provider::WeatherProvider,
    request::{RequestGuard, RequestPhase},
};

/// Queries shorter than this never reach the network.
pub const MIN_QUERY_CHARS: usize = 3;

pub fn is_searchable(text: &str) -> bool {
    text.chars().count() >= MIN_QUERY_CHARS
}

#[derive(Debug)]
struct SearchInner {
    provider: Arc<dyn WeatherProvider>,
    query: Mutex<String>,
    results: watch::Sender<Option<Vec<SearchResult>>>,
    last_error: Mutex<Option<String>>,
    guard: RequestGuard,
}

impl SearchInner {
    /// `Ok(None)` means the text was too short to search.
    async fn lookup(&self, text: &str) -> Result<Option<Vec<SearchResult>>, WeatherError> {
        if !is_searchable(text) {
            tracing::debug!(query = text, "Query too short, not searching");
            return Ok(None);
        }

        let ticket = self.guard.begin();
        tracing::debug!(query = text, "Searching locations");

        match self.guard.run(&ticket, self.provider.search(text)).await {
            Ok(results) => {
                let landed = self.guard.finish(&ticket, true, || {
                    self.results.send_replace(Some(results.clone()));
                    *self.last_error.lock() = None;
                });
                if landed {
                    tracing::debug!(query = text, count = results.len(), "Search results updated");
                    Ok(Some(results))
                } else {
                    tracing::debug!(query = text, "Discarding results of superseded search");
                    Err(WeatherError::Superseded)
                }
            }
            Err(err) if err.is_superseded() => {
                tracing::debug!(query = text, "Search cancelled by a newer request");
                Err(err)
            }
            Err(err) => {
                let current = self.guard.finish(&ticket, false, || {
                    *self.last_error.lock() = Some(err.to_string());
                });
                if current {
                    // Previous results stay on screen.
                    tracing::warn!(query = text, error = %err, "Location search failed");
                    Err(err)
                } else {
                    Err(WeatherError::Superseded)
                }
            }
        }
    }
}

/// Owns the current query, the latest result list and the request sequencing
/// for one search box.
#[derive(Debug)]
pub struct SearchCoordinator {
    inner: Arc<SearchInner>,
    debouncer: Debouncer,
}

impl SearchCoordinator {
    pub fn new(provider: Arc<dyn WeatherProvider>, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(SearchInner {
                provider,
                query: Mutex::new(String::new()),
                results: watch::Sender::new(None),
                last_error: Mutex::new(None),
                guard: RequestGuard::new(),
            }),
            debouncer: Debouncer::new(debounce),
        }
    }

    /// Record `text` as the current query and schedule a debounced lookup.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn search(&self, text: &str) {
        *self.inner.query.lock() = text.to_string();

        let inner = Arc::clone(&self.inner);
        let text = text.to_string();
        self.debouncer.schedule(async move {
            // Failures are logged and recorded inside lookup.
            let _ = inner.lookup(&text).await;
        });
    }

    /// Look up `text` right away, bypassing the debounce window.
    pub async fn search_now(&self, text: &str) -> Result<Option<Vec<SearchResult>>, WeatherError> {
        *self.inner.query.lock() = text.to_string();
        self.debouncer.cancel_pending();
        self.inner.lookup(text).await
    }

    pub fn query(&self) -> String {
        self.inner.query.lock().clone()
    }

    /// Latest landed result list, regardless of the current query.
    pub fn results(&self) -> Option<Vec<SearchResult>> {
        self.inner.results.borrow().clone()
    }

    /// Results worth showing for the current query; hidden while it is too short.
    pub fn visible_results(&self) -> Option<Vec<SearchResult>> {
        if is_searchable(&self.query()) { self.results() } else { None }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Vec<SearchResult>>> {
        self.inner.results.subscribe()
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.lock().clone()
    }

    pub fn phase(&self) -> RequestPhase {
        self.inner.guard.phase()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<RequestPhase> {
        self.inner.guard.subscribe_phase()
    }

    /// Drop the result list after a selection, cancelling anything pending.
    pub fn clear(&self) {
        self.debouncer.cancel_pending();
        self.inner.guard.cancel();
        self.inner.results.send_replace(None);
    }

    /// Cancel the pending debounced lookup and any in-flight request.
    pub fn shutdown(&self) {
        self.debouncer.cancel_pending();
        self.inner.guard.cancel();
    }
}

impl Drop for SearchCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

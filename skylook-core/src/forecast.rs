use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

use crate::{
    error::WeatherError,
    model::WeatherSnapshot,
    provider::WeatherProvider,
    request::{RequestGuard, RequestPhase},
    storage::Persistence,
};

/// Holds the current [`WeatherSnapshot`] and fetches replacements for it.
///
/// The snapshot only ever changes wholesale, on a successful fetch of the
/// newest request. Failures leave it in place and are exposed through
/// [`last_error`](ForecastCoordinator::last_error).
#[derive(Debug)]
pub struct ForecastCoordinator {
    provider: Arc<dyn WeatherProvider>,
    persistence: Persistence,
    snapshot: watch::Sender<Option<Arc<WeatherSnapshot>>>,
    last_error: Mutex<Option<String>>,
    guard: RequestGuard,
}

impl ForecastCoordinator {
    pub fn new(provider: Arc<dyn WeatherProvider>, persistence: Persistence) -> Self {
        Self {
            provider,
            persistence,
            snapshot: watch::Sender::new(None),
            last_error: Mutex::new(None),
            guard: RequestGuard::new(),
        }
    }

    pub async fn fetch_forecast(
        &self,
        locator: &str,
    ) -> Result<Arc<WeatherSnapshot>, WeatherError> {
        let ticket = self.guard.begin();
        tracing::debug!(locator, "Fetching forecast");

        let fetched = match self.guard.run(&ticket, self.provider.forecast(locator)).await {
            Ok(snapshot) => Arc::new(snapshot),
            Err(err) if err.is_superseded() => return Err(err),
            Err(err) => {
                let current = self.guard.finish(&ticket, false, || {
                    *self.last_error.lock() = Some(err.to_string());
                });
                if !current {
                    return Err(WeatherError::Superseded);
                }
                tracing::warn!(
                    locator,
                    error = %err,
                    "Forecast fetch failed, keeping previous snapshot"
                );
                return Err(err);
            }
        };

        let landed = self.guard.finish(&ticket, true, || {
            self.snapshot.send_replace(Some(Arc::clone(&fetched)));
            *self.last_error.lock() = None;
        });
        if !landed {
            tracing::debug!(locator, "Discarding superseded forecast");
            return Err(WeatherError::Superseded);
        }

        if let Err(err) = self.persistence.set_last_location(locator).await {
            tracing::warn!(locator, error = %err, "Failed to remember last location");
        }

        tracing::info!(
            locator,
            location = %fetched.location.name,
            days = fetched.forecast.days.len(),
            "Forecast updated"
        );
        Ok(fetched)
    }

    /// Re-fetch the last successfully fetched location, if one was persisted.
    pub async fn restore(&self) -> Result<Option<Arc<WeatherSnapshot>>, WeatherError> {
        let Some(locator) = self.persistence.last_location().await? else {
            tracing::debug!("No last location to restore");
            return Ok(None);
        };
        self.fetch_forecast(&locator).await.map(Some)
    }

    pub fn snapshot(&self) -> Option<Arc<WeatherSnapshot>> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<WeatherSnapshot>>> {
        self.snapshot.subscribe()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    pub fn phase(&self) -> RequestPhase {
        self.guard.phase()
    }

    /// Abandon any in-flight fetch.
    pub fn cancel(&self) {
        self.guard.cancel();
    }
}

use anyhow::Context;
use std::{sync::Arc, time::Duration};

use crate::{
    Config,
    error::WeatherError,
    favorites::FavoritesManager,
    forecast::ForecastCoordinator,
    model::{SearchResult, UnitSystem, WeatherSnapshot},
    provider::{WeatherProvider, provider_from_config},
    search::SearchCoordinator,
    storage::{FileStore, Persistence},
};

/// One user's search box, current forecast, favorites and unit preference.
#[derive(Debug)]
pub struct Session {
    search: SearchCoordinator,
    forecast: ForecastCoordinator,
    favorites: FavoritesManager,
    persistence: Persistence,
    units: UnitSystem,
}

impl Session {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        persistence: Persistence,
        debounce: Duration,
    ) -> Self {
        Self {
            search: SearchCoordinator::new(Arc::clone(&provider), debounce),
            forecast: ForecastCoordinator::new(provider, persistence.clone()),
            favorites: FavoritesManager::new(persistence.clone()),
            persistence,
            units: UnitSystem::default(),
        }
    }

    /// HTTP provider plus a file store under the configured data directory.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider = provider_from_config(config)?;
        let dir = config.storage_dir().context("Failed to resolve storage directory")?;
        let persistence = Persistence::new(Arc::new(FileStore::new(dir)));
        Ok(Self::new(provider, persistence, config.debounce()))
    }

    /// Load favorites and unit preference, then re-fetch the last location.
    ///
    /// Local state failures are logged and leave that state at its default.
    /// A failure to read or fetch the last location is returned.
    pub async fn start(&mut self) -> Result<Option<Arc<WeatherSnapshot>>, WeatherError> {
        self.load_local_state().await;

        self.forecast.restore().await.inspect_err(|err| {
            tracing::warn!(error = %err, "Could not restore last location");
        })
    }

    /// Load favorites and unit preference without touching the network.
    pub async fn load_local_state(&mut self) {
        if let Err(err) = self.favorites.reload().await {
            tracing::warn!(error = %err, "Could not load favorites");
        }

        match self.persistence.unit_preference().await {
            Ok(Some(units)) => self.units = units,
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "Could not load unit preference"),
        }
    }

    /// Dismiss search results and fetch the forecast for the chosen one.
    pub async fn select(
        &self,
        result: &SearchResult,
    ) -> Result<Arc<WeatherSnapshot>, WeatherError> {
        self.search.clear();
        self.forecast.fetch_forecast(&result.locator).await
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    /// Flip the unit system. The new value applies even if persisting it fails.
    pub async fn toggle_units(&mut self) -> Result<UnitSystem, WeatherError> {
        let next = self.units.toggled();
        self.set_units(next).await?;
        Ok(next)
    }

    pub async fn set_units(&mut self, units: UnitSystem) -> Result<(), WeatherError> {
        self.units = units;
        self.persistence.set_unit_preference(units).await.inspect_err(|err| {
            tracing::warn!(error = %err, units = %units, "Failed to persist unit preference");
        })
    }

    /// Save or unsave the location currently on screen.
    pub async fn toggle_current_favorite(&mut self) -> Result<Option<bool>, WeatherError> {
        let Some(snapshot) = self.forecast.snapshot() else {
            return Ok(None);
        };
        self.favorites.toggle(&snapshot).await.map(Some)
    }

    pub fn is_current_saved(&self) -> bool {
        self.forecast
            .snapshot()
            .is_some_and(|snap| self.favorites.is_saved(&snap.location.name))
    }

    pub fn search(&self) -> &SearchCoordinator {
        &self.search
    }

    pub fn forecast(&self) -> &ForecastCoordinator {
        &self.forecast
    }

    pub fn favorites(&self) -> &FavoritesManager {
        &self.favorites
    }

    pub fn favorites_mut(&mut self) -> &mut FavoritesManager {
        &mut self.favorites
    }

    /// Stop anything scheduled or in flight.
    pub fn shutdown(&self) {
        self.search.shutdown();
        self.forecast.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::fixtures::{result, tokyo},
        provider::fake::FakeProvider,
        storage::{KeyValueStore, LAST_LOCATION, MemoryStore},
    };
    use async_trait::async_trait;

    /// Reads from the wrapped store; every write fails.
    #[derive(Debug, Default)]
    struct ReadOnlyStore(MemoryStore);

    #[async_trait]
    impl KeyValueStore for ReadOnlyStore {
        async fn get(&self, key: &str) -> Result<Option<String>, WeatherError> {
            self.0.get(key).await
        }

        async fn set(&self, key: &str, _value: &str) -> Result<(), WeatherError> {
            Err(WeatherError::storage(key, "read-only"))
        }
    }

    fn session(provider: &Arc<FakeProvider>, persistence: &Persistence) -> Session {
        Session::new(provider.clone(), persistence.clone(), Duration::from_millis(500))
    }

    #[tokio::test]
    async fn fresh_start_defaults_to_metric_and_nothing_restored() {
        let provider = FakeProvider::new();
        let mut s = session(&provider, &Persistence::in_memory());

        assert!(s.start().await.unwrap().is_none());
        assert_eq!(s.units(), UnitSystem::Metric);
        assert!(s.favorites().list().is_empty());
    }

    #[tokio::test]
    async fn restart_restores_units_favorites_and_last_location() {
        let provider = FakeProvider::new();
        provider.on_forecast("Tokyo", 0, tokyo());
        let persistence = Persistence::in_memory();

        {
            let mut s = session(&provider, &persistence);
            s.start().await.unwrap();
            s.forecast().fetch_forecast("Tokyo").await.unwrap();
            assert_eq!(s.toggle_current_favorite().await.unwrap(), Some(true));
            assert_eq!(s.toggle_units().await.unwrap(), UnitSystem::Imperial);
        }

        let mut restarted = session(&provider, &persistence);
        let restored = restarted.start().await.unwrap();

        assert_eq!(restored.as_deref(), Some(&tokyo()));
        assert_eq!(restarted.units(), UnitSystem::Imperial);
        assert!(restarted.is_current_saved());
    }

    #[tokio::test]
    async fn select_clears_results_and_fetches_locator() {
        let provider = FakeProvider::new();
        let mut tokyo_result = result(7, "Tokyo");
        tokyo_result.locator = "tokyo-tokyo-japan".into();
        provider.on_search("tok", 0, vec![tokyo_result.clone()]);
        provider.on_forecast("tokyo-tokyo-japan", 0, tokyo());
        let s = session(&provider, &Persistence::in_memory());

        s.search().search_now("tok").await.unwrap();
        assert!(s.search().results().is_some());

        let snap = s.select(&tokyo_result).await.unwrap();
        assert_eq!(snap.location.name, "Tokyo");
        assert_eq!(s.search().results(), None);
        assert_eq!(provider.forecast_calls(), vec!["tokyo-tokyo-japan".to_string()]);
    }

    #[tokio::test]
    async fn toggling_favorite_without_snapshot_is_a_no_op() {
        let provider = FakeProvider::new();
        let mut s = session(&provider, &Persistence::in_memory());
        assert_eq!(s.toggle_current_favorite().await.unwrap(), None);
        assert!(!s.is_current_saved());
    }

    #[tokio::test]
    async fn unit_toggle_applies_even_when_it_cannot_be_saved() {
        let provider = FakeProvider::new();
        let mut s = session(&provider, &Persistence::new(Arc::new(ReadOnlyStore::default())));

        let err = s.toggle_units().await.unwrap_err();

        assert!(matches!(err, WeatherError::Storage { .. }));
        assert_eq!(s.units(), UnitSystem::Imperial);
    }

    #[tokio::test]
    async fn unreadable_last_location_is_reported_by_start() {
        let provider = FakeProvider::new();
        let store = MemoryStore::new();
        store.set(LAST_LOCATION, "not json").await.unwrap();
        let mut s = session(&provider, &Persistence::new(Arc::new(store)));

        let err = s.start().await.unwrap_err();

        assert!(matches!(err, WeatherError::Parse { .. }));
        assert!(provider.forecast_calls().is_empty());
    }
}

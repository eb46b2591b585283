use crate::{
    error::WeatherError,
    model::{FavoriteLocation, WeatherSnapshot},
    storage::Persistence,
};

/// In-memory favorites list kept in step with [`Persistence`].
///
/// Entries are unique by name, newest first. Every mutation writes the full
/// list; the in-memory copy only changes once that write succeeded.
#[derive(Debug, Clone)]
pub struct FavoritesManager {
    persistence: Persistence,
    locations: Vec<FavoriteLocation>,
}

impl FavoritesManager {
    /// Empty manager; call [`reload`](Self::reload) to pick up stored favorites.
    pub fn new(persistence: Persistence) -> Self {
        Self { persistence, locations: Vec::new() }
    }

    pub async fn load(persistence: Persistence) -> Result<Self, WeatherError> {
        let mut manager = Self::new(persistence);
        manager.reload().await?;
        Ok(manager)
    }

    pub async fn reload(&mut self) -> Result<(), WeatherError> {
        self.locations = self.persistence.favorites().await?;
        tracing::debug!(count = self.locations.len(), "Loaded favorites");
        Ok(())
    }

    pub fn list(&self) -> &[FavoriteLocation] {
        &self.locations
    }

    pub fn is_saved(&self, name: &str) -> bool {
        self.locations.iter().any(|loc| loc.name == name)
    }

    /// Save the snapshot's location. Returns `false` when it was already saved.
    pub async fn save(&mut self, snapshot: &WeatherSnapshot) -> Result<bool, WeatherError> {
        self.save_location(FavoriteLocation::from(snapshot)).await
    }

    pub async fn save_location(
        &mut self,
        favorite: FavoriteLocation,
    ) -> Result<bool, WeatherError> {
        if self.is_saved(&favorite.name) {
            return Ok(false);
        }

        let mut updated = Vec::with_capacity(self.locations.len() + 1);
        updated.push(favorite);
        updated.extend(self.locations.iter().cloned());

        self.commit(updated).await?;
        tracing::info!(name = %self.locations[0].name, "Saved favorite");
        Ok(true)
    }

    /// Remove every favorite called `name`. Returns whether anything was removed.
    pub async fn remove(&mut self, name: &str) -> Result<bool, WeatherError> {
        let updated: Vec<_> =
            self.locations.iter().filter(|loc| loc.name != name).cloned().collect();
        let removed = updated.len() != self.locations.len();

        self.commit(updated).await?;
        if removed {
            tracing::info!(name, "Removed favorite");
        }
        Ok(removed)
    }

    /// Save when absent, remove when present. Returns whether it is saved afterwards.
    pub async fn toggle(&mut self, snapshot: &WeatherSnapshot) -> Result<bool, WeatherError> {
        let name = &snapshot.location.name;
        if self.is_saved(name) {
            self.remove(name).await?;
            Ok(false)
        } else {
            self.save(snapshot).await?;
            Ok(true)
        }
    }

    async fn commit(&mut self, updated: Vec<FavoriteLocation>) -> Result<(), WeatherError> {
        if let Err(err) = self.persistence.set_favorites(&updated).await {
            tracing::warn!(error = %err, "Failed to persist favorites");
            return Err(err);
        }
        self.locations = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::fixtures::{snapshot_named, tokyo},
        storage::KeyValueStore,
    };
    use async_trait::async_trait;
    use std::sync::Arc;

    fn fav(name: &str, region: &str, country: &str) -> FavoriteLocation {
        FavoriteLocation { name: name.into(), region: region.into(), country: country.into() }
    }

    #[tokio::test]
    async fn saving_tokyo_twice_keeps_one_entry() {
        let persistence = Persistence::in_memory();
        let mut favorites = FavoritesManager::load(persistence.clone()).await.unwrap();
        assert!(favorites.list().is_empty());

        assert!(favorites.save(&tokyo()).await.unwrap());
        assert_eq!(favorites.list(), &[fav("Tokyo", "Tokyo", "Japan")]);
        assert_eq!(persistence.favorites().await.unwrap(), vec![fav("Tokyo", "Tokyo", "Japan")]);

        assert!(!favorites.save(&tokyo()).await.unwrap());
        assert_eq!(favorites.list().len(), 1);
    }

    #[tokio::test]
    async fn newest_favorite_comes_first() {
        let mut favorites = FavoritesManager::new(Persistence::in_memory());
        favorites.save(&snapshot_named("Oslo", "Oslo", "Norway")).await.unwrap();
        favorites.save(&tokyo()).await.unwrap();

        let names: Vec<_> = favorites.list().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Tokyo", "Oslo"]);
    }

    #[tokio::test]
    async fn remove_then_is_saved_is_false() {
        let persistence = Persistence::in_memory();
        let mut favorites = FavoritesManager::new(persistence.clone());
        favorites.save(&tokyo()).await.unwrap();
        assert!(favorites.is_saved("Tokyo"));

        assert!(favorites.remove("Tokyo").await.unwrap());
        assert!(!favorites.is_saved("Tokyo"));
        assert!(persistence.favorites().await.unwrap().is_empty());

        assert!(!favorites.remove("Tokyo").await.unwrap());
    }

    #[tokio::test]
    async fn toggle_flips_saved_state() {
        let mut favorites = FavoritesManager::new(Persistence::in_memory());
        assert!(favorites.toggle(&tokyo()).await.unwrap());
        assert!(!favorites.toggle(&tokyo()).await.unwrap());
        assert!(favorites.list().is_empty());
    }

    #[tokio::test]
    async fn reload_picks_up_persisted_list() {
        let persistence = Persistence::in_memory();
        persistence.set_favorites(&[fav("Lima", "Lima", "Peru")]).await.unwrap();

        let favorites = FavoritesManager::load(persistence).await.unwrap();
        assert!(favorites.is_saved("Lima"));
    }

    #[derive(Debug)]
    struct ReadOnlyStore;

    #[async_trait]
    impl KeyValueStore for ReadOnlyStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, WeatherError> {
            Ok(None)
        }

        async fn set(&self, key: &str, _value: &str) -> Result<(), WeatherError> {
            Err(WeatherError::storage(key, "read-only"))
        }
    }

    #[tokio::test]
    async fn failed_write_leaves_list_unchanged() {
        let mut favorites = FavoritesManager::new(Persistence::new(Arc::new(ReadOnlyStore)));

        let err = favorites.save(&tokyo()).await.unwrap_err();
        assert!(matches!(err, WeatherError::Storage { .. }));
        assert!(!favorites.is_saved("Tokyo"));
    }
}

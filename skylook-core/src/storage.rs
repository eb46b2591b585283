//! Local key-value persistence for favorites and preferences.
//!
//! [`KeyValueStore`] is the raw string store; [`Persistence`] is the typed
//! gateway over the three records the client keeps. Each key is read and
//! written independently; there is no cross-key atomicity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt::Debug,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use parking_lot::Mutex;

use crate::{
    error::WeatherError,
    model::{FavoriteLocation, UnitSystem},
};

pub const UNIT_PREF: &str = "UNIT_PREF";
pub const LAST_LOCATION: &str = "LAST_LOCATION";
pub const SAVED_LOCATIONS: &str = "SAVED_LOCATIONS";

/// Current schema version of the persisted favorites record.
pub const FAVORITES_VERSION: u32 = 1;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    async fn get(&self, key: &str) -> Result<Option<String>, WeatherError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), WeatherError>;
}

/// Stores each key as `<dir>/<KEY>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, WeatherError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(WeatherError::storage(key, err)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), WeatherError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| WeatherError::storage(key, err))?;

        // Each write gets its own temp file; the rename replaces the record whole.
        let path = self.path_for(key);
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = self.dir.join(format!("{key}.json.{}.{seq}.tmp", std::process::id()));
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|err| WeatherError::storage(key, err))?;
        if let Err(err) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(WeatherError::storage(key, err));
        }
        Ok(())
    }
}

/// In-process store; contents vanish with the value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, WeatherError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), WeatherError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct VersionedFavorites {
    version: u32,
    locations: Vec<FavoriteLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredFavorites {
    Versioned(VersionedFavorites),
    Legacy(Vec<FavoriteLocation>),
}

/// Typed access to the unit preference, last location and favorites records.
#[derive(Debug, Clone)]
pub struct Persistence {
    store: Arc<dyn KeyValueStore>,
}

impl Persistence {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    async fn read<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, WeatherError> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| WeatherError::Parse { what: "stored record", source })
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), WeatherError> {
        let raw = serde_json::to_string(value)
            .map_err(|source| WeatherError::Parse { what: "stored record", source })?;
        self.store.set(key, &raw).await
    }

    pub async fn unit_preference(&self) -> Result<Option<UnitSystem>, WeatherError> {
        Ok(self.read::<bool>(UNIT_PREF).await?.map(UnitSystem::from_metric_flag))
    }

    pub async fn set_unit_preference(&self, units: UnitSystem) -> Result<(), WeatherError> {
        self.write(UNIT_PREF, &units.is_metric()).await
    }

    pub async fn last_location(&self) -> Result<Option<String>, WeatherError> {
        self.read(LAST_LOCATION).await
    }

    pub async fn set_last_location(&self, locator: &str) -> Result<(), WeatherError> {
        self.write(LAST_LOCATION, locator).await
    }

    /// Persisted favorites; an absent record is an empty list.
    pub async fn favorites(&self) -> Result<Vec<FavoriteLocation>, WeatherError> {
        match self.read::<StoredFavorites>(SAVED_LOCATIONS).await? {
            None => Ok(Vec::new()),
            Some(StoredFavorites::Legacy(locations)) => Ok(locations),
            Some(StoredFavorites::Versioned(v)) if v.version <= FAVORITES_VERSION => {
                Ok(v.locations)
            }
            Some(StoredFavorites::Versioned(v)) => Err(WeatherError::storage(
                SAVED_LOCATIONS,
                format!("unsupported favorites version {}", v.version),
            )),
        }
    }

    pub async fn set_favorites(&self, locations: &[FavoriteLocation]) -> Result<(), WeatherError> {
        let record =
            VersionedFavorites { version: FAVORITES_VERSION, locations: locations.to_vec() };
        self.write(SAVED_LOCATIONS, &record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokyo() -> FavoriteLocation {
        FavoriteLocation { name: "Tokyo".into(), region: "Tokyo".into(), country: "Japan".into() }
    }

    #[tokio::test]
    async fn unit_preference_roundtrips_both_values() {
        let p = Persistence::in_memory();
        assert_eq!(p.unit_preference().await.unwrap(), None);

        p.set_unit_preference(UnitSystem::Metric).await.unwrap();
        assert_eq!(p.unit_preference().await.unwrap(), Some(UnitSystem::Metric));

        p.set_unit_preference(UnitSystem::Imperial).await.unwrap();
        assert_eq!(p.unit_preference().await.unwrap(), Some(UnitSystem::Imperial));
    }

    #[tokio::test]
    async fn last_location_overwrites() {
        let p = Persistence::in_memory();
        p.set_last_location("paris").await.unwrap();
        p.set_last_location("Tokyo").await.unwrap();
        assert_eq!(p.last_location().await.unwrap().as_deref(), Some("Tokyo"));
    }

    #[tokio::test]
    async fn favorites_are_written_with_version_tag() {
        let store = MemoryStore::new();
        let p = Persistence::new(Arc::new(store.clone()));
        p.set_favorites(&[tokyo()]).await.unwrap();

        let raw = store.get(SAVED_LOCATIONS).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["locations"][0]["name"], "Tokyo");

        assert_eq!(p.favorites().await.unwrap(), vec![tokyo()]);
    }

    #[tokio::test]
    async fn bare_array_favorites_are_still_read() {
        let store = MemoryStore::new();
        store
            .set(SAVED_LOCATIONS, r#"[{"name":"Tokyo","country":"Japan","region":"Tokyo"}]"#)
            .await
            .unwrap();
        let p = Persistence::new(Arc::new(store));
        assert_eq!(p.favorites().await.unwrap(), vec![tokyo()]);
    }

    #[tokio::test]
    async fn future_favorites_version_is_rejected() {
        let store = MemoryStore::new();
        store.set(SAVED_LOCATIONS, r#"{"version":9,"locations":[]}"#).await.unwrap();
        let p = Persistence::new(Arc::new(store));
        let err = p.favorites().await.unwrap_err();
        assert!(err.to_string().contains("unsupported favorites version 9"));
    }

    #[tokio::test]
    async fn corrupt_record_is_a_parse_error() {
        let store = MemoryStore::new();
        store.set(UNIT_PREF, "maybe").await.unwrap();
        let p = Persistence::new(Arc::new(store));
        assert!(matches!(p.unit_preference().await, Err(WeatherError::Parse { .. })));
    }

    #[tokio::test]
    async fn file_store_roundtrips_and_reports_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        assert_eq!(store.get(LAST_LOCATION).await.unwrap(), None);
        store.set(LAST_LOCATION, "\"Tokyo\"").await.unwrap();
        assert_eq!(store.get(LAST_LOCATION).await.unwrap().as_deref(), Some("\"Tokyo\""));
        assert_eq!(stored_files(store.dir()), vec!["LAST_LOCATION.json".to_string()]);
    }

    fn stored_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_writes_to_one_key_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()));

        for round in 0..100 {
            let writes: Vec<_> = ["\"paris\"", "\"tokyo\""]
                .into_iter()
                .map(|value| {
                    let store = Arc::clone(&store);
                    tokio::spawn(async move { store.set(LAST_LOCATION, value).await })
                })
                .collect();
            for write in writes {
                write.await.unwrap().unwrap_or_else(|err| panic!("round {round}: {err}"));
            }

            let stored = store.get(LAST_LOCATION).await.unwrap().unwrap();
            assert!(stored == "\"paris\"" || stored == "\"tokyo\"", "unexpected record {stored}");
        }

        assert_eq!(stored_files(dir.path()), vec!["LAST_LOCATION.json".to_string()]);
    }

    #[tokio::test]
    async fn persistence_over_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let p = Persistence::new(Arc::new(FileStore::new(dir.path())));
        p.set_favorites(&[tokyo()]).await.unwrap();
        p.set_unit_preference(UnitSystem::Imperial).await.unwrap();

        let reopened = Persistence::new(Arc::new(FileStore::new(dir.path())));
        assert_eq!(reopened.favorites().await.unwrap(), vec![tokyo()]);
        assert_eq!(reopened.unit_preference().await.unwrap(), Some(UnitSystem::Imperial));
    }
}

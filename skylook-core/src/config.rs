use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

pub const DEFAULT_SEARCH_URL: &str = "http://api.weatherapi.com/v1/search.json";
pub const DEFAULT_FORECAST_URL: &str = "http://api.weatherapi.com/v1/forecast.json";
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Environment variables that override values from the config file.
pub const ENV_API_KEY: &str = "SKYLOOK_API_KEY";
pub const ENV_SEARCH_URL: &str = "SKYLOOK_SEARCH_URL";
pub const ENV_FORECAST_URL: &str = "SKYLOOK_FORECAST_URL";
pub const ENV_DATA_DIR: &str = "SKYLOOK_DATA_DIR";
pub const ENV_DEBOUNCE_MS: &str = "SKYLOOK_DEBOUNCE_MS";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// search_url = "http://api.weatherapi.com/v1/search.json"
/// forecast_url = "http://api.weatherapi.com/v1/forecast.json"
/// debounce_ms = 500
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub search_url: String,
    pub forecast_url: String,
    pub debounce_ms: u64,
    pub http_timeout_secs: Option<u64>,
    /// Overrides the platform data directory used for favorites and preferences.
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            search_url: DEFAULT_SEARCH_URL.to_string(),
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            http_timeout_secs: None,
            data_dir: None,
        }
    }
}

impl Config {
    /// Load config from disk (or defaults) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_file()?;
        cfg.apply_env(|name| std::env::var(name).ok())?;

        if cfg.api_key.is_none() {
            tracing::warn!(
                "No API key configured; requests will be rejected by the weather service. \
                 Set {ENV_API_KEY} or run `skylook configure`."
            );
        }

        Ok(cfg)
    }

    /// Load only the config file, or return defaults if it doesn't exist yet.
    pub fn load_file() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid configuration TOML")
    }

    /// Apply overrides from a variable lookup, normally `std::env::var`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY).filter(|v| !v.is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup(ENV_SEARCH_URL).filter(|v| !v.is_empty()) {
            self.search_url = url;
        }
        if let Some(url) = lookup(ENV_FORECAST_URL).filter(|v| !v.is_empty()) {
            self.forecast_url = url;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(ms) = lookup(ENV_DEBOUNCE_MS).filter(|v| !v.is_empty()) {
            self.debounce_ms = ms.parse().with_context(|| {
                format!("{ENV_DEBOUNCE_MS} must be a number of milliseconds, got '{ms}'")
            })?;
        }
        Ok(())
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "skylook", "skylook")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Directory holding the persisted key-value records.
    pub fn storage_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join("store")),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }

    /// API key as sent on the wire; empty when not configured.
    pub fn api_key_or_empty(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }
}

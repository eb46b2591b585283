use crate::{
    Config,
    error::WeatherError,
    model::{SearchResult, WeatherSnapshot},
    provider::weatherapi::WeatherApiProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod weatherapi;

/// Number of forecast days always requested.
pub const FORECAST_DAYS: u8 = 3;

/// Remote source of location matches and forecasts.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Look up locations matching free-form text.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, WeatherError>;

    /// Fetch current conditions plus a [`FORECAST_DAYS`]-day forecast for a locator.
    async fn forecast(&self, locator: &str) -> Result<WeatherSnapshot, WeatherError>;
}

/// Construct the HTTP provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let provider = WeatherApiProvider::from_config(config)?;
    Ok(Arc::new(provider))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_from_default_config_builds() {
        let cfg = Config::default();
        assert!(provider_from_config(&cfg).is_ok());
    }

    #[test]
    fn provider_from_config_with_timeout_builds() {
        let cfg = Config { http_timeout_secs: Some(5), ..Config::default() };
        assert!(provider_from_config(&cfg).is_ok());
    }
}

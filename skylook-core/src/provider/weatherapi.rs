use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::{
    Config,
    error::WeatherError,
    model::{SearchResult, WeatherSnapshot},
    provider::FORECAST_DAYS,
};

use super::WeatherProvider;

/// Client for weatherapi.com style `search.json` / `forecast.json` endpoints.
#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    search_url: String,
    forecast_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.http_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            api_key: config.api_key_or_empty().to_string(),
            search_url: config.search_url.clone(),
            forecast_url: config.forecast_url.clone(),
            http,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, WeatherError> {
        tracing::debug!(endpoint, url, "Sending weather API request");

        let res = self
            .http
            .get(url)
            .query(&[("key", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|source| WeatherError::Network { endpoint, source })?;

        let status = res.status();
        let body = res.text().await.map_err(|source| WeatherError::Network { endpoint, source })?;

        if !status.is_success() {
            return Err(WeatherError::Status {
                endpoint,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| WeatherError::Parse { what: endpoint, source })
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, WeatherError> {
        self.get_json("search", &self.search_url, &[("q", query)]).await
    }

    async fn forecast(&self, locator: &str) -> Result<WeatherSnapshot, WeatherError> {
        let days = FORECAST_DAYS.to_string();
        self.get_json(
            "forecast",
            &self.forecast_url,
            &[("q", locator), ("days", days.as_str()), ("aqi", "no"), ("alerts", "no")],
        )
        .await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_bodies_are_kept() {
        assert_eq!(truncate_body("{\"error\":1}"), "{\"error\":1}");
    }

    #[test]
    fn long_bodies_are_cut_on_char_boundary() {
        let body = "é".repeat(300);
        let cut = truncate_body(&body);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 203);
    }
}

use thiserror::Error;

/// Errors produced by the search, forecast and persistence layers.
///
/// None of these are fatal: coordinators log them and keep their previous
/// observable state.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Request to {endpoint} failed: {source}")]
    Network {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} request failed with status {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to parse {what}: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage error for key {key}: {message}")]
    Storage { key: String, message: String },

    #[error("Request was superseded by a newer one")]
    Superseded,

    #[error("Request was cancelled")]
    Cancelled,
}

impl WeatherError {
    pub(crate) fn storage(key: impl Into<String>, err: impl std::fmt::Display) -> Self {
        WeatherError::Storage { key: key.into(), message: err.to_string() }
    }

    /// Short message suitable for showing next to stale data.
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::Network { .. } => "Could not reach the weather service.",
            WeatherError::Status { status, .. } if *status == 401 || *status == 403 => {
                "The weather service rejected the API key."
            }
            WeatherError::Status { .. } => "The weather service returned an error.",
            WeatherError::Parse { .. } => "The weather service sent an unexpected response.",
            WeatherError::Storage { .. } => "Could not access local storage.",
            WeatherError::Superseded | WeatherError::Cancelled => "The request was replaced.",
        }
    }

    /// True for outcomes that only mean a newer request took over.
    pub fn is_superseded(&self) -> bool {
        matches!(self, WeatherError::Superseded | WeatherError::Cancelled)
    }
}

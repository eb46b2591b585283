//! Core library for the `skylook` weather client.
//!
//! This crate defines:
//! - Configuration handling
//! - The weather/geocoding provider abstraction and its HTTP client
//! - Debounced, cancelable location search
//! - Forecast fetching with last-location restore
//! - Favorites and unit preference persistence
//!
//! It is used by `skylook-cli`, but any other front end can drive a
//! [`Session`] the same way.

pub mod config;
pub mod debounce;
pub mod display;
pub mod error;
pub mod favorites;
pub mod forecast;
pub mod model;
pub mod provider;
mod request;
pub mod search;
pub mod session;
pub mod storage;

pub use config::Config;
pub use display::TimeOfDay;
pub use error::WeatherError;
pub use favorites::FavoritesManager;
pub use forecast::ForecastCoordinator;
pub use model::{FavoriteLocation, SearchResult, UnitSystem, WeatherSnapshot};
pub use provider::{WeatherProvider, weatherapi::WeatherApiProvider};
pub use request::RequestPhase;
pub use search::SearchCoordinator;
pub use session::Session;
pub use storage::{FileStore, KeyValueStore, MemoryStore, Persistence};

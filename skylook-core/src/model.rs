use serde::{Deserialize, Serialize};

/// One match returned by the location search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    /// Opaque identifier handed back to the forecast endpoint.
    #[serde(rename = "url")]
    pub locator: String,
}

impl SearchResult {
    pub fn label(&self) -> String {
        format!("{}, {}, {}", self.name, self.region, self.country)
    }
}

/// Full forecast payload for one location at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: Location,
    pub current: Current,
    pub forecast: Forecast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub localtime_epoch: Option<i64>,
    /// Local wall-clock time, `YYYY-MM-DD HH:MM`.
    #[serde(default)]
    pub localtime: Option<String>,
    #[serde(default)]
    pub tz_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Current {
    pub temp_c: f64,
    pub temp_f: f64,
    pub humidity: u8,
    pub wind_kph: f64,
    pub wind_mph: f64,
    pub feelslike_c: f64,
    pub feelslike_f: f64,
    #[serde(default)]
    pub uv: f64,
    #[serde(default)]
    pub is_day: u8,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub text: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub code: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    #[serde(rename = "forecastday", default)]
    pub days: Vec<ForecastDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: String,
    pub day: DaySummary,
    pub astro: Astro,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub maxtemp_c: f64,
    pub maxtemp_f: f64,
    pub mintemp_c: f64,
    pub mintemp_f: f64,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Astro {
    pub sunrise: String,
    pub sunset: String,
}

/// A saved location. Two favorites are the same favorite when their names match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteLocation {
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
}

impl From<&Location> for FavoriteLocation {
    fn from(location: &Location) -> Self {
        Self {
            name: location.name.clone(),
            region: location.region.clone(),
            country: location.country.clone(),
        }
    }
}

impl From<&WeatherSnapshot> for FavoriteLocation {
    fn from(snapshot: &WeatherSnapshot) -> Self {
        Self::from(&snapshot.location)
    }
}

/// Display unit system. Persisted as a boolean where `true` means metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    pub fn is_metric(self) -> bool {
        self == UnitSystem::Metric
    }

    pub fn from_metric_flag(is_metric: bool) -> Self {
        if is_metric { UnitSystem::Metric } else { UnitSystem::Imperial }
    }

    pub fn toggled(self) -> Self {
        match self {
            UnitSystem::Metric => UnitSystem::Imperial,
            UnitSystem::Imperial => UnitSystem::Metric,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
        }
    }
}

impl std::fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for UnitSystem {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "metric" | "c" => Ok(UnitSystem::Metric),
            "imperial" | "f" => Ok(UnitSystem::Imperial),
            _ => Err(anyhow::anyhow!(
                "Unknown unit system '{value}'. Supported: metric, imperial."
            )),
        }
    }
}

//! Unit-aware formatting and the local time-of-day classification used to
//! pick a background palette.

use chrono::{NaiveDateTime, Timelike};

use crate::model::{Current, DaySummary, UnitSystem};

pub fn temperature(celsius: f64, fahrenheit: f64, units: UnitSystem) -> String {
    match units {
        UnitSystem::Metric => format!("{celsius}°C"),
        UnitSystem::Imperial => format!("{fahrenheit}°F"),
    }
}

pub fn wind_speed(kph: f64, mph: f64, units: UnitSystem) -> String {
    match units {
        UnitSystem::Metric => format!("{kph}kph"),
        UnitSystem::Imperial => format!("{mph}mph"),
    }
}

/// Label for the control that switches to the other unit system.
pub fn toggle_label(units: UnitSystem) -> &'static str {
    match units {
        UnitSystem::Metric => "Switch to Imperial",
        UnitSystem::Imperial => "Switch to Metric",
    }
}

impl Current {
    pub fn temperature(&self, units: UnitSystem) -> String {
        temperature(self.temp_c, self.temp_f, units)
    }

    pub fn feels_like(&self, units: UnitSystem) -> String {
        temperature(self.feelslike_c, self.feelslike_f, units)
    }

    pub fn wind(&self, units: UnitSystem) -> String {
        wind_speed(self.wind_kph, self.wind_mph, units)
    }
}

impl DaySummary {
    pub fn max_temperature(&self, units: UnitSystem) -> String {
        temperature(self.maxtemp_c, self.maxtemp_f, units)
    }

    pub fn min_temperature(&self, units: UnitSystem) -> String {
        temperature(self.mintemp_c, self.mintemp_f, units)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Sunrise,
    Day,
    Sunset,
    Night,
    /// Local time missing or unparsable.
    Unknown,
}

impl TimeOfDay {
    /// Classify a `YYYY-MM-DD HH:MM` local time by its hour.
    pub fn from_local_time(localtime: Option<&str>) -> Self {
        let Some(parsed) = localtime
            .and_then(|s| NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M").ok())
        else {
            return TimeOfDay::Unknown;
        };

        match parsed.hour() {
            5..=8 => TimeOfDay::Sunrise,
            9..=16 => TimeOfDay::Day,
            17..=19 => TimeOfDay::Sunset,
            _ => TimeOfDay::Night,
        }
    }

    /// Two-stop gradient, top-left to bottom-right.
    pub fn palette(self) -> [&'static str; 2] {
        match self {
            TimeOfDay::Sunrise => ["#FAD6A5", "#FFB347"],
            TimeOfDay::Day => ["#A1C4FD", "#C2E9FB"],
            TimeOfDay::Sunset => ["#FDB99B", "#CF8BF3"],
            TimeOfDay::Night => ["#283E51", "#485563"],
            TimeOfDay::Unknown => ["#4B4F55", "#2F3237"],
        }
    }
}

//! Activity records handed to the engine by the host
//!
//! Field names follow the Strava activity export (`type`, `distance`,
//! `moving_time`, ...) with explicit-unit aliases.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::raw_stream::RawStream;

/// One recorded activity with its raw telemetry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Host-side identifier (string or integer in input)
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Sport type, e.g. "Run" or "Ride"
    #[serde(rename = "type", alias = "sport_type")]
    pub sport_type: String,
    /// Activity start (UTC)
    pub start_date: DateTime<Utc>,
    /// Declared total distance (meters)
    #[serde(default, alias = "distance")]
    pub distance_m: Option<f64>,
    /// Declared moving time (seconds)
    #[serde(default, alias = "moving_time")]
    pub moving_time_s: Option<f64>,
    /// Declared elapsed time (seconds)
    #[serde(default, alias = "elapsed_time")]
    pub elapsed_time_s: Option<f64>,
    /// Declared elevation gain (meters)
    #[serde(default, alias = "total_elevation_gain")]
    pub total_elevation_gain_m: Option<f64>,
    /// Raw telemetry in any supported shape
    #[serde(default)]
    pub streams: Value,
}

impl Activity {
    /// Decode the raw telemetry, `None` if absent or unrecognizable
    pub fn stream(&self) -> Option<RawStream> {
        RawStream::from_value(&self.streams)
    }

    /// Calendar date of the activity start
    pub fn date(&self) -> NaiveDate {
        self.start_date.date_naive()
    }

    /// Case-insensitive sport type match
    pub fn is_sport(&self, sport_type: &str) -> bool {
        self.sport_type.eq_ignore_ascii_case(sport_type)
    }
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "activity id must be a string or number, got {other}"
        ))),
    }
}

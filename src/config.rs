//! Engine configuration
//!
//! Defaults reproduce the standard analysis: 1 km splits, a 10 m remainder
//! threshold, a 6 bpm cardiac-drift threshold and the five standard race
//! distances for personal records.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ComputeError;

/// Default split length (meters)
pub const DEFAULT_SPLIT_LENGTH_M: f64 = 1000.0;
/// Remainder splits at or below this distance are dropped (meters)
pub const DEFAULT_REMAINDER_THRESHOLD_M: f64 = 10.0;
/// HR rise between first and last thirds that counts as drift (bpm)
pub const DEFAULT_DRIFT_THRESHOLD_BPM: f64 = 6.0;
/// Safety-net TTL for memoized personal records (24 hours)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;
/// Number of users kept in the record cache
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// One personal-record target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceTarget {
    pub label: String,
    pub meters: f64,
}

impl DistanceTarget {
    pub fn new(label: &str, meters: f64) -> Self {
        Self {
            label: label.to_string(),
            meters,
        }
    }
}

/// Ordered table of personal-record targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistanceTable(pub Vec<DistanceTarget>);

impl Default for DistanceTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl DistanceTable {
    /// 1k, 5k, 10k, half marathon, marathon
    pub fn standard() -> Self {
        Self(vec![
            DistanceTarget::new("1k", 1000.0),
            DistanceTarget::new("5k", 5000.0),
            DistanceTarget::new("10k", 10000.0),
            DistanceTarget::new("half-marathon", 21097.0),
            DistanceTarget::new("marathon", 42195.0),
        ])
    }

    pub fn targets(&self) -> &[DistanceTarget] {
        &self.0
    }

    /// Stable identifier of the table contents, used as the table version in
    /// cache keys.
    pub fn fingerprint(&self) -> String {
        self.0
            .iter()
            .map(|t| format!("{}={}", t.label, t.meters))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn validate(&self) -> Result<(), ComputeError> {
        if self.0.is_empty() {
            return Err(ComputeError::InvalidConfig(
                "distance table must not be empty".to_string(),
            ));
        }
        for (i, target) in self.0.iter().enumerate() {
            if !(target.meters.is_finite() && target.meters > 0.0) {
                return Err(ComputeError::InvalidConfig(format!(
                    "distance '{}' must be positive, got {}",
                    target.label, target.meters
                )));
            }
            if self.0[..i].iter().any(|t| t.label == target.label) {
                return Err(ComputeError::InvalidConfig(format!(
                    "duplicate distance label '{}'",
                    target.label
                )));
            }
        }
        Ok(())
    }
}

/// Analysis settings shared by every stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Split length (meters)
    pub split_length_m: f64,
    /// Materiality threshold for the trailing partial split (meters)
    pub remainder_threshold_m: f64,
    /// Cardiac drift threshold (bpm)
    pub drift_threshold_bpm: f64,
    /// Personal-record targets
    pub distances: DistanceTable,
    /// Activity types eligible for personal records (case-insensitive)
    pub record_sport_types: Vec<String>,
    /// Optional cap on activities scanned per target
    pub max_record_candidates: Option<usize>,
    /// Record cache time-to-live (seconds)
    pub cache_ttl_secs: u64,
    /// Record cache capacity (entries)
    pub cache_capacity: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            split_length_m: DEFAULT_SPLIT_LENGTH_M,
            remainder_threshold_m: DEFAULT_REMAINDER_THRESHOLD_M,
            drift_threshold_bpm: DEFAULT_DRIFT_THRESHOLD_BPM,
            distances: DistanceTable::standard(),
            record_sport_types: vec!["Run".to_string()],
            max_record_candidates: None,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl AnalysisConfig {
    /// Reject settings that indicate a programming error
    pub fn validate(&self) -> Result<(), ComputeError> {
        validate_split_length(self.split_length_m)?;
        if !(self.remainder_threshold_m.is_finite() && self.remainder_threshold_m >= 0.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "remainder threshold must be non-negative, got {}",
                self.remainder_threshold_m
            )));
        }
        if !(self.drift_threshold_bpm.is_finite() && self.drift_threshold_bpm >= 0.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "drift threshold must be non-negative, got {}",
                self.drift_threshold_bpm
            )));
        }
        if self.record_sport_types.is_empty() {
            return Err(ComputeError::InvalidConfig(
                "at least one record sport type is required".to_string(),
            ));
        }
        self.distances.validate()
    }

    /// Load and validate a configuration from JSON text
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn from_file(path: &Path) -> Result<Self, ComputeError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

pub(crate) fn validate_split_length(split_length_m: f64) -> Result<(), ComputeError> {
    if split_length_m.is_finite() && split_length_m > 0.0 {
        Ok(())
    } else {
        Err(ComputeError::InvalidConfig(format!(
            "split length must be a positive number of meters, got {split_length_m}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.distances.targets().len(), 5);
        assert_eq!(config.distances.targets()[3].meters, 21097.0);
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = AnalysisConfig::from_json(r#"{ "split_length_m": 1609.34 }"#).unwrap();
        assert_eq!(config.split_length_m, 1609.34);
        assert_eq!(config.drift_threshold_bpm, DEFAULT_DRIFT_THRESHOLD_BPM);
    }

    #[test]
    fn test_rejects_bad_split_length() {
        assert!(AnalysisConfig::from_json(r#"{ "split_length_m": -5 }"#).is_err());
        assert!(AnalysisConfig::from_json(r#"{ "split_length_m": 0 }"#).is_err());
    }

    #[test]
    fn test_rejects_bad_distance_table() {
        let dup = r#"{ "distances": [ {"label": "5k", "meters": 5000}, {"label": "5k", "meters": 5001} ] }"#;
        assert!(AnalysisConfig::from_json(dup).is_err());

        let empty = r#"{ "distances": [] }"#;
        assert!(AnalysisConfig::from_json(empty).is_err());

        let negative = r#"{ "distances": [ {"label": "x", "meters": -1} ] }"#;
        assert!(AnalysisConfig::from_json(negative).is_err());
    }

    #[test]
    fn test_fingerprint_tracks_table_contents() {
        let standard = DistanceTable::standard();
        let mut custom = DistanceTable::standard();
        custom.0.push(DistanceTarget::new("mile", 1609.34));
        assert_ne!(standard.fingerprint(), custom.fingerprint());
        assert_eq!(standard.fingerprint(), DistanceTable::default().fingerprint());
    }
}

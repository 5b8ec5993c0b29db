//! Core types for the Stride Flux engine
//!
//! This module defines the data structures that flow between the stages of the
//! engine: the normalized stream, split records, session summaries and
//! personal records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Parallel, equal-length telemetry channels for one activity.
///
/// Every channel has one entry per original sample index. Missing readings are
/// `None`, never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedStream {
    /// Cumulative distance (meters)
    pub distance: Vec<Option<f64>>,
    /// Elapsed time (seconds)
    pub time: Vec<Option<f64>>,
    /// Heart rate (bpm)
    pub heartrate: Vec<Option<f64>>,
    /// Power (watts)
    pub watts: Vec<Option<f64>>,
    /// Altitude (meters)
    pub altitude: Vec<Option<f64>>,
    /// Point-to-point pace (seconds per km), derived
    pub pace: Vec<Option<f64>>,
}

impl NormalizedStream {
    /// Stream with no samples
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.distance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distance.is_empty()
    }

    /// Distance and time at `idx` when both are present
    pub fn position(&self, idx: usize) -> Option<(f64, f64)> {
        match (self.distance.get(idx), self.time.get(idx)) {
            (Some(Some(d)), Some(Some(t))) => Some((*d, *t)),
            _ => None,
        }
    }

    /// Samples usable as window anchors: both distance and time present, in
    /// non-decreasing order of distance and time.
    ///
    /// When a sample runs backwards against the preceding anchor, the pair is
    /// treated as a gap: the sample and that anchor are both dropped, and
    /// later samples are compared with the anchor before them. A single
    /// spike or glitch therefore costs two samples instead of the rest of
    /// the stream. A spike on the very last sample has no successor to
    /// expose it and is kept.
    pub fn anchor_points(&self) -> Vec<AnchorPoint> {
        let mut points: Vec<AnchorPoint> = Vec::with_capacity(self.len());
        for idx in 0..self.len() {
            let Some((distance_m, time_s)) = self.position(idx) else {
                continue;
            };
            if let Some(last) = points.last() {
                if distance_m < last.distance_m || time_s < last.time_s {
                    points.pop();
                    continue;
                }
            }
            points.push(AnchorPoint {
                index: idx,
                distance_m,
                time_s,
            });
        }
        points
    }
}

/// A sample with both distance and time present
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorPoint {
    /// Index into the normalized stream
    pub index: usize,
    pub distance_m: f64,
    pub time_s: f64,
}

/// One fixed-distance (or final partial) segment of a stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    /// 1-based position in the split list
    pub index: usize,
    /// First sample index included in the split
    pub start_sample: usize,
    /// Last sample index included in the split
    pub end_sample: usize,
    /// Covered distance (km)
    pub distance_km: f64,
    /// Elapsed time (seconds)
    pub time_s: f64,
    /// Pace (seconds per km), absent when distance or time is not positive
    pub pace_sec_per_km: Option<f64>,
    /// Average heart rate over positive readings
    pub avg_hr: Option<f64>,
    /// Average power over positive readings
    pub avg_power: Option<f64>,
    /// Total ascent within the split (meters)
    pub elevation_gain_m: Option<f64>,
    /// True for the trailing remainder split
    pub partial: bool,
}

/// Min / average / max over a set of readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
    /// Number of readings the statistics were computed from
    pub samples: usize,
}

/// How the overall pace was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaceSource {
    /// Δtime / Δdistance between the first and last anchored samples
    Anchors,
    /// Mean of point-to-point paces (fallback)
    PointAverage,
}

/// Session-level pace estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaceEstimate {
    pub sec_per_km: f64,
    pub source: PaceSource,
}

/// Reference to a split singled out in a summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRef {
    /// 1-based split index
    pub index: usize,
    pub pace_sec_per_km: f64,
}

/// Heart-rate rise between the first and last thirds of a session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CardiacDrift {
    /// Number of splits in each compared third
    pub third_size: usize,
    pub first_third_avg_hr: f64,
    pub last_third_avg_hr: f64,
    /// `last_third_avg_hr - first_third_avg_hr` (bpm, may be negative)
    pub delta_bpm: f64,
    /// Whether the delta reached the drift threshold
    pub detected: bool,
}

/// Structured summary of one activity stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    /// Number of samples in the normalized stream
    pub sample_count: usize,
    /// Distance between the first and last anchored samples (meters)
    pub total_distance_m: Option<f64>,
    /// Time between the first and last anchored samples (seconds)
    pub total_time_s: Option<f64>,
    pub overall_pace: Option<PaceEstimate>,
    pub point_pace: Option<MetricStats>,
    pub heart_rate: Option<MetricStats>,
    pub power: Option<MetricStats>,
    pub altitude: Option<MetricStats>,
    /// Total ascent (meters)
    pub elevation_gain_m: Option<f64>,
    pub splits: Vec<Split>,
    pub fastest_split: Option<SplitRef>,
    pub slowest_split: Option<SplitRef>,
    pub cardiac_drift: Option<CardiacDrift>,
}

/// Best qualifying window inside one activity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowMatch {
    /// First sample index of the window
    pub start_sample: usize,
    /// Last sample index of the window
    pub end_sample: usize,
    /// Distance covered by the window (meters)
    pub distance_m: f64,
    /// Elapsed time (seconds)
    pub time_s: f64,
}

/// Personal record for one target distance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalRecord {
    pub distance_label: String,
    pub distance_m: f64,
    /// Fastest elapsed time covering at least `distance_m`; `None` if no activity qualifies
    pub best_time_s: Option<f64>,
    pub source_activity_id: Option<String>,
    pub activity_name: Option<String>,
    pub achieved_on: Option<NaiveDate>,
}

impl PersonalRecord {
    /// Record with no qualifying activity
    pub fn unset(label: &str, distance_m: f64) -> Self {
        Self {
            distance_label: label.to_string(),
            distance_m,
            best_time_s: None,
            source_activity_id: None,
            activity_name: None,
            achieved_on: None,
        }
    }

    /// Average pace of the record (seconds per km)
    pub fn pace_sec_per_km(&self) -> Option<f64> {
        match self.best_time_s {
            Some(t) if t > 0.0 && self.distance_m > 0.0 => Some(t / (self.distance_m / 1000.0)),
            _ => None,
        }
    }
}

/// Personal records for every entry of a distance table, in table order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalRecords {
    pub records: Vec<PersonalRecord>,
    /// Number of distinct activities that passed the sport-type filter
    pub activities_considered: usize,
}

impl PersonalRecords {
    /// Look up a record by distance label (e.g. `"5k"`)
    pub fn get(&self, label: &str) -> Option<&PersonalRecord> {
        self.records.iter().find(|r| r.distance_label == label)
    }
}

/// Totals for one sport type within a period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SportTotals {
    pub sport_type: String,
    pub activities: usize,
    pub distance_m: f64,
    pub moving_time_s: f64,
    pub elevation_gain_m: f64,
}

/// Brief listing entry for an activity inside a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodActivity {
    pub id: String,
    pub name: String,
    pub sport_type: String,
    pub date: NaiveDate,
    pub distance_km: f64,
    pub moving_time_s: f64,
    pub elevation_gain_m: f64,
}

/// Aggregate over activities in a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub activity_count: usize,
    pub total_distance_m: f64,
    pub total_moving_time_s: f64,
    pub total_elevation_gain_m: f64,
    /// Per sport type, sorted by sport type name
    pub by_sport: Vec<SportTotals>,
    /// Activities in ascending start order
    pub activities: Vec<PeriodActivity>,
}

/// Producer metadata attached to encoded payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Encoded single-activity analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisPayload {
    pub producer: Producer,
    pub computed_at_utc: String,
    pub split_length_m: f64,
    pub summary: ActivitySummary,
}

/// Encoded personal-record set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordsPayload {
    pub producer: Producer,
    pub computed_at_utc: String,
    /// Distance-table fingerprint the records were computed against
    pub distance_table: String,
    pub personal_records: PersonalRecords,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(points: &[(Option<f64>, Option<f64>)]) -> NormalizedStream {
        let n = points.len();
        NormalizedStream {
            distance: points.iter().map(|p| p.0).collect(),
            time: points.iter().map(|p| p.1).collect(),
            heartrate: vec![None; n],
            watts: vec![None; n],
            altitude: vec![None; n],
            pace: vec![None; n],
        }
    }

    #[test]
    fn test_anchor_points_skip_gaps_and_regressions() {
        let s = stream(&[
            (Some(0.0), Some(0.0)),
            (None, Some(5.0)),
            (Some(50.0), Some(10.0)),
            (Some(40.0), Some(12.0)),
            (Some(100.0), Some(20.0)),
        ]);

        // index 3 runs backwards: it and index 2 become a gap
        let anchors = s.anchor_points();
        let indices: Vec<usize> = anchors.iter().map(|a| a.index).collect();
        assert_eq!(indices, vec![0, 4]);
    }

    #[test]
    fn test_anchor_points_recover_after_glitch() {
        let mut points: Vec<(Option<f64>, Option<f64>)> = (0..20)
            .map(|i| (Some(i as f64 * 10.0), Some(i as f64 * 3.0)))
            .collect();
        points[5].1 = Some(1e6);

        let anchors = stream(&points).anchor_points();
        assert_eq!(anchors.len(), 18);
        assert!(anchors.iter().all(|a| a.index != 5 && a.index != 6));
        assert_eq!(anchors.last().map(|a| a.index), Some(19));
    }

    #[test]
    fn test_record_pace() {
        let mut record = PersonalRecord::unset("5k", 5000.0);
        assert!(record.pace_sec_per_km().is_none());

        record.best_time_s = Some(1500.0);
        assert!((record.pace_sec_per_km().unwrap() - 300.0).abs() < 1e-9);
    }
}

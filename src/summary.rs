//! Session summaries
//!
//! Combines a normalized stream with its splits into an [`ActivitySummary`]:
//! overall pace, channel statistics, fastest/slowest split and cardiac drift.

use crate::config::{AnalysisConfig, DEFAULT_DRIFT_THRESHOLD_BPM};
use crate::stats::{ascent, positive_stats, present_stats};
use crate::types::{
    ActivitySummary, CardiacDrift, NormalizedStream, PaceEstimate, PaceSource, Split, SplitRef,
};

/// Minimum number of splits before drift is evaluated
pub const MIN_SPLITS_FOR_DRIFT: usize = 3;

/// Analyzer producing session-level summaries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryAnalyzer {
    drift_threshold_bpm: f64,
}

impl Default for SummaryAnalyzer {
    fn default() -> Self {
        Self {
            drift_threshold_bpm: DEFAULT_DRIFT_THRESHOLD_BPM,
        }
    }
}

impl SummaryAnalyzer {
    pub fn new(drift_threshold_bpm: f64) -> Self {
        Self {
            drift_threshold_bpm: drift_threshold_bpm.max(0.0),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.drift_threshold_bpm)
    }

    /// Summarize a stream and the splits computed from it
    pub fn summarize(&self, stream: &NormalizedStream, splits: Vec<Split>) -> ActivitySummary {
        let span = anchor_span(stream);
        let point_pace = positive_stats(&stream.pace);

        let overall_pace = Self::overall_pace(stream);
        let fastest_split = Self::fastest_split(&splits);
        let slowest_split = Self::slowest_split(&splits);
        let cardiac_drift = self.cardiac_drift(&splits);

        ActivitySummary {
            sample_count: stream.len(),
            total_distance_m: span.map(|(d, _)| d),
            total_time_s: span.map(|(_, t)| t),
            overall_pace,
            point_pace,
            heart_rate: positive_stats(&stream.heartrate),
            power: positive_stats(&stream.watts),
            altitude: present_stats(&stream.altitude),
            elevation_gain_m: ascent(&stream.altitude),
            splits,
            fastest_split,
            slowest_split,
            cardiac_drift,
        }
    }

    /// Overall pace from the first and last samples carrying both distance
    /// and time; falls back to the mean point pace when no such pair spans a
    /// positive distance and time.
    pub fn overall_pace(stream: &NormalizedStream) -> Option<PaceEstimate> {
        if let Some((distance_m, time_s)) = anchor_span(stream) {
            if distance_m > 0.0 && time_s > 0.0 {
                return Some(PaceEstimate {
                    sec_per_km: time_s / (distance_m / 1000.0),
                    source: PaceSource::Anchors,
                });
            }
        }

        positive_stats(&stream.pace).map(|stats| PaceEstimate {
            sec_per_km: stats.avg,
            source: PaceSource::PointAverage,
        })
    }

    /// Split with the lowest defined pace; ties go to the earliest split
    pub fn fastest_split(splits: &[Split]) -> Option<SplitRef> {
        pick_split(splits, |candidate, best| candidate < best)
    }

    /// Split with the highest defined pace; ties go to the earliest split
    pub fn slowest_split(splits: &[Split]) -> Option<SplitRef> {
        pick_split(splits, |candidate, best| candidate > best)
    }

    /// Compare average HR of the first and last thirds of the splits.
    ///
    /// Thirds are `max(1, floor(count / 3))` splits each, so with counts not
    /// divisible by three the middle segment absorbs the remainder. Returns
    /// `None` with fewer than three splits or when either third has no HR.
    pub fn cardiac_drift(&self, splits: &[Split]) -> Option<CardiacDrift> {
        let count = splits.len();
        if count < MIN_SPLITS_FOR_DRIFT {
            return None;
        }
        let third = (count / 3).max(1);

        let first = mean_hr(&splits[..third])?;
        let last = mean_hr(&splits[count - third..])?;
        let delta = last - first;

        if delta >= self.drift_threshold_bpm {
            log::debug!("cardiac drift of {delta:.1} bpm across {count} splits");
        }

        Some(CardiacDrift {
            third_size: third,
            first_third_avg_hr: first,
            last_third_avg_hr: last,
            delta_bpm: delta,
            detected: delta >= self.drift_threshold_bpm,
        })
    }
}

/// Distance and time between the first and last samples that have both
fn anchor_span(stream: &NormalizedStream) -> Option<(f64, f64)> {
    let first = (0..stream.len()).find(|&i| stream.position(i).is_some())?;
    let last = (first..stream.len())
        .rev()
        .find(|&i| stream.position(i).is_some())?;
    if last <= first {
        return None;
    }
    let (d0, t0) = stream.position(first)?;
    let (d1, t1) = stream.position(last)?;
    Some((d1 - d0, t1 - t0))
}

fn pick_split(splits: &[Split], better: impl Fn(f64, f64) -> bool) -> Option<SplitRef> {
    let mut best: Option<SplitRef> = None;
    for split in splits {
        let Some(pace) = split.pace_sec_per_km.filter(|p| *p > 0.0) else {
            continue;
        };
        match best {
            Some(current) if !better(pace, current.pace_sec_per_km) => {}
            _ => {
                best = Some(SplitRef {
                    index: split.index,
                    pace_sec_per_km: pace,
                })
            }
        }
    }
    best
}

fn mean_hr(splits: &[Split]) -> Option<f64> {
    let values: Vec<f64> = splits.iter().filter_map(|s| s.avg_hr).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::StreamNormalizer;
    use crate::splits::SplitSegmenter;
    use serde_json::json;

    fn split(index: usize, pace: Option<f64>, hr: Option<f64>) -> Split {
        Split {
            index,
            start_sample: 0,
            end_sample: 1,
            distance_km: 1.0,
            time_s: pace.unwrap_or(0.0),
            pace_sec_per_km: pace,
            avg_hr: hr,
            avg_power: None,
            elevation_gain_m: None,
            partial: false,
        }
    }

    #[test]
    fn test_overall_pace_uses_valid_anchors() {
        let stream = StreamNormalizer::normalize_value(&json!({
            "distance": [null, 0, 500, 1000, 2000],
            "time": [0, 0, 100, 400, null]
        }));

        let pace = SummaryAnalyzer::overall_pace(&stream).unwrap();
        assert_eq!(pace.source, PaceSource::Anchors);
        // anchors are index 1 and index 3
        assert!((pace.sec_per_km - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_overall_pace_is_not_skewed_by_spikes() {
        let stream = StreamNormalizer::normalize_value(&json!({
            "distance": [0, 1, 1000],
            "time": [0, 100, 300]
        }));

        let pace = SummaryAnalyzer::overall_pace(&stream).unwrap();
        assert!((pace.sec_per_km - 300.0).abs() < 1e-9);

        let point = positive_stats(&stream.pace).unwrap();
        assert!(point.avg > 1000.0);
    }

    #[test]
    fn test_no_anchor_pair_gives_no_pace() {
        let stream = StreamNormalizer::normalize_value(&json!({
            "distance": [0, null, null],
            "time": [null, 5, 10]
        }));
        assert!(SummaryAnalyzer::overall_pace(&stream).is_none());
    }

    #[test]
    fn test_fastest_and_slowest_ties_go_first() {
        let splits = vec![
            split(1, Some(300.0), None),
            split(2, Some(280.0), None),
            split(3, None, None),
            split(4, Some(280.0), None),
            split(5, Some(320.0), None),
            split(6, Some(320.0), None),
        ];

        let fastest = SummaryAnalyzer::fastest_split(&splits).unwrap();
        let slowest = SummaryAnalyzer::slowest_split(&splits).unwrap();
        assert_eq!(fastest.index, 2);
        assert_eq!(slowest.index, 5);
        assert!(SummaryAnalyzer::fastest_split(&[split(1, None, None)]).is_none());
    }

    #[test]
    fn test_cardiac_drift_detected() {
        let splits = vec![
            split(1, Some(300.0), Some(140.0)),
            split(2, Some(300.0), Some(142.0)),
            split(3, Some(300.0), Some(146.0)),
            split(4, Some(300.0), Some(148.0)),
            split(5, Some(300.0), Some(147.0)),
            split(6, Some(300.0), Some(149.0)),
        ];

        let drift = SummaryAnalyzer::default().cardiac_drift(&splits).unwrap();
        assert_eq!(drift.third_size, 2);
        assert!((drift.first_third_avg_hr - 141.0).abs() < 1e-9);
        assert!((drift.last_third_avg_hr - 148.0).abs() < 1e-9);
        assert!((drift.delta_bpm - 7.0).abs() < 1e-9);
        assert!(drift.detected);
    }

    #[test]
    fn test_cardiac_drift_truncating_thirds() {
        // 5 splits: thirds of 1, middle of 3
        let splits = vec![
            split(1, Some(300.0), Some(150.0)),
            split(2, Some(300.0), Some(170.0)),
            split(3, Some(300.0), Some(170.0)),
            split(4, Some(300.0), Some(170.0)),
            split(5, Some(300.0), Some(155.0)),
        ];

        let drift = SummaryAnalyzer::default().cardiac_drift(&splits).unwrap();
        assert_eq!(drift.third_size, 1);
        assert!((drift.delta_bpm - 5.0).abs() < 1e-9);
        assert!(!drift.detected);
    }

    #[test]
    fn test_cardiac_drift_requires_three_splits_and_hr() {
        let analyzer = SummaryAnalyzer::default();
        let two = vec![split(1, None, Some(140.0)), split(2, None, Some(160.0))];
        assert!(analyzer.cardiac_drift(&two).is_none());

        let no_hr_start = vec![
            split(1, None, None),
            split(2, None, Some(150.0)),
            split(3, None, Some(160.0)),
        ];
        assert!(analyzer.cardiac_drift(&no_hr_start).is_none());
    }

    #[test]
    fn test_summarize_end_to_end() {
        let stream = StreamNormalizer::normalize_value(&json!([
            { "distance": 0, "time": 0, "heartrate": 130, "watts": 200, "altitude": 50 },
            { "distance": 500, "time": 150, "heartrate": 140, "watts": 0, "altitude": 55 },
            { "distance": 1000, "time": 300, "heartrate": 150, "watts": 220, "altitude": 53 },
            { "distance": 1500, "time": 500, "heartrate": 160, "watts": 240, "altitude": 60 }
        ]));
        let splits = SplitSegmenter::default().segment(&stream);
        let summary = SummaryAnalyzer::default().summarize(&stream, splits);

        assert_eq!(summary.sample_count, 4);
        assert_eq!(summary.total_distance_m, Some(1500.0));
        let pace = summary.overall_pace.unwrap();
        assert!((pace.sec_per_km - 500.0 / 1.5).abs() < 1e-9);

        let hr = summary.heart_rate.unwrap();
        assert_eq!((hr.min, hr.max), (130.0, 160.0));
        let power = summary.power.unwrap();
        assert_eq!(power.samples, 3);
        assert!((summary.elevation_gain_m.unwrap() - 12.0).abs() < 1e-9);

        assert_eq!(summary.splits.len(), 2);
        assert_eq!(summary.fastest_split.unwrap().index, 1);
        assert_eq!(summary.slowest_split.unwrap().index, 2);
        assert!(summary.cardiac_drift.is_none());
    }
}

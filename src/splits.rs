//! Split segmentation
//!
//! Cuts a normalized stream into fixed-distance splits. A split closes at the
//! last sample still within the current distance mark; the next split starts
//! from that same boundary sample, so consecutive splits share an endpoint and
//! their distances add up to the session distance.

use crate::config::{
    validate_split_length, AnalysisConfig, DEFAULT_REMAINDER_THRESHOLD_M, DEFAULT_SPLIT_LENGTH_M,
};
use crate::error::ComputeError;
use crate::stats::{ascent, positive_mean};
use crate::types::{NormalizedStream, Split};

/// Segmenter for fixed-distance splits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitSegmenter {
    split_length_m: f64,
    remainder_threshold_m: f64,
}

impl Default for SplitSegmenter {
    fn default() -> Self {
        Self {
            split_length_m: DEFAULT_SPLIT_LENGTH_M,
            remainder_threshold_m: DEFAULT_REMAINDER_THRESHOLD_M,
        }
    }
}

impl SplitSegmenter {
    /// Create a segmenter; the split length must be a positive number of meters
    pub fn new(split_length_m: f64) -> Result<Self, ComputeError> {
        validate_split_length(split_length_m)?;
        Ok(Self {
            split_length_m,
            ..Self::default()
        })
    }

    /// Create a segmenter from validated configuration
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            split_length_m: config.split_length_m,
            remainder_threshold_m: config.remainder_threshold_m,
        })
    }

    /// Override the minimum distance a trailing partial split must exceed
    pub fn with_remainder_threshold(mut self, meters: f64) -> Self {
        self.remainder_threshold_m = meters.max(0.0);
        self
    }

    pub fn split_length_m(&self) -> f64 {
        self.split_length_m
    }

    /// Segment a stream into splits, in ascending distance order.
    ///
    /// Streams with fewer than two samples, or without any distance reading,
    /// yield no splits.
    pub fn segment(&self, stream: &NormalizedStream) -> Vec<Split> {
        let n = stream.len();
        if n < 2 {
            return Vec::new();
        }
        let Some(origin) = stream.distance.iter().flatten().copied().next() else {
            return Vec::new();
        };

        let mut splits: Vec<Split> = Vec::new();
        let mut start = 0;
        let mut mark = origin + self.split_length_m;

        for i in 0..n {
            let Some(d) = stream.distance[i] else {
                continue;
            };
            if d <= mark {
                continue;
            }

            let end = i.saturating_sub(1);
            if let Some(split) = build_split(stream, start, end, splits.len() + 1, false) {
                splits.push(split);
            }
            start = end;
            mark += self.split_length_m;
        }

        let last_valid = (start..n).rev().find(|&k| stream.position(k).is_some());
        if let Some(last) = last_valid.filter(|&last| last > start) {
            if let Some(split) = build_split(stream, start, last, splits.len() + 1, true) {
                if split.distance_km * 1000.0 > self.remainder_threshold_m {
                    splits.push(split);
                } else {
                    log::trace!(
                        "dropping {:.1} m remainder below materiality threshold",
                        split.distance_km * 1000.0
                    );
                }
            }
        }

        log::debug!(
            "segmented {n} samples into {} splits of {} m",
            splits.len(),
            self.split_length_m
        );
        splits
    }
}

/// Build a split over `[start, end]` after trimming absent distance/time
/// entries from both ends. Ranges that collapse to one sample yield `None`.
fn build_split(
    stream: &NormalizedStream,
    mut start: usize,
    mut end: usize,
    index: usize,
    partial: bool,
) -> Option<Split> {
    while start < end && stream.position(start).is_none() {
        start += 1;
    }
    while end > start && stream.position(end).is_none() {
        end -= 1;
    }
    if start >= end {
        return None;
    }
    let ((d0, t0), (d1, t1)) = (stream.position(start)?, stream.position(end)?);

    let distance_km = (d1 - d0) / 1000.0;
    let time_s = t1 - t0;
    let pace_sec_per_km = if distance_km > 0.0 && time_s > 0.0 {
        Some(time_s / distance_km)
    } else {
        None
    };

    Some(Split {
        index,
        start_sample: start,
        end_sample: end,
        distance_km,
        time_s,
        pace_sec_per_km,
        avg_hr: positive_mean(&stream.heartrate[start..=end]),
        avg_power: positive_mean(&stream.watts[start..=end]),
        elevation_gain_m: ascent(&stream.altitude[start..=end]),
        partial,
    })
}

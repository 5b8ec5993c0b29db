//! Reductions over sparse channels

use crate::types::MetricStats;

/// Mean of the strictly positive readings. Zero and negative values are
/// sensor artifacts and are skipped along with absent readings.
pub(crate) fn positive_mean(values: &[Option<f64>]) -> Option<f64> {
    positive_stats(values).map(|s| s.avg)
}

/// Min/avg/max of the strictly positive readings
pub(crate) fn positive_stats(values: &[Option<f64>]) -> Option<MetricStats> {
    stats(values.iter().flatten().copied().filter(|v| *v > 0.0))
}

/// Min/avg/max of all present readings
pub(crate) fn present_stats(values: &[Option<f64>]) -> Option<MetricStats> {
    stats(values.iter().flatten().copied())
}

/// Sum of positive deltas between consecutive present readings
pub(crate) fn ascent(altitude: &[Option<f64>]) -> Option<f64> {
    let mut present = altitude.iter().flatten().copied();
    let mut previous = present.next()?;
    let mut gain = 0.0;
    let mut steps = 0;
    for value in present {
        if value > previous {
            gain += value - previous;
        }
        previous = value;
        steps += 1;
    }
    (steps > 0).then_some(gain)
}

fn stats(values: impl Iterator<Item = f64>) -> Option<MetricStats> {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for value in values {
        count += 1;
        sum += value;
        min = min.min(value);
        max = max.max(value);
    }
    if count == 0 {
        return None;
    }
    Some(MetricStats {
        min,
        avg: sum / count as f64,
        max,
        samples: count,
    })
}

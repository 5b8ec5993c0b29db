//! Stream normalization
//!
//! This module turns a decoded raw stream into a [`NormalizedStream`]:
//! - every channel padded with absent markers to the longest channel
//! - point-to-point pace derived from consecutive distance/time pairs
//! - empty output for null, empty, or unrecognizable input

use serde_json::Value;

use crate::schema::{RawChannels, RawStream};
use crate::types::NormalizedStream;

/// Normalizer for converting raw streams to parallel channels
pub struct StreamNormalizer;

impl StreamNormalizer {
    /// Normalize a decoded raw stream
    pub fn normalize(raw: &RawStream) -> NormalizedStream {
        let channels = match raw {
            RawStream::Samples(samples) => RawChannels {
                distance: samples.iter().map(|s| s.distance).collect(),
                time: samples.iter().map(|s| s.time).collect(),
                heartrate: samples.iter().map(|s| s.heartrate).collect(),
                watts: samples.iter().map(|s| s.watts).collect(),
                altitude: samples.iter().map(|s| s.altitude).collect(),
            },
            RawStream::Channels(channels) => channels.clone(),
        };

        let n = channels.max_len();
        if n == 0 || !has_readings(&channels) {
            return NormalizedStream::empty();
        }

        let distance = pad(channels.distance, n);
        let time = pad(channels.time, n);
        let pace = derive_pace(&distance, &time);

        log::debug!("normalized stream with {n} samples");

        NormalizedStream {
            distance,
            time,
            heartrate: pad(channels.heartrate, n),
            watts: pad(channels.watts, n),
            altitude: pad(channels.altitude, n),
            pace,
        }
    }

    /// Detect the shape of a JSON value and normalize it
    pub fn normalize_value(value: &Value) -> NormalizedStream {
        match RawStream::from_value(value) {
            Some(raw) => Self::normalize(&raw),
            None => NormalizedStream::empty(),
        }
    }

    /// Parse stream JSON text and normalize it.
    ///
    /// Text that is not JSON is an error; JSON of an unsupported shape
    /// normalizes to an empty stream.
    pub fn normalize_json(text: &str) -> Result<NormalizedStream, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::normalize_value(&value))
    }
}

fn has_readings(channels: &RawChannels) -> bool {
    [
        &channels.distance,
        &channels.time,
        &channels.heartrate,
        &channels.watts,
        &channels.altitude,
    ]
    .iter()
    .any(|channel| channel.iter().any(Option::is_some))
}

fn pad(mut values: Vec<Option<f64>>, len: usize) -> Vec<Option<f64>> {
    values.resize(len, None);
    values
}

/// Seconds per km between consecutive samples; absent at index 0, across
/// gaps, and wherever either delta is not strictly positive.
fn derive_pace(distance: &[Option<f64>], time: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut pace = Vec::with_capacity(distance.len());
    for i in 0..distance.len() {
        if i == 0 {
            pace.push(None);
            continue;
        }
        let value = match (distance[i - 1], distance[i], time[i - 1], time[i]) {
            (Some(d0), Some(d1), Some(t0), Some(t1)) => {
                let delta_m = d1 - d0;
                let delta_s = t1 - t0;
                if delta_m > 0.0 && delta_s > 0.0 {
                    Some(delta_s / (delta_m / 1000.0))
                } else {
                    None
                }
            }
            _ => None,
        };
        pace.push(value);
    }
    pace
}

//! Raw telemetry stream shapes
//!
//! Streams arrive in one of several encodings:
//! - an ordered list of per-sample objects (`[{ "distance": .., "time": .. }, ..]`)
//! - a mapping from channel name to values, either flat (`{ "time": [..] }`)
//!   or wrapped (`{ "time": { "data": [..] } }`)
//! - a list of typed channels (`[{ "type": "time", "data": [..] }, ..]`)
//!
//! All shape detection happens in [`RawStream::from_value`]; everything
//! downstream works on the decoded variants.

use serde_json::{Map, Value};

/// Channel aliases accepted for heart rate
const HEARTRATE_KEYS: &[&str] = &["heartrate", "heart_rate"];
/// Channel aliases accepted for power
const WATTS_KEYS: &[&str] = &["watts", "power"];

/// One decoded telemetry point
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawSample {
    pub distance: Option<f64>,
    pub time: Option<f64>,
    pub heartrate: Option<f64>,
    pub watts: Option<f64>,
    pub altitude: Option<f64>,
}

impl RawSample {
    /// Decode a per-sample object, tolerating missing or non-numeric fields
    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            distance: lookup(map, &["distance"]),
            time: lookup(map, &["time"]),
            heartrate: lookup(map, HEARTRATE_KEYS),
            watts: lookup(map, WATTS_KEYS),
            altitude: lookup(map, &["altitude"]),
        }
    }
}

/// Channel-keyed stream with decoded values (channels may differ in length)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawChannels {
    pub distance: Vec<Option<f64>>,
    pub time: Vec<Option<f64>>,
    pub heartrate: Vec<Option<f64>>,
    pub watts: Vec<Option<f64>>,
    pub altitude: Vec<Option<f64>>,
}

impl RawChannels {
    fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            distance: channel(map, &["distance"]),
            time: channel(map, &["time"]),
            heartrate: channel(map, HEARTRATE_KEYS),
            watts: channel(map, WATTS_KEYS),
            altitude: channel(map, &["altitude"]),
        }
    }

    /// Length of the longest channel
    pub fn max_len(&self) -> usize {
        [
            self.distance.len(),
            self.time.len(),
            self.heartrate.len(),
            self.watts.len(),
            self.altitude.len(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// Raw stream in one of the supported shapes
#[derive(Debug, Clone, PartialEq)]
pub enum RawStream {
    /// Ordered per-sample records
    Samples(Vec<RawSample>),
    /// Per-channel value sequences
    Channels(RawChannels),
}

impl RawStream {
    /// Detect the shape of a JSON value and decode it.
    ///
    /// Returns `None` for null, empty, or unrecognizable input; callers treat
    /// that as an empty stream.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            // Streams persisted as a JSON-encoded string column
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(inner) if !inner.is_string() => Self::from_value(&inner),
                _ => {
                    log::warn!("stream string is not JSON; treating as empty");
                    None
                }
            },
            Value::Array(items) => Self::from_array(items),
            Value::Object(map) => {
                if map.is_empty() {
                    return None;
                }
                log::debug!("detected channel-keyed stream ({} keys)", map.len());
                Some(RawStream::Channels(RawChannels::from_map(map)))
            }
            _ => {
                log::warn!("unsupported stream encoding; treating as empty");
                None
            }
        }
    }

    /// Parse and decode stream JSON text
    pub fn from_json(text: &str) -> Result<Option<Self>, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(&value))
    }

    fn from_array(items: &[Value]) -> Option<Self> {
        let first = items.first()?.as_object()?;

        if first.contains_key("distance") || first.contains_key("time") {
            log::debug!("detected per-sample stream ({} samples)", items.len());
            let samples = items
                .iter()
                .map(|item| match item {
                    Value::Object(map) => RawSample::from_map(map),
                    _ => RawSample::default(),
                })
                .collect();
            return Some(RawStream::Samples(samples));
        }

        if first.contains_key("type") && first.contains_key("data") {
            log::debug!("detected typed channel list ({} channels)", items.len());
            let mut keyed = Map::new();
            for item in items {
                let Some(obj) = item.as_object() else {
                    continue;
                };
                if let (Some(Value::String(kind)), Some(data)) = (obj.get("type"), obj.get("data")) {
                    keyed.entry(kind.clone()).or_insert_with(|| data.clone());
                }
            }
            return Some(RawStream::Channels(RawChannels::from_map(&keyed)));
        }

        log::warn!("array stream without distance/time samples; treating as empty");
        None
    }
}

/// Decode a scalar reading: numbers and numeric strings are accepted,
/// everything else (including non-finite values) is absent.
pub fn decode_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn lookup(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null())
        .and_then(decode_number)
}

fn channel(map: &Map<String, Value>, keys: &[&str]) -> Vec<Option<f64>> {
    let Some(raw) = keys.iter().filter_map(|k| map.get(*k)).find(|v| !v.is_null()) else {
        return Vec::new();
    };

    let values = match raw {
        Value::Array(values) => values,
        Value::Object(wrapper) => match wrapper.get("data") {
            Some(Value::Array(values)) => values,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    values.iter().map(decode_number).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_sample_list() {
        let value = json!([
            { "distance": 0, "time": 0, "heart_rate": 120, "power": 200 },
            { "distance": "5.5", "time": 2, "heartrate": "n/a" }
        ]);

        let Some(RawStream::Samples(samples)) = RawStream::from_value(&value) else {
            panic!("expected samples");
        };
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].heartrate, Some(120.0));
        assert_eq!(samples[0].watts, Some(200.0));
        assert_eq!(samples[1].distance, Some(5.5));
        assert_eq!(samples[1].heartrate, None);
    }

    #[test]
    fn test_detect_wrapped_and_flat_channels() {
        let value = json!({
            "distance": { "data": [0, 10, 20], "series_type": "distance" },
            "time": [0, 1, 2],
            "heart_rate": { "data": [140, null, 150] }
        });

        let Some(RawStream::Channels(channels)) = RawStream::from_value(&value) else {
            panic!("expected channels");
        };
        assert_eq!(channels.distance, vec![Some(0.0), Some(10.0), Some(20.0)]);
        assert_eq!(channels.time.len(), 3);
        assert_eq!(channels.heartrate, vec![Some(140.0), None, Some(150.0)]);
        assert!(channels.watts.is_empty());
    }

    #[test]
    fn test_detect_typed_channel_list() {
        let value = json!([
            { "type": "distance", "data": [0.0, 12.5] },
            { "type": "time", "data": [0, 4] },
            { "type": "watts", "data": [180, 190] }
        ]);

        let Some(RawStream::Channels(channels)) = RawStream::from_value(&value) else {
            panic!("expected channels");
        };
        assert_eq!(channels.distance, vec![Some(0.0), Some(12.5)]);
        assert_eq!(channels.watts, vec![Some(180.0), Some(190.0)]);
    }

    #[test]
    fn test_json_encoded_string_stream() {
        let value = Value::String(r#"[{"distance": 1, "time": 1}]"#.to_string());
        assert!(matches!(
            RawStream::from_value(&value),
            Some(RawStream::Samples(_))
        ));
    }

    #[test]
    fn test_unrecognized_shapes_are_none() {
        assert!(RawStream::from_value(&Value::Null).is_none());
        assert!(RawStream::from_value(&json!([])).is_none());
        assert!(RawStream::from_value(&json!({})).is_none());
        assert!(RawStream::from_value(&json!(42)).is_none());
        assert!(RawStream::from_value(&json!([1, 2, 3])).is_none());
        assert!(RawStream::from_value(&json!([{ "speed": 3 }])).is_none());
        assert!(RawStream::from_value(&json!("not json")).is_none());
    }

    #[test]
    fn test_decode_number() {
        assert_eq!(decode_number(&json!(3)), Some(3.0));
        assert_eq!(decode_number(&json!(" 4.25 ")), Some(4.25));
        assert_eq!(decode_number(&json!("abc")), None);
        assert_eq!(decode_number(&json!(true)), None);
        assert_eq!(decode_number(&json!("NaN")), None);
    }
}

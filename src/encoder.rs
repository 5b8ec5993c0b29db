//! Output encoding
//!
//! Wraps engine results in payloads carrying producer metadata, and renders
//! the compact text report used by the CLI.

use std::fmt::Write;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ComputeError;
use crate::types::{
    ActivitySummary, AnalysisPayload, PaceSource, PersonalRecords, Producer, RecordsPayload,
};
use crate::{PRODUCER_NAME, STRIDE_VERSION};

/// Encoder for producing result payloads
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    fn producer(&self) -> Producer {
        Producer {
            name: PRODUCER_NAME.to_string(),
            version: STRIDE_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        }
    }

    pub fn encode_analysis(&self, summary: ActivitySummary, split_length_m: f64) -> AnalysisPayload {
        AnalysisPayload {
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            split_length_m,
            summary,
        }
    }

    pub fn encode_records(&self, records: PersonalRecords, distance_table: &str) -> RecordsPayload {
        RecordsPayload {
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            distance_table: distance_table.to_string(),
            personal_records: records,
        }
    }

    /// Encode an analysis to JSON
    pub fn analysis_to_json(
        &self,
        summary: ActivitySummary,
        split_length_m: f64,
    ) -> Result<String, ComputeError> {
        to_json(&self.encode_analysis(summary, split_length_m))
    }

    /// Encode personal records to JSON
    pub fn records_to_json(
        &self,
        records: PersonalRecords,
        distance_table: &str,
    ) -> Result<String, ComputeError> {
        to_json(&self.encode_records(records, distance_table))
    }
}

fn to_json<T: Serialize>(payload: &T) -> Result<String, ComputeError> {
    serde_json::to_string(payload).map_err(|e| ComputeError::EncodingError(e.to_string()))
}

/// Format a pace as `mm:ss` per km; absent renders as `-`
pub fn format_pace(sec_per_km: Option<f64>) -> String {
    match sec_per_km {
        Some(p) if p.is_finite() && p >= 0.0 => {
            let total = p.round() as u64;
            format!("{:02}:{:02}", total / 60, total % 60)
        }
        _ => "-".to_string(),
    }
}

/// Format a duration as `h:mm:ss`, or `mm:ss` under an hour
pub fn format_duration(seconds: Option<f64>) -> String {
    match seconds {
        Some(s) if s.is_finite() && s >= 0.0 => {
            let total = s.round() as u64;
            let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
            if h > 0 {
                format!("{h}:{m:02}:{s:02}")
            } else {
                format!("{m:02}:{s:02}")
            }
        }
        _ => "-".to_string(),
    }
}

/// Plain-text rendering of a summary
pub fn render_summary_text(summary: &ActivitySummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Stream Summary");
    let _ = writeln!(out, "==============");
    let _ = writeln!(out, "Samples: {}", summary.sample_count);
    if let Some(d) = summary.total_distance_m {
        let _ = writeln!(out, "Distance: {:.2} km", d / 1000.0);
    }
    if let Some(hr) = summary.heart_rate {
        let _ = writeln!(
            out,
            "Heart Rate: avg {:.0} bpm (min {:.0}, max {:.0})",
            hr.avg, hr.min, hr.max
        );
    }
    if let Some(pw) = summary.power {
        let _ = writeln!(out, "Power: avg {:.0} W (max {:.0} W)", pw.avg, pw.max);
    }
    if let Some(pace) = summary.overall_pace {
        let label = match pace.source {
            PaceSource::Anchors => "Overall Pace",
            PaceSource::PointAverage => "Average point-wise pace (approx)",
        };
        let _ = writeln!(out, "{label}: {} min/km", format_pace(Some(pace.sec_per_km)));
    }
    if let Some(gain) = summary.elevation_gain_m {
        let _ = writeln!(out, "Elevation gain: {gain:.0} m");
    }

    if !summary.splits.is_empty() {
        let _ = writeln!(out, "\nSplits:");
        for split in &summary.splits {
            let hr = split
                .avg_hr
                .map(|v| format!("{v:.0} bpm"))
                .unwrap_or_else(|| "-".to_string());
            let power = split
                .avg_power
                .map(|v| format!("{v:.0} W"))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "Split {} ({:.2} km): Pace {}, HR {}, Power {}",
                split.index,
                split.distance_km,
                format_pace(split.pace_sec_per_km),
                hr,
                power
            );
        }
    }

    if let (Some(fast), Some(slow)) = (summary.fastest_split, summary.slowest_split) {
        let _ = writeln!(
            out,
            "\nFastest split: #{} ({}). Slowest split: #{} ({}).",
            fast.index,
            format_pace(Some(fast.pace_sec_per_km)),
            slow.index,
            format_pace(Some(slow.pace_sec_per_km))
        );
    }

    if let Some(drift) = summary.cardiac_drift.filter(|d| d.detected) {
        let _ = writeln!(
            out,
            "Cardiac drift detected: average HR rose {:.0} bpm from start to end.",
            drift.delta_bpm
        );
    }

    out
}

/// Plain-text rendering of personal records
pub fn render_records_text(records: &PersonalRecords) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Personal Records");
    let _ = writeln!(out, "================");
    for record in &records.records {
        match (record.best_time_s, record.achieved_on) {
            (Some(_), Some(date)) => {
                let _ = writeln!(
                    out,
                    "{:<14} {:>9}  {} /km  {}  {}",
                    record.distance_label,
                    format_duration(record.best_time_s),
                    format_pace(record.pace_sec_per_km()),
                    date,
                    record.activity_name.as_deref().unwrap_or("")
                );
            }
            _ => {
                let _ = writeln!(out, "{:<14} {:>9}", record.distance_label, "-");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PersonalRecord;

    #[test]
    fn test_format_pace() {
        assert_eq!(format_pace(Some(300.0)), "05:00");
        assert_eq!(format_pace(Some(299.6)), "05:00");
        assert_eq!(format_pace(Some(272.4)), "04:32");
        assert_eq!(format_pace(None), "-");
        assert_eq!(format_pace(Some(f64::NAN)), "-");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Some(1500.0)), "25:00");
        assert_eq!(format_duration(Some(3723.0)), "1:02:03");
        assert_eq!(format_duration(None), "-");
    }

    #[test]
    fn test_records_payload_carries_producer() {
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let records = PersonalRecords {
            records: vec![PersonalRecord::unset("5k", 5000.0)],
            activities_considered: 0,
        };

        let json = encoder.records_to_json(records, "5k=5000").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["producer"]["name"], PRODUCER_NAME);
        assert_eq!(value["producer"]["instance_id"], "test-instance");
        assert_eq!(value["distance_table"], "5k=5000");
        assert!(value["personal_records"]["records"][0]["best_time_s"].is_null());
    }

    #[test]
    fn test_serialization_failure_is_encoding_error() {
        let mut unencodable = std::collections::HashMap::new();
        unencodable.insert((1, 2), "tuple keys are not JSON object keys");

        let result = to_json(&unencodable);
        assert!(matches!(result, Err(ComputeError::EncodingError(_))));
    }

    #[test]
    fn test_render_records_text() {
        let mut record = PersonalRecord::unset("5k", 5000.0);
        record.best_time_s = Some(1500.0);
        record.achieved_on = chrono::NaiveDate::from_ymd_opt(2024, 5, 2);
        record.activity_name = Some("Tempo".to_string());
        let text = render_records_text(&PersonalRecords {
            records: vec![record, PersonalRecord::unset("10k", 10000.0)],
            activities_considered: 1,
        });

        assert!(text.contains("25:00"));
        assert!(text.contains("05:00 /km"));
        assert!(text.contains("2024-05-02"));
        assert!(text.contains("10k"));
    }
}

//! Parsing of activity collections
//!
//! Hosts hand over activity history either as a JSON array or as NDJSON
//! (one activity per line).

use crate::error::ComputeError;
use crate::schema::activity::Activity;

/// Adapter for decoding activity collections
pub struct ActivityAdapter;

impl ActivityAdapter {
    /// Parse a JSON string containing an array of activities
    pub fn parse_array(json: &str) -> Result<Vec<Activity>, ComputeError> {
        let activities: Vec<Activity> = serde_json::from_str(json)?;
        Ok(activities)
    }

    /// Parse NDJSON (newline-delimited JSON) containing activities
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<Activity>, ComputeError> {
        let mut activities = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Activity>(trimmed) {
                Ok(activity) => activities.push(activity),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(activities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let input = r#"{"id": 1, "type": "Run", "start_date": "2024-01-01T07:00:00Z"}

{"id": 2, "type": "Ride", "start_date": "2024-01-02T07:00:00Z"}
"#;
        let activities = ActivityAdapter::parse_ndjson(input).unwrap();
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[1].id, "2");
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let input = "{\"id\": 1, \"type\": \"Run\", \"start_date\": \"2024-01-01T07:00:00Z\"}\nnot json\n";
        let err = ActivityAdapter::parse_ndjson(input).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_array() {
        let input = r#"[{"id": "x", "type": "Run", "start_date": "2024-01-01T07:00:00Z"}]"#;
        let activities = ActivityAdapter::parse_array(input).unwrap();
        assert_eq!(activities.len(), 1);
        assert!(ActivityAdapter::parse_array("{").is_err());
    }
}

//! Period summaries
//!
//! Aggregates declared activity totals over an inclusive date range, for
//! dashboards and training-trend reports.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::schema::Activity;
use crate::types::{PeriodActivity, PeriodSummary, SportTotals};

/// Aggregator over activity metadata
pub struct PeriodAnalyzer;

impl PeriodAnalyzer {
    /// Summarize activities starting within `[from, to]` (inclusive, by
    /// calendar date). Missing declared values count as zero.
    pub fn summarize(activities: &[Activity], from: NaiveDate, to: NaiveDate) -> PeriodSummary {
        let mut selected: Vec<&Activity> = activities
            .iter()
            .filter(|a| (from..=to).contains(&a.date()))
            .collect();
        selected.sort_by_key(|a| a.start_date);

        let mut by_sport: BTreeMap<String, SportTotals> = BTreeMap::new();
        let mut listing = Vec::with_capacity(selected.len());

        for activity in &selected {
            let distance = non_negative(activity.distance_m);
            let moving = non_negative(activity.moving_time_s);
            let gain = non_negative(activity.total_elevation_gain_m);

            let totals = by_sport
                .entry(activity.sport_type.clone())
                .or_insert_with(|| SportTotals {
                    sport_type: activity.sport_type.clone(),
                    ..Default::default()
                });
            totals.activities += 1;
            totals.distance_m += distance;
            totals.moving_time_s += moving;
            totals.elevation_gain_m += gain;

            listing.push(PeriodActivity {
                id: activity.id.clone(),
                name: activity.name.clone(),
                sport_type: activity.sport_type.clone(),
                date: activity.date(),
                distance_km: distance / 1000.0,
                moving_time_s: moving,
                elevation_gain_m: gain,
            });
        }

        let by_sport: Vec<SportTotals> = by_sport.into_values().collect();

        PeriodSummary {
            from,
            to,
            activity_count: selected.len(),
            total_distance_m: by_sport.iter().map(|s| s.distance_m).sum(),
            total_moving_time_s: by_sport.iter().map(|s| s.moving_time_s).sum(),
            total_elevation_gain_m: by_sport.iter().map(|s| s.elevation_gain_m).sum(),
            by_sport,
            activities: listing,
        }
    }
}

fn non_negative(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn activity(id: &str, sport: &str, day: u32, distance: f64, moving: f64) -> Activity {
        Activity {
            id: id.to_string(),
            name: id.to_string(),
            sport_type: sport.to_string(),
            start_date: Utc.with_ymd_and_hms(2024, 6, day, 6, 30, 0).unwrap(),
            distance_m: Some(distance),
            moving_time_s: Some(moving),
            elapsed_time_s: None,
            total_elevation_gain_m: Some(10.0),
            streams: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_summarize_inclusive_range() {
        let activities = vec![
            activity("late", "Run", 20, 8000.0, 2400.0),
            activity("early", "Run", 1, 5000.0, 1500.0),
            activity("ride", "Ride", 10, 30000.0, 3600.0),
            activity("outside", "Run", 25, 10000.0, 3000.0),
        ];
        let from = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 6, 20).unwrap();

        let summary = PeriodAnalyzer::summarize(&activities, from, to);

        assert_eq!(summary.activity_count, 3);
        assert_eq!(summary.total_distance_m, 43000.0);
        assert_eq!(summary.total_elevation_gain_m, 30.0);
        let order: Vec<&str> = summary.activities.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(order, vec!["early", "ride", "late"]);
        assert_eq!(summary.by_sport.len(), 2);
        assert_eq!(summary.by_sport[0].sport_type, "Ride");
        assert_eq!(summary.by_sport[1].activities, 2);
        assert_eq!(summary.by_sport[1].moving_time_s, 3900.0);
    }

    #[test]
    fn test_empty_period() {
        let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let summary = PeriodAnalyzer::summarize(&[], from, from);
        assert_eq!(summary.activity_count, 0);
        assert_eq!(summary.total_distance_m, 0.0);
        assert!(summary.by_sport.is_empty());
    }
}

//! Personal-record search
//!
//! For every target distance, finds the shortest elapsed time of any
//! contiguous window covering at least that distance, across all eligible
//! activities.
//!
//! Each activity is scanned with a two-pointer window: `end` advances until
//! the window covers the target, then `start` advances to tighten it. Neither
//! pointer moves backwards, so a scan takes at most `2n` steps.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{AnalysisConfig, DistanceTable, DistanceTarget};
use crate::normalizer::StreamNormalizer;
use crate::schema::Activity;
use crate::types::{AnchorPoint, NormalizedStream, PersonalRecord, PersonalRecords, WindowMatch};

/// Best qualifying window in a normalized stream, `None` if the stream never
/// covers `target_m`.
pub fn best_window_time(stream: &NormalizedStream, target_m: f64) -> Option<WindowMatch> {
    scan_window(&stream.anchor_points(), target_m).best
}

/// Outcome of one two-pointer scan
#[derive(Debug, Clone, Copy)]
struct WindowScan {
    best: Option<WindowMatch>,
    /// Loop iterations performed
    steps: usize,
}

fn scan_window(points: &[AnchorPoint], target_m: f64) -> WindowScan {
    let mut scan = WindowScan {
        best: None,
        steps: 0,
    };
    if target_m.is_nan() || target_m <= 0.0 || points.len() < 2 {
        return scan;
    }
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return scan;
    };
    if last.distance_m - first.distance_m < target_m {
        return scan;
    }

    let mut start = 0;
    let mut end = 0;
    while end < points.len() {
        scan.steps += 1;
        let covered = points[end].distance_m - points[start].distance_m;
        if covered >= target_m {
            let elapsed = points[end].time_s - points[start].time_s;
            let improves = scan.best.map_or(true, |best| elapsed < best.time_s);
            if elapsed > 0.0 && improves {
                scan.best = Some(WindowMatch {
                    start_sample: points[start].index,
                    end_sample: points[end].index,
                    distance_m: covered,
                    time_s: elapsed,
                });
            }
            start += 1;
        } else {
            end += 1;
        }
    }

    log::trace!(
        "window scan for {target_m} m over {} points took {} steps",
        points.len(),
        scan.steps
    );
    scan
}

/// Activity prepared for window scans
struct Candidate<'a> {
    activity: &'a Activity,
    points: Vec<AnchorPoint>,
}

/// Engine computing personal records over an activity history
#[derive(Debug, Clone, PartialEq)]
pub struct PersonalRecordEngine {
    distances: DistanceTable,
    sport_types: Vec<String>,
    max_candidates: Option<usize>,
}

impl Default for PersonalRecordEngine {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl PersonalRecordEngine {
    pub fn new(distances: DistanceTable) -> Self {
        Self {
            distances,
            ..Self::default()
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            distances: config.distances.clone(),
            sport_types: config.record_sport_types.clone(),
            max_candidates: config.max_record_candidates,
        }
    }

    pub fn distances(&self) -> &DistanceTable {
        &self.distances
    }

    /// Compute one record per table entry, in table order.
    ///
    /// Activities are considered in the order given; on equal times the
    /// earlier activity keeps the record.
    pub fn compute(&self, activities: &[Activity]) -> PersonalRecords {
        let candidates: Vec<Candidate> = activities
            .iter()
            .filter(|a| self.is_eligible(a))
            .map(|activity| Candidate {
                activity,
                points: activity
                    .stream()
                    .map(|raw| StreamNormalizer::normalize(&raw).anchor_points())
                    .unwrap_or_default(),
            })
            .collect();

        log::debug!(
            "computing {} records over {} of {} activities",
            self.distances.targets().len(),
            candidates.len(),
            activities.len()
        );

        let records = self
            .distances
            .targets()
            .iter()
            .map(|target| self.record_for(&candidates, target))
            .collect();

        PersonalRecords {
            records,
            activities_considered: candidates.len(),
        }
    }

    fn is_eligible(&self, activity: &Activity) -> bool {
        self.sport_types.iter().any(|s| activity.is_sport(s))
    }

    fn record_for(&self, candidates: &[Candidate], target: &DistanceTarget) -> PersonalRecord {
        let eligible: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| c.activity.distance_m.map_or(true, |d| d >= target.meters))
            .take(self.max_candidates.unwrap_or(usize::MAX))
            .collect();

        let matches = scan_candidates(&eligible, target.meters);

        let mut best: Option<(&Activity, WindowMatch)> = None;
        for (candidate, found) in eligible.iter().zip(matches) {
            let Some(found) = found else {
                continue;
            };
            match best {
                Some((_, current)) if found.time_s >= current.time_s => {}
                _ => best = Some((candidate.activity, found)),
            }
        }

        match best {
            Some((activity, found)) => PersonalRecord {
                distance_label: target.label.clone(),
                distance_m: target.meters,
                best_time_s: Some(found.time_s),
                source_activity_id: Some(activity.id.clone()),
                activity_name: Some(activity.name.clone()),
                achieved_on: Some(activity.date()),
            },
            None => PersonalRecord::unset(&target.label, target.meters),
        }
    }
}

#[cfg(not(feature = "parallel"))]
fn scan_candidates(candidates: &[&Candidate], target_m: f64) -> Vec<Option<WindowMatch>> {
    candidates
        .iter()
        .map(|c| scan_window(&c.points, target_m).best)
        .collect()
}

#[cfg(feature = "parallel")]
fn scan_candidates(candidates: &[&Candidate], target_m: f64) -> Vec<Option<WindowMatch>> {
    candidates
        .par_iter()
        .map(|c| scan_window(&c.points, target_m).best)
        .collect()
}

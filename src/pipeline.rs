//! Pipeline orchestration
//!
//! This module provides the public API for Stride Flux. It runs raw stream
//! JSON through normalization, segmentation and summarization, and activity
//! histories through the personal-record engine.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use serde_json::Value;

use crate::cache::{InMemoryRecordCache, RecordCache, RecordCacheKey};
use crate::config::AnalysisConfig;
use crate::encoder::ReportEncoder;
use crate::error::ComputeError;
use crate::normalizer::StreamNormalizer;
use crate::period::PeriodAnalyzer;
use crate::records::PersonalRecordEngine;
use crate::schema::{Activity, ActivityAdapter, RawStream};
use crate::splits::SplitSegmenter;
use crate::summary::SummaryAnalyzer;
use crate::types::{ActivitySummary, PeriodSummary, PersonalRecords};

/// Analyze one raw stream value under a configuration.
///
/// Unusable stream shapes yield an empty summary rather than an error.
pub fn analyze_stream(raw: &Value, config: &AnalysisConfig) -> Result<ActivitySummary, ComputeError> {
    let segmenter = SplitSegmenter::from_config(config)?;
    let analyzer = SummaryAnalyzer::from_config(config);
    Ok(run_analysis(&segmenter, &analyzer, RawStream::from_value(raw)))
}

/// Analyze raw stream JSON and encode the result.
///
/// # Arguments
/// * `raw_json` - Stream JSON in any accepted shape (sample array, channel map, typed list)
/// * `split_length_m` - Split length in meters; must be positive
///
/// # Example
/// ```ignore
/// let payload = analyze_stream_json(stream_json, 1000.0)?;
/// ```
pub fn analyze_stream_json(raw_json: &str, split_length_m: f64) -> Result<String, ComputeError> {
    let config = AnalysisConfig {
        split_length_m,
        ..AnalysisConfig::default()
    };
    let raw: Value = serde_json::from_str(raw_json)?;
    let summary = analyze_stream(&raw, &config)?;
    ReportEncoder::new().analysis_to_json(summary, split_length_m)
}

/// Compute personal records over a JSON array of activities with the
/// standard distance table.
///
/// # Example
/// ```ignore
/// let payload = personal_records_json(activities_json)?;
/// ```
pub fn personal_records_json(activities_json: &str) -> Result<String, ComputeError> {
    let activities = ActivityAdapter::parse_array(activities_json)?;
    let engine = PersonalRecordEngine::default();
    let records = engine.compute(&activities);
    ReportEncoder::new().records_to_json(records, &engine.distances().fingerprint())
}

fn run_analysis(
    segmenter: &SplitSegmenter,
    analyzer: &SummaryAnalyzer,
    raw: Option<RawStream>,
) -> ActivitySummary {
    // Stage 1: Normalize channels
    let stream = raw
        .map(|raw| StreamNormalizer::normalize(&raw))
        .unwrap_or_default();

    // Stage 2: Segment into splits
    let splits = segmenter.segment(&stream);

    // Stage 3: Summarize
    analyzer.summarize(&stream, splits)
}

/// Stateful processor holding configuration and a record cache.
///
/// Use this when the same host serves many requests: records are memoized
/// per user and distance table until [`StrideProcessor::ingest`] is called.
///
/// Each user carries an ingest generation. Records computed while an ingest
/// for the same user lands are returned but never stored.
pub struct StrideProcessor<C: RecordCache = InMemoryRecordCache> {
    config: AnalysisConfig,
    segmenter: SplitSegmenter,
    analyzer: SummaryAnalyzer,
    engine: PersonalRecordEngine,
    cache: C,
    encoder: ReportEncoder,
    generations: Mutex<HashMap<String, u64>>,
}

impl StrideProcessor<InMemoryRecordCache> {
    /// Create a processor with default settings
    pub fn new() -> Self {
        let config = AnalysisConfig::default();
        Self {
            segmenter: SplitSegmenter::default(),
            analyzer: SummaryAnalyzer::from_config(&config),
            engine: PersonalRecordEngine::from_config(&config),
            cache: InMemoryRecordCache::from_config(&config),
            encoder: ReportEncoder::new(),
            generations: Mutex::default(),
            config,
        }
    }

    /// Create a processor from a validated configuration
    pub fn with_config(config: AnalysisConfig) -> Result<Self, ComputeError> {
        let cache = InMemoryRecordCache::from_config(&config);
        Self::with_cache(config, cache)
    }
}

impl Default for StrideProcessor<InMemoryRecordCache> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: RecordCache> StrideProcessor<C> {
    /// Create a processor with a caller-supplied cache
    pub fn with_cache(config: AnalysisConfig, cache: C) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            segmenter: SplitSegmenter::from_config(&config)?,
            analyzer: SummaryAnalyzer::from_config(&config),
            engine: PersonalRecordEngine::from_config(&config),
            cache,
            encoder: ReportEncoder::new(),
            generations: Mutex::default(),
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Analyze a raw stream value
    pub fn analyze(&self, raw: &Value) -> ActivitySummary {
        run_analysis(&self.segmenter, &self.analyzer, RawStream::from_value(raw))
    }

    /// Analyze raw stream JSON and encode the result
    pub fn analyze_json(&self, raw_json: &str) -> Result<String, ComputeError> {
        let raw: Value = serde_json::from_str(raw_json)?;
        let summary = self.analyze(&raw);
        self.encoder
            .analysis_to_json(summary, self.segmenter.split_length_m())
    }

    /// Personal records for a user's activity history, memoized per user
    /// and distance table
    pub fn personal_records(&self, user_id: &str, activities: &[Activity]) -> PersonalRecords {
        let key = RecordCacheKey::new(user_id, &self.config.distances.fingerprint());
        let generation = self.generation(user_id);
        if let Some(records) = self.cache.get(&key) {
            return records;
        }

        let records = self.engine.compute(activities);
        self.store_if_current(key, generation, records.clone());
        records
    }

    fn lock_generations(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self, user_id: &str) -> u64 {
        self.lock_generations().get(user_id).copied().unwrap_or(0)
    }

    /// Store records unless an ingest for the user happened since
    /// `generation` was read. Holds the generation lock across the put so an
    /// ingest either precedes the check or invalidates the stored entry.
    fn store_if_current(&self, key: RecordCacheKey, generation: u64, records: PersonalRecords) {
        let generations = self.lock_generations();
        let current = generations.get(&key.user_id).copied().unwrap_or(0);
        if current == generation {
            self.cache.put(key, records);
        } else {
            log::debug!(
                "discarding records for user {} computed before ingest",
                key.user_id
            );
        }
    }

    /// Personal records from a JSON array of activities, encoded
    pub fn personal_records_json(
        &self,
        user_id: &str,
        activities_json: &str,
    ) -> Result<String, ComputeError> {
        let activities = ActivityAdapter::parse_array(activities_json)?;
        let records = self.personal_records(user_id, &activities);
        self.encoder
            .records_to_json(records, &self.config.distances.fingerprint())
    }

    /// Record that new telemetry arrived for a user; drops memoized records
    pub fn ingest(&self, user_id: &str) {
        log::info!("new telemetry for user {user_id}, invalidating cached records");
        let mut generations = self.lock_generations();
        *generations.entry(user_id.to_string()).or_insert(0) += 1;
        self.cache.invalidate_user(user_id);
    }

    /// Aggregate activities over an inclusive date range
    pub fn period_summary(
        &self,
        activities: &[Activity],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PeriodSummary, ComputeError> {
        if from > to {
            return Err(ComputeError::InvalidConfig(format!(
                "period start {from} is after end {to}"
            )));
        }
        Ok(PeriodAnalyzer::summarize(activities, from, to))
    }
}

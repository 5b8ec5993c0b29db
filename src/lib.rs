//! Stride Flux - activity stream analytics and personal records
//!
//! Stride turns raw fitness telemetry into per-distance splits, session
//! summaries and personal records through a deterministic pipeline:
//! shape detection → normalization → segmentation → summarization →
//! encoding. Record search runs a two-pointer window scan over every
//! eligible activity.
//!
//! ## Modules
//!
//! - **Stream analysis**: [`normalizer`], [`splits`], [`summary`]
//! - **Personal records**: [`records`], with memoization in [`cache`]
//! - **Date-range totals**: [`period`]

pub mod cache;
pub mod config;
pub mod encoder;
pub mod error;
pub mod normalizer;
pub mod period;
pub mod pipeline;
pub mod records;
pub mod schema;
pub mod splits;
mod stats;
pub mod summary;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use cache::{InMemoryRecordCache, NoRecordCache, RecordCache, RecordCacheKey};
pub use config::{AnalysisConfig, DistanceTable, DistanceTarget};
pub use encoder::{format_pace, ReportEncoder};
pub use error::ComputeError;
pub use normalizer::StreamNormalizer;
pub use period::PeriodAnalyzer;
pub use pipeline::{analyze_stream, analyze_stream_json, personal_records_json, StrideProcessor};
pub use records::{best_window_time, PersonalRecordEngine};
pub use splits::SplitSegmenter;
pub use summary::SummaryAnalyzer;

// Schema exports
pub use schema::{Activity, ActivityAdapter, RawStream};

/// Library version embedded in all payloads
pub const STRIDE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for payloads
pub const PRODUCER_NAME: &str = "stride-flux";

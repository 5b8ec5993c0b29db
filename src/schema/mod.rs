//! Input schema
//!
//! Raw stream shapes, activity records, and collection parsing. This is the
//! only place that inspects the shape of incoming telemetry.

mod activity;
mod adapter;
mod raw_stream;

pub use activity::Activity;
pub use adapter::ActivityAdapter;
pub use raw_stream::{decode_number, RawChannels, RawSample, RawStream};

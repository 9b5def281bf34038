//! Timing samples and summaries for saga runs.
//!
//! - [`MetricsRecorder`] is the boundary the saga core records step timings through
//! - [`Statistics`] aggregates samples with nearest-rank percentiles
//! - [`Report`] merges samples per label into a textual summary

pub mod error;
pub mod recorder;
pub mod report;
pub mod statistics;

pub use error::{Result, StatsError};
pub use recorder::{BucketedStatistics, InMemoryMetricsRecorder, MetricsRecorder, NoopRecorder};
pub use report::{LabelSummary, Report, TOTAL_LABEL};
pub use statistics::Statistics;

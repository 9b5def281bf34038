//! Statistics error types.

use thiserror::Error;

/// Errors that can occur while recording or summarising samples.
#[derive(Debug, Error)]
pub enum StatsError {
    /// The sample is not a finite number.
    #[error("Invalid sample for {label}: {value}")]
    InvalidSample { label: String, value: f64 },

    /// The label is empty.
    #[error("Sample label must not be empty")]
    EmptyLabel,

    /// The requested percentile is outside (0, 100].
    #[error("Invalid percentile: {0}")]
    InvalidPercentile(f64),

    /// The recorder was switched to reject samples.
    #[error("Recorder rejected sample for {label}")]
    Rejected { label: String },

    /// A writer panicked while holding the sample lock.
    #[error("Recorder lock poisoned")]
    Poisoned,
}

/// Result type for statistics operations.
pub type Result<T> = std::result::Result<T, StatsError>;

//! Metrics recorder boundary and in-memory implementation.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use crate::{Result, Statistics, StatsError};

/// Receives one sample per labelled step and time bucket.
///
/// Callers treat recording as best-effort: an error is reported back but must
/// never change the outcome of the work being measured.
pub trait MetricsRecorder: Send + Sync {
    /// Records `value` for `label` in time bucket `bucket`.
    fn record(&self, label: &str, bucket: i64, value: f64) -> Result<()>;
}

/// Samples grouped by bucket, then by label.
pub type BucketedStatistics = BTreeMap<i64, HashMap<String, Statistics>>;

#[derive(Debug, Default)]
struct RecorderState {
    buckets: BucketedStatistics,
    fail_on_record: bool,
}

/// In-memory recorder keeping every sample.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetricsRecorder {
    state: Arc<RwLock<RecorderState>>,
}

impl InMemoryMetricsRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `record` call fail until switched off.
    pub fn set_fail_on_record(&self, fail: bool) -> Result<()> {
        self.state.write().map_err(|_| StatsError::Poisoned)?.fail_on_record = fail;
        Ok(())
    }

    /// Returns a copy of the per-bucket statistics.
    pub fn buckets(&self) -> Result<BucketedStatistics> {
        Ok(self.state.read().map_err(|_| StatsError::Poisoned)?.buckets.clone())
    }

    /// Returns every label that has at least one sample, sorted.
    pub fn labels(&self) -> Result<BTreeSet<String>> {
        let state = self.state.read().map_err(|_| StatsError::Poisoned)?;
        Ok(state
            .buckets
            .values()
            .flat_map(|labels| labels.keys().cloned())
            .collect())
    }

    /// Returns the statistics for a label merged across all buckets.
    pub fn label_statistics(&self, label: &str) -> Result<Statistics> {
        let state = self.state.read().map_err(|_| StatsError::Poisoned)?;
        let mut merged = Statistics::new();
        for stats in state.buckets.values().filter_map(|labels| labels.get(label)) {
            merged.merge(stats);
        }
        Ok(merged)
    }

    /// Returns the total number of samples recorded.
    pub fn sample_count(&self) -> Result<usize> {
        let state = self.state.read().map_err(|_| StatsError::Poisoned)?;
        Ok(state
            .buckets
            .values()
            .flat_map(HashMap::values)
            .map(Statistics::count)
            .sum())
    }
}

impl MetricsRecorder for InMemoryMetricsRecorder {
    fn record(&self, label: &str, bucket: i64, value: f64) -> Result<()> {
        if label.is_empty() {
            return Err(StatsError::EmptyLabel);
        }
        if !value.is_finite() {
            return Err(StatsError::InvalidSample {
                label: label.to_string(),
                value,
            });
        }

        let mut state = self.state.write().map_err(|_| StatsError::Poisoned)?;
        if state.fail_on_record {
            return Err(StatsError::Rejected {
                label: label.to_string(),
            });
        }

        state
            .buckets
            .entry(bucket)
            .or_default()
            .entry(label.to_string())
            .or_default()
            .add(value);
        Ok(())
    }
}

/// Recorder that discards every sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecorder;

impl MetricsRecorder for NoopRecorder {
    fn record(&self, _label: &str, _bucket: i64, _value: f64) -> Result<()> {
        Ok(())
    }
}

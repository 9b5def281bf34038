//! Descriptive statistics over a set of samples.

use crate::{Result, StatsError};

/// Accumulated samples for one label.
///
/// Percentiles use the nearest-rank method: the p-th percentile of `n`
/// ascending samples is the sample at rank `ceil(p / 100 * n)`. The result is
/// always one of the recorded samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    values: Vec<f64>,
}

impl Statistics {
    /// Creates an empty set of statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sample. Non-finite values are ignored.
    pub fn add(&mut self, value: f64) {
        if value.is_finite() {
            self.values.push(value);
        }
    }

    /// Appends every sample from another set.
    pub fn merge(&mut self, other: &Statistics) {
        self.values.extend_from_slice(&other.values);
    }

    /// Returns the recorded samples in insertion order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    /// Returns the arithmetic mean.
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// Returns the nearest-rank percentile, `None` when there are no samples.
    ///
    /// `percentile` must be in `(0, 100]`.
    pub fn percentile(&self, percentile: f64) -> Result<Option<f64>> {
        if !(percentile > 0.0 && percentile <= 100.0) {
            return Err(StatsError::InvalidPercentile(percentile));
        }
        if self.values.is_empty() {
            return Ok(None);
        }

        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);

        let rank = (percentile / 100.0 * sorted.len() as f64).ceil() as usize;
        Ok(Some(sorted[rank.clamp(1, sorted.len()) - 1]))
    }
}

impl FromIterator<f64> for Statistics {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = Statistics::new();
        for value in iter {
            stats.add(value);
        }
        stats
    }
}

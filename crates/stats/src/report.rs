//! Textual run report built from recorded samples.

use std::fmt;

use crate::recorder::BucketedStatistics;
use crate::{Result, Statistics};

/// Label whose summary heads the report.
pub const TOTAL_LABEL: &str = "total";

/// Aggregates for one label across every bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSummary {
    pub label: String,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p95: f64,
    pub p99: f64,
}

impl LabelSummary {
    /// Summarises a label, `None` when it has no samples.
    pub fn from_statistics(label: impl Into<String>, stats: &Statistics) -> Result<Option<Self>> {
        let (Some(min), Some(max), Some(mean)) = (stats.min(), stats.max(), stats.mean()) else {
            return Ok(None);
        };
        let p95 = stats.percentile(95.0)?.unwrap_or(max);
        let p99 = stats.percentile(99.0)?.unwrap_or(max);

        Ok(Some(Self {
            label: label.into(),
            count: stats.count(),
            min,
            max,
            mean,
            p95,
            p99,
        }))
    }
}

impl fmt::Display for LabelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<28} n={:<7} min={:.2} ms max={:.2} ms mean={:.2} ms p95={:.2} ms p99={:.2} ms",
            self.label, self.count, self.min, self.max, self.mean, self.p95, self.p99
        )
    }
}

/// Per-label summaries for a named run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub name: String,
    pub total: Option<LabelSummary>,
    pub labels: Vec<LabelSummary>,
    pub buckets: usize,
}

impl Report {
    /// Builds a report from per-bucket samples.
    ///
    /// When `filter` is non-empty only the listed labels are summarised.
    /// Labels are listed alphabetically; the `total` label is also exposed
    /// on its own.
    pub fn build(name: impl Into<String>, buckets: &BucketedStatistics, filter: &[&str]) -> Result<Self> {
        let mut merged: std::collections::BTreeMap<&str, Statistics> = Default::default();
        for labels in buckets.values() {
            for (label, stats) in labels {
                if filter.is_empty() || filter.contains(&label.as_str()) {
                    merged.entry(label.as_str()).or_default().merge(stats);
                }
            }
        }

        let mut summaries = Vec::with_capacity(merged.len());
        for (label, stats) in &merged {
            if let Some(summary) = LabelSummary::from_statistics(*label, stats)? {
                summaries.push(summary);
            }
        }

        let total = summaries.iter().find(|s| s.label == TOTAL_LABEL).cloned();

        Ok(Self {
            name: name.into(),
            total,
            labels: summaries,
            buckets: buckets.len(),
        })
    }

    /// Returns the summary for a label.
    pub fn label(&self, label: &str) -> Option<&LabelSummary> {
        self.labels.iter().find(|s| s.label == label)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.total {
            Some(total) => writeln!(
                f,
                "Execution report for {} [min: {:.2} ms, max: {:.2} ms, mean: {:.2} ms, p95: {:.2} ms, p99: {:.2} ms]",
                self.name, total.min, total.max, total.mean, total.p95, total.p99
            )?,
            None => writeln!(f, "Execution report for {}", self.name)?,
        }
        writeln!(f, "buckets: {}", self.buckets)?;
        for summary in &self.labels {
            writeln!(f, "  {summary}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryMetricsRecorder, MetricsRecorder};

    fn recorder() -> InMemoryMetricsRecorder {
        let recorder = InMemoryMetricsRecorder::new();
        for (bucket, value) in [(0, 10.0), (0, 20.0), (1, 30.0), (2, 40.0)] {
            recorder.record(TOTAL_LABEL, bucket, value).unwrap();
        }
        recorder.record("reserve_stock", 1, 5.0).unwrap();
        recorder
    }

    #[test]
    fn merges_buckets_per_label() {
        let report = Report::build("add", &recorder().buckets().unwrap(), &[]).unwrap();

        assert_eq!(report.buckets, 3);
        assert_eq!(report.labels.len(), 2);
        let total = report.total.as_ref().unwrap();
        assert_eq!(total.count, 4);
        assert_eq!(total.min, 10.0);
        assert_eq!(total.max, 40.0);
        assert_eq!(total.mean, 25.0);
        assert_eq!(total.p95, 40.0);
        assert_eq!(report.label("reserve_stock").unwrap().count, 1);
    }

    #[test]
    fn filter_limits_labels() {
        let report = Report::build("add", &recorder().buckets().unwrap(), &["reserve_stock"]).unwrap();
        assert!(report.total.is_none());
        assert_eq!(report.labels.len(), 1);
        assert!(report.label(TOTAL_LABEL).is_none());
    }

    #[test]
    fn display_leads_with_total() {
        let report = Report::build("add", &recorder().buckets().unwrap(), &[]).unwrap();
        let text = report.to_string();
        let first = text.lines().next().unwrap();
        assert!(first.starts_with("Execution report for add [min: 10.00 ms"));
        assert!(text.contains("reserve_stock"));
    }

    #[test]
    fn empty_report_has_header_only() {
        let report = Report::build("empty", &BucketedStatistics::new(), &[]).unwrap();
        assert!(report.labels.is_empty());
        assert_eq!(report.to_string(), "Execution report for empty\nbuckets: 0\n");
    }
}

//! Step timing around action invocations.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use stats::{MetricsRecorder, NoopRecorder, TOTAL_LABEL};

use crate::Result;
use crate::action::Action;

/// Times actions and forwards the samples to a [`MetricsRecorder`].
///
/// Samples are in milliseconds and bucketed by the time elapsed since the
/// instrumentation was created. Recording never fails the timed work.
#[derive(Clone)]
pub struct Instrumentation {
    recorder: Arc<dyn MetricsRecorder>,
    origin: Instant,
    bucket_width: Duration,
}

impl Instrumentation {
    /// Creates instrumentation writing to `recorder`.
    pub fn new(recorder: Arc<dyn MetricsRecorder>, bucket_width: Duration) -> Self {
        Self {
            recorder,
            origin: Instant::now(),
            bucket_width: bucket_width.max(Duration::from_millis(1)),
        }
    }

    /// Creates instrumentation that only emits the `metrics` histogram.
    pub fn disabled() -> Self {
        Self::new(Arc::new(NoopRecorder), Duration::from_secs(1))
    }

    /// Returns the bucket an instant falls into.
    pub fn bucket(&self, at: Instant) -> i64 {
        let elapsed = at.saturating_duration_since(self.origin).as_millis();
        let width = self.bucket_width.as_millis().max(1);
        i64::try_from(elapsed / width).unwrap_or(i64::MAX)
    }

    /// Runs an action and records its duration under the action's name.
    pub async fn run<A: Action>(&self, action: &A, request: &A::Request) -> Result<A::Response> {
        self.time(action.name(), action.execute(request)).await
    }

    /// Runs a whole saga invocation and records it under the `total` label.
    pub async fn total<F, T>(&self, work: F) -> T
    where
        F: Future<Output = T>,
    {
        self.time(TOTAL_LABEL, work).await
    }

    /// Awaits `work` and records how long it took under `label`.
    pub async fn time<F, T>(&self, label: &'static str, work: F) -> T
    where
        F: Future<Output = T>,
    {
        let started = Instant::now();
        let output = work.await;
        self.record(label, started, started.elapsed());
        output
    }

    fn record(&self, label: &'static str, started: Instant, elapsed: Duration) {
        let millis = elapsed.as_secs_f64() * 1000.0;
        metrics::histogram!("saga_step_duration_ms", "step" => label).record(millis);

        if let Err(e) = self.recorder.record(label, self.bucket(started), millis) {
            tracing::debug!(step = label, error = %e, "failed to record step timing");
        }
    }
}

impl Default for Instrumentation {
    fn default() -> Self {
        Self::disabled()
    }
}

impl std::fmt::Debug for Instrumentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instrumentation")
            .field("bucket_width", &self.bucket_width)
            .finish_non_exhaustive()
    }
}

//! Global atomic counters for trust-core observability.
//!
//! Counters are incremented silently at the call site; [`Metrics::flush`]
//! emits current values as a single `tracing::info!` event at natural
//! boundaries (end of a pipeline run, daemon tick).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations, no locking.
pub struct Metrics {
    samples_taken: AtomicU64,
    reviews_scored: AtomicU64,
    pipeline_runs: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            samples_taken: AtomicU64::new(0),
            reviews_scored: AtomicU64::new(0),
            pipeline_runs: AtomicU64::new(0),
        }
    }

    /// Add `n` to the consistency-samples counter.
    pub fn add_samples_taken(&self, n: u64) {
        self.samples_taken.fetch_add(n, Ordering::Relaxed);
    }

    /// Increment the reviews-scored counter by one.
    pub fn inc_reviews_scored(&self) {
        self.reviews_scored.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the pipeline-runs counter by one.
    pub fn inc_pipeline_runs(&self) {
        self.pipeline_runs.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            samples_taken = self.samples_taken(),
            reviews_scored = self.reviews_scored(),
            pipeline_runs = self.pipeline_runs(),
        );
    }

    pub fn samples_taken(&self) -> u64 {
        self.samples_taken.load(Ordering::Relaxed)
    }

    pub fn reviews_scored(&self) -> u64 {
        self.reviews_scored.load(Ordering::Relaxed)
    }

    pub fn pipeline_runs(&self) -> u64 {
        self.pipeline_runs.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.samples_taken.store(0, Ordering::Relaxed);
        self.reviews_scored.store(0, Ordering::Relaxed);
        self.pipeline_runs.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment_and_reset() {
        let m = Metrics::new();
        m.add_samples_taken(3);
        m.inc_reviews_scored();
        m.inc_pipeline_runs();
        assert_eq!(m.samples_taken(), 3);
        assert_eq!(m.reviews_scored(), 1);
        assert_eq!(m.pipeline_runs(), 1);

        m.reset();
        assert_eq!(m.samples_taken(), 0);
        assert_eq!(m.reviews_scored(), 0);
        assert_eq!(m.pipeline_runs(), 0);
    }
}

//! Structured observability hooks for the trust lifecycle.
//!
//! Emission functions for the key events (samples collected, trust
//! updated, review scored, pipeline run finished) plus a run-scoped
//! span so everything inside a pipeline run carries its run id.

use tracing::info;

/// Span tagged with the pipeline run id.
///
/// Async callers attach it with `tracing::Instrument`; do not hold an
/// entered guard across await points.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("agenttrust.run", run_id = %run_id)
}

/// Emit event: a consistency check finished.
pub fn emit_samples_collected(prompt: &str, valid: usize, failed: usize, agreement_ratio: f64) {
    info!(
        event = "calibration.samples_collected",
        prompt = %prompt,
        valid = valid,
        failed = failed,
        agreement_ratio = agreement_ratio,
    );
}

/// Emit event: an agent's trust score changed.
pub fn emit_trust_updated(agent_id: &str, delta: i32, score: i32, level: &dyn std::fmt::Display) {
    info!(
        event = "trust.updated",
        agent_id = %agent_id,
        delta = delta,
        score = score,
        level = %level,
    );
}

/// Emit event: a rubric review completed.
pub fn emit_review_scored(total: u8, verdict: &dyn std::fmt::Display, attempt: u32) {
    info!(
        event = "review.scored",
        total = total,
        verdict = %verdict,
        attempt = attempt,
    );
}

/// Emit event: a pipeline run reached a terminal state.
pub fn emit_run_finished(run_id: &str, delivered: bool, attempts: u32, duration_ms: u64) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        delivered = delivered,
        attempts = attempts,
        duration_ms = duration_ms,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        // Just ensure span construction doesn't panic.
        let _span = run_span("test-run-id");
    }
}

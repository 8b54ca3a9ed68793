//! Pipeline orchestration: plan → execute → review → deliver/revise/fail.
//!
//! Wraps any [`Agent`] with mandatory quality gates. Every output ships a
//! Beipackzettel, every attempt is reviewed against the rubric, and the
//! outcome feeds the agent's trust score. The revise loop is always bounded
//! by the revision budget fixed at plan time.

use std::time::Instant;

use tracing::{info, Instrument};
use uuid::Uuid;

use agenttrust_core::obs::{emit_review_scored, emit_run_finished, run_span};
use agenttrust_core::{
    review, Agent, Beipackzettel, Outcome, Result, ReviewResult, Tier, TrustError,
    TrustScoreHandle, Verdict, METRICS,
};

use crate::state::{Disposition, FailReason, Stage};

/// Result of a full pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Run ID for correlating logs and audit records.
    pub run_id: Uuid,

    /// Whether the output reached the deliver stage. A flagged result is
    /// delivered but conditional on external QA (see `needs_qa`).
    pub delivered: bool,

    /// The agent's final output text.
    pub output: String,

    /// Validated metadata for the final output.
    pub beipackzettel: Beipackzettel,

    /// Review of the final attempt. The last rubric score and verdict are
    /// always reportable, including on failure.
    pub review: ReviewResult,

    /// Number of execute→review cycles that ran.
    pub attempts: u32,

    /// Terminal state tag.
    pub disposition: Disposition,

    /// True when the agent's trust level mandates human QA before the
    /// output counts as truly delivered. A flag, never a blocking call.
    pub needs_qa: bool,

    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl PipelineResult {
    /// The stage that terminated the run.
    pub fn terminal_stage(&self) -> Stage {
        self.disposition.stage()
    }
}

/// Structured pipeline around one agent.
///
/// The tier and revision budget are fixed at construction (the plan stage);
/// an out-of-range tier is rejected there via [`Tier::new`], before any
/// agent call happens. Stages within one run execute sequentially; separate
/// runs may execute concurrently, sharing only the trust registry.
pub struct AgentPipeline<A: Agent> {
    agent: A,
    trust: TrustScoreHandle,
    tier: Tier,
    max_revisions: u32,
}

impl<A: Agent> std::fmt::Debug for AgentPipeline<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentPipeline")
            .field("tier", &self.tier)
            .field("max_revisions", &self.max_revisions)
            .finish_non_exhaustive()
    }
}

impl<A: Agent> AgentPipeline<A> {
    /// Plan a pipeline: fix the review tier and revision budget.
    pub fn new(agent: A, trust: TrustScoreHandle, tier: Tier, max_revisions: u32) -> Self {
        Self {
            agent,
            trust,
            tier,
            max_revisions,
        }
    }

    /// Convenience constructor taking a raw tier number.
    ///
    /// # Errors
    ///
    /// [`TrustError::InvalidTier`] outside 1..=3, fatal at plan time.
    pub fn with_raw_tier(
        agent: A,
        trust: TrustScoreHandle,
        tier: u8,
        max_revisions: u32,
    ) -> Result<Self> {
        Ok(Self::new(agent, trust, Tier::new(tier)?, max_revisions))
    }

    /// Run the full pipeline for one query.
    ///
    /// Terminates after at most `max_revisions + 1` execute attempts.
    ///
    /// # Errors
    ///
    /// [`TrustError::AgentFailed`] when the agent callable errors, and
    /// [`TrustError::MalformedBeipackzettel`] when its metadata fails
    /// validation; both abort the current attempt rather than silently
    /// falling back. Terminal FAIL verdicts are not errors; they come back
    /// as a [`PipelineResult`] with a `Failed` disposition.
    pub async fn run(&self, query: &str) -> Result<PipelineResult> {
        let run_id = Uuid::new_v4();
        let span = run_span(&run_id.to_string());
        self.run_inner(run_id, query).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, query: &str) -> Result<PipelineResult> {
        let start = Instant::now();
        METRICS.inc_pipeline_runs();

        info!(
            stage = %Stage::Plan,
            tier = %self.tier,
            max_revisions = self.max_revisions,
            "starting pipeline run"
        );

        let mut feedback: Vec<String> = Vec::new();
        let max_attempts = self.max_revisions + 1;

        for attempt in 1..=max_attempts {
            // EXECUTE: carry accumulated reviewer feedback into the prompt.
            info!(stage = %Stage::Execute, attempt, "invoking agent");
            let prompt = compose_prompt(query, &feedback);
            let reply = self
                .agent
                .invoke(&prompt)
                .await
                .map_err(|e| TrustError::AgentFailed(e.to_string()))?;
            let bpz = Beipackzettel::from_draft(reply.insert)?;

            // REVIEW
            info!(stage = %Stage::Review, attempt, "scoring output");
            let review_result = review(&reply.output, &bpz, self.tier);
            emit_review_scored(review_result.total(), &review_result.verdict, attempt);

            match review_result.verdict {
                Verdict::Pass => {
                    // DELIVER: reward the outcome, then flag for QA when
                    // the trust level still requires oversight.
                    self.trust.update(bpz.confidence(), Outcome::Good).await;
                    let needs_qa = self.trust.needs_qa().await;
                    let disposition = if needs_qa {
                        Disposition::Flagged
                    } else {
                        Disposition::Delivered
                    };
                    return Ok(self.finish(
                        run_id,
                        reply.output,
                        bpz,
                        review_result,
                        attempt,
                        disposition,
                        needs_qa,
                        start,
                    ));
                }
                Verdict::Fail => {
                    // Terminal FAIL, no further revision attempted.
                    self.trust.update(bpz.confidence(), Outcome::Bad).await;
                    let needs_qa = self.trust.needs_qa().await;
                    return Ok(self.finish(
                        run_id,
                        reply.output,
                        bpz,
                        review_result,
                        attempt,
                        Disposition::Failed {
                            reason: FailReason::RubricFail,
                        },
                        needs_qa,
                        start,
                    ));
                }
                Verdict::Revise => {
                    if attempt == max_attempts {
                        self.trust.update(bpz.confidence(), Outcome::Bad).await;
                        let needs_qa = self.trust.needs_qa().await;
                        return Ok(self.finish(
                            run_id,
                            reply.output,
                            bpz,
                            review_result,
                            attempt,
                            Disposition::Failed {
                                reason: FailReason::RevisionLimitExceeded {
                                    max_revisions: self.max_revisions,
                                },
                            },
                            needs_qa,
                            start,
                        ));
                    }
                    info!(
                        stage = %Stage::Revise,
                        attempt,
                        issues = review_result.issues.len(),
                        "revise verdict, looping back to execute"
                    );
                    feedback.extend(review_result.issues);
                }
            }
        }

        // The loop always returns within max_attempts iterations.
        unreachable!("revise loop is bounded by max_revisions")
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        run_id: Uuid,
        output: String,
        beipackzettel: Beipackzettel,
        review: ReviewResult,
        attempts: u32,
        disposition: Disposition,
        needs_qa: bool,
        start: Instant,
    ) -> PipelineResult {
        let duration_ms = start.elapsed().as_millis() as u64;
        let delivered = !matches!(disposition, Disposition::Failed { .. });

        match &disposition {
            Disposition::Failed { reason } => info!(
                stage = %Stage::Fail,
                attempts,
                %reason,
                total = review.total(),
                "pipeline run failed"
            ),
            _ => info!(
                stage = %Stage::Deliver,
                attempts,
                needs_qa,
                total = review.total(),
                "pipeline run delivered"
            ),
        }
        emit_run_finished(&run_id.to_string(), delivered, attempts, duration_ms);

        PipelineResult {
            run_id,
            delivered,
            output,
            beipackzettel,
            review,
            attempts,
            disposition,
            needs_qa,
            duration_ms,
        }
    }
}

/// Append accumulated reviewer feedback to the original query.
fn compose_prompt(query: &str, feedback: &[String]) -> String {
    if feedback.is_empty() {
        return query.to_string();
    }
    let mut prompt = String::from(query);
    prompt.push_str("\n\nReviewer feedback to address:\n");
    for issue in feedback {
        prompt.push_str("- ");
        prompt.push_str(issue);
        prompt.push('\n');
    }
    prompt
}

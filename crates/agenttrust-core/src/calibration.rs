//! Budget-CoCoA calibration: measure real confidence via sample consistency.
//!
//! Instead of trusting an LLM's self-reported confidence, ask the same
//! question several times independently and measure agreement. Consistency
//! across samples is a much stronger signal than verbalized confidence.
//!
//! The default budget is 3 samples. Invocations are dispatched concurrently
//! via Tokio; clustering and ratio computation run single-threaded after all
//! dispatched calls have settled. A failed call drops that sample without
//! aborting its siblings.

use std::future::Future;
use std::sync::Arc;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Result, TrustError};
use crate::metrics::METRICS;

/// Discrete confidence classification derived from sample agreement.
///
/// Never constructed directly; always derived from an agreement ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    /// All samples agree (3/3 for the default budget).
    High,
    /// A clear majority agrees (2/3).
    Medium,
    /// No useful majority (≤1/3), or too few valid samples.
    Low,
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// One raw answer tagged with the equivalence class it clustered into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampledAnswer {
    pub answer: String,
    /// Equivalence class id assigned during clustering (dense, from 0).
    pub class_id: usize,
}

/// Result of a consistency check. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleResult {
    /// The prompt the samples answered.
    pub prompt: String,
    /// Surviving samples in dispatch order, each tagged with its class.
    pub samples: Vec<SampledAnswer>,
    /// Number of invocations that failed and were excluded.
    pub failed_calls: usize,
    /// Largest equivalence class size divided by surviving sample count.
    pub agreement_ratio: f64,
    /// Classification from fixed ratio thresholds.
    pub confidence_level: ConfidenceLevel,
    /// Numeric confidence estimate (0–100), monotonic in the ratio.
    pub confidence_pct: f64,
    /// Representative of the majority class, if one exists.
    pub majority_answer: Option<String>,
    /// Set when fewer than two valid samples survived; the result is then
    /// forced to Low rather than computed on a degenerate set.
    pub insufficient_data: bool,
}

/// Strategy for judging two answers equivalent during clustering.
///
/// The default is normalized exact match. A semantic clusterer can be
/// substituted, but it must still treat answers with matching normalized
/// forms as equivalent, and must never merge answers on superficial token
/// overlap that changes the answer's substance.
pub trait AnswerClusterer: Send + Sync {
    /// Whether `a` and `b` express the same answer.
    fn equivalent(&self, a: &str, b: &str) -> bool;
}

/// Case/whitespace-insensitive exact match after normalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedMatch;

impl AnswerClusterer for NormalizedMatch {
    fn equivalent(&self, a: &str, b: &str) -> bool {
        normalize_answer(a) == normalize_answer(b)
    }
}

/// Normalize a response for comparison: trim, lowercase, strip trailing
/// punctuation, collapse internal whitespace.
pub fn normalize_answer(text: &str) -> String {
    static TRAILING_PUNCT: OnceLock<Regex> = OnceLock::new();
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let trailing =
        TRAILING_PUNCT.get_or_init(|| Regex::new(r"[.!?,;:]+$").expect("static regex compiles"));
    let ws = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static regex compiles"));

    let text = text.trim().to_lowercase();
    let text = trailing.replace(&text, "");
    ws.replace_all(&text, " ").into_owned()
}

/// Map an agreement ratio to a percentage confidence estimate.
///
/// Linear: 0.0 → 30%, 1.0 → 85%, clamped to [30, 95]. Never claim 100%
/// and never go below 30%. Monotonic and deterministic.
fn ratio_to_pct(ratio: f64) -> f64 {
    let pct = 30.0 + ratio * 55.0;
    (pct.clamp(30.0, 95.0) * 10.0).round() / 10.0
}

/// Map an agreement ratio to a confidence level.
///
/// For the default budget of 3: 3/3 → High, 2/3 → Medium, 1/3 → Low.
fn ratio_to_level(ratio: f64) -> ConfidenceLevel {
    if ratio >= 1.0 {
        ConfidenceLevel::High
    } else if ratio >= 2.0 / 3.0 {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

/// Greedy clustering: each answer joins the first class whose representative
/// it is equivalent to, otherwise it opens a new class.
fn cluster_answers(answers: &[String], clusterer: &dyn AnswerClusterer) -> Vec<SampledAnswer> {
    let mut representatives: Vec<&str> = Vec::new();
    let mut tagged = Vec::with_capacity(answers.len());

    for answer in answers {
        let class_id = representatives
            .iter()
            .position(|rep| clusterer.equivalent(rep, answer))
            .unwrap_or_else(|| {
                representatives.push(answer);
                representatives.len() - 1
            });
        tagged.push(SampledAnswer {
            answer: answer.clone(),
            class_id,
        });
    }
    tagged
}

/// Aggregate clustered samples into a [`SampleResult`].
fn aggregate(
    prompt: &str,
    answers: Vec<String>,
    failed_calls: usize,
    clusterer: &dyn AnswerClusterer,
) -> SampleResult {
    let samples = cluster_answers(&answers, clusterer);

    let class_count = samples
        .iter()
        .map(|s| s.class_id)
        .max()
        .map_or(0, |max| max + 1);
    let mut class_sizes = vec![0usize; class_count];
    for s in &samples {
        class_sizes[s.class_id] += 1;
    }

    let (majority_class, majority_size) = class_sizes
        .iter()
        .enumerate()
        .max_by_key(|(_, size)| **size)
        .map(|(id, size)| (id, *size))
        .unwrap_or((0, 0));

    let total = samples.len();
    let agreement_ratio = if total == 0 {
        0.0
    } else {
        majority_size as f64 / total as f64
    };

    // Fewer than two valid samples cannot support a majority judgment.
    let insufficient_data = total < 2;
    let (confidence_level, confidence_pct) = if insufficient_data {
        (ConfidenceLevel::Low, 30.0)
    } else {
        (ratio_to_level(agreement_ratio), ratio_to_pct(agreement_ratio))
    };

    let majority_answer = if majority_size > 1 || total == 1 {
        samples
            .iter()
            .find(|s| s.class_id == majority_class)
            .map(|s| s.answer.clone())
    } else {
        None
    };

    SampleResult {
        prompt: prompt.to_string(),
        samples,
        failed_calls,
        agreement_ratio,
        confidence_level,
        confidence_pct,
        majority_answer,
        insufficient_data,
    }
}

/// Answer-producing capability for callers that prefer a trait object to a
/// closure, e.g. an SDK client struct shared across checks.
#[async_trait]
pub trait AnswerAgent: Send + Sync {
    /// Produce one independent answer for `prompt`.
    async fn answer(&self, prompt: &str) -> anyhow::Result<String>;
}

/// [`sample_consistency`] over a shared [`AnswerAgent`].
pub async fn sample_consistency_agent(
    agent: Arc<dyn AnswerAgent>,
    prompt: &str,
    n: usize,
) -> Result<SampleResult> {
    sample_consistency(
        move |p: String| {
            let agent = Arc::clone(&agent);
            async move { agent.answer(&p).await }
        },
        prompt,
        n,
    )
    .await
}

/// Run a Budget-CoCoA consistency check with the default clustering strategy.
///
/// Invokes `agent_fn` `n` times concurrently on the same prompt, clusters
/// the answers, and derives agreement ratio plus confidence classification.
/// Each invocation is treated as independent; callers are responsible for
/// varying any stochastic seed.
///
/// # Errors
///
/// [`TrustError::InvalidSampleCount`] when `n < 2`.
/// [`TrustError::SamplingExhausted`] when every invocation fails. Partial
/// failures are recovered by excluding the failed samples; fewer than two
/// survivors force a Low result with `insufficient_data` set.
pub async fn sample_consistency<F, Fut>(agent_fn: F, prompt: &str, n: usize) -> Result<SampleResult>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
{
    sample_consistency_with(agent_fn, prompt, n, &NormalizedMatch).await
}

/// [`sample_consistency`] with an injected [`AnswerClusterer`].
pub async fn sample_consistency_with<F, Fut>(
    agent_fn: F,
    prompt: &str,
    n: usize,
    clusterer: &dyn AnswerClusterer,
) -> Result<SampleResult>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
{
    if n < 2 {
        return Err(TrustError::InvalidSampleCount { n });
    }

    let agent_fn = Arc::new(agent_fn);
    let mut tasks: Vec<JoinHandle<anyhow::Result<String>>> = Vec::with_capacity(n);

    for i in 0..n {
        let agent_fn = Arc::clone(&agent_fn);
        let prompt = prompt.to_string();
        debug!(sample = i, "dispatching consistency sample");
        tasks.push(tokio::spawn(async move { agent_fn(prompt).await }));
    }

    // Settle every task before aggregating; one failure must not abort the
    // samples already in flight.
    let mut answers = Vec::with_capacity(n);
    let mut failed_calls = 0usize;
    let mut last_error = String::new();

    for (i, task) in tasks.into_iter().enumerate() {
        match task.await {
            Ok(Ok(answer)) => answers.push(answer),
            Ok(Err(e)) => {
                warn!(sample = i, error = %e, "sample call failed; excluding it");
                failed_calls += 1;
                last_error = e.to_string();
            }
            Err(join_err) => {
                warn!(sample = i, error = %join_err, "sample task panicked; excluding it");
                failed_calls += 1;
                last_error = join_err.to_string();
            }
        }
    }

    if answers.is_empty() {
        return Err(TrustError::SamplingExhausted {
            attempted: n,
            last_error,
        });
    }

    METRICS.add_samples_taken(answers.len() as u64);
    let result = aggregate(prompt, answers, failed_calls, clusterer);
    crate::obs::emit_samples_collected(
        prompt,
        result.samples.len(),
        failed_calls,
        result.agreement_ratio,
    );
    Ok(result)
}

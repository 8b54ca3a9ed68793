//! Trust scores for AI agents: track calibration over time.
//!
//! An agent's trust score reflects how well-calibrated its confidence is.
//! Honest uncertainty is rewarded; overconfidence is penalized. Over time
//! this produces a credit score that controls how much human oversight the
//! agent's outputs receive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Floor of the trust score range.
pub const MIN_SCORE: i32 = 0;
/// Ceiling of the trust score range.
pub const MAX_SCORE: i32 = 100;
/// Neutral prior for an agent with no history.
pub const INITIAL_SCORE: i32 = 50;

/// Autonomy level derived from the cumulative trust score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    /// 0–30: QA reviews everything.
    Untrusted,
    /// 31–60: QA reviews flagged items.
    LowTrust,
    /// 61–80: QA spot-checks 20%.
    SpotCheck,
    /// 81–100: direct delivery.
    Autonomous,
}

impl TrustLevel {
    /// Derive the level from a score. Pure function of its input.
    pub fn from_score(score: i32) -> Self {
        match score {
            i32::MIN..=30 => Self::Untrusted,
            31..=60 => Self::LowTrust,
            61..=80 => Self::SpotCheck,
            _ => Self::Autonomous,
        }
    }

    /// Fraction of outputs QA should review at this level.
    pub fn qa_sample_rate(self) -> f64 {
        match self {
            Self::Untrusted => 1.0,
            Self::LowTrust => 0.5,
            Self::SpotCheck => 0.2,
            Self::Autonomous => 0.0,
        }
    }
}

impl std::fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Untrusted => write!(f, "untrusted"),
            Self::LowTrust => write!(f, "low_trust"),
            Self::SpotCheck => write!(f, "spot_check"),
            Self::Autonomous => write!(f, "autonomous"),
        }
    }
}

/// Closed taxonomy of trust-relevant outcomes.
///
/// An unrecognized outcome cannot be expressed; integrators that need more
/// kinds extend this enum so exhaustiveness stays checkable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Output was correct / accepted.
    Good,
    /// Output was wrong / rejected.
    Bad,
    /// Agent flagged low confidence and the concern was substantiated.
    FlaggedReal,
    /// Agent flagged a concern that was not substantiated.
    FlaggedFalsePositive,
    /// QA found a problem the agent did not flag.
    HiddenProblem,
}

/// A single trust-relevant event in an agent's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustEvent {
    pub at: DateTime<Utc>,
    /// What the agent claimed (0–100).
    pub stated_confidence: f64,
    pub outcome: Outcome,
    /// Points added to or removed from the score.
    pub delta: i32,
    /// Human-readable explanation.
    pub reason: String,
}

/// Serializable view of a trust score, sufficient for an external store to
/// snapshot and restore it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustScoreSnapshot {
    pub agent_id: String,
    pub score: i32,
    pub history: Vec<TrustEvent>,
}

/// Confidence-aware delta for an outcome.
///
/// Step interpolation between the documented anchors: high stated confidence
/// paired with a bad outcome is penalized more heavily than low confidence
/// paired with the same outcome. `Good` never yields a negative delta and
/// `FlaggedReal` is always non-negative.
pub fn outcome_delta(stated_confidence: f64, outcome: Outcome) -> i32 {
    match outcome {
        Outcome::Good => 1,
        Outcome::Bad => {
            if stated_confidence >= 80.0 {
                -3
            } else {
                -1
            }
        }
        Outcome::FlaggedReal => 2,
        Outcome::FlaggedFalsePositive => -1,
        Outcome::HiddenProblem => -3,
    }
}

/// Tracks one agent's trust score over time.
///
/// Mutated only through [`TrustScore::update`], which appends to the
/// append-only history atomically with the score change. The score never
/// leaves [0, 100]; the clamp is the error-handling policy for out-of-range
/// deltas, not an exception path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustScore {
    agent_id: String,
    score: i32,
    history: Vec<TrustEvent>,
}

impl TrustScore {
    /// New score at the neutral prior of 50.
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            score: INITIAL_SCORE,
            history: Vec::new(),
        }
    }

    /// Rebuild from a persisted snapshot.
    pub fn from_snapshot(snapshot: TrustScoreSnapshot) -> Self {
        Self {
            agent_id: snapshot.agent_id,
            score: snapshot.score.clamp(MIN_SCORE, MAX_SCORE),
            history: snapshot.history,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Current trust score, always within [0, 100].
    pub fn score(&self) -> i32 {
        self.score
    }

    /// Current autonomy level.
    pub fn trust_level(&self) -> TrustLevel {
        TrustLevel::from_score(self.score)
    }

    /// Whether this agent's outputs still need QA review.
    pub fn needs_qa(&self) -> bool {
        self.trust_level() != TrustLevel::Autonomous
    }

    /// Append-only history of updates.
    pub fn history(&self) -> &[TrustEvent] {
        &self.history
    }

    /// Snapshot for external persistence.
    pub fn snapshot(&self) -> TrustScoreSnapshot {
        TrustScoreSnapshot {
            agent_id: self.agent_id.clone(),
            score: self.score,
            history: self.history.clone(),
        }
    }

    /// Record a trust event and apply its delta, clamped into [0, 100].
    ///
    /// Returns the delta that was applied (before clamping of the score).
    /// The history entry is appended together with the score mutation, so
    /// no update can be lost between the two.
    pub fn update(&mut self, stated_confidence: f64, outcome: Outcome) -> i32 {
        let stated_confidence = stated_confidence.clamp(0.0, 100.0);
        let delta = outcome_delta(stated_confidence, outcome);
        let reason = match outcome {
            Outcome::Good => format!("good output (stated {stated_confidence:.0}%)"),
            Outcome::Bad if stated_confidence >= 80.0 => format!(
                "bad output with high confidence ({stated_confidence:.0}%), overconfident"
            ),
            Outcome::Bad => {
                format!("bad output with low confidence ({stated_confidence:.0}%), at least honest")
            }
            Outcome::FlaggedReal => "flagged uncertainty that was confirmed real".to_string(),
            Outcome::FlaggedFalsePositive => {
                "flagged a concern that was not substantiated".to_string()
            }
            Outcome::HiddenProblem => "QA found a problem the agent did not flag".to_string(),
        };

        self.score = (self.score + delta).clamp(MIN_SCORE, MAX_SCORE);
        self.history.push(TrustEvent {
            at: Utc::now(),
            stated_confidence,
            outcome,
            delta,
            reason,
        });

        debug!(
            agent_id = %self.agent_id,
            score = self.score,
            delta,
            level = %self.trust_level(),
            "trust score updated"
        );
        delta
    }
}

impl std::fmt::Display for TrustScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TrustScore({}: {} [{}], {} events)",
            self.agent_id,
            self.score,
            self.trust_level(),
            self.history.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_level_boundaries() {
        assert_eq!(TrustLevel::from_score(0), TrustLevel::Untrusted);
        assert_eq!(TrustLevel::from_score(30), TrustLevel::Untrusted);
        assert_eq!(TrustLevel::from_score(31), TrustLevel::LowTrust);
        assert_eq!(TrustLevel::from_score(60), TrustLevel::LowTrust);
        assert_eq!(TrustLevel::from_score(61), TrustLevel::SpotCheck);
        assert_eq!(TrustLevel::from_score(80), TrustLevel::SpotCheck);
        assert_eq!(TrustLevel::from_score(81), TrustLevel::Autonomous);
        assert_eq!(TrustLevel::from_score(100), TrustLevel::Autonomous);
    }

    #[test]
    fn test_needs_qa_only_autonomous_exempt() {
        for (score, expected) in [(0, true), (31, true), (80, true), (81, false)] {
            let mut ts = TrustScore::new("a");
            ts.score = score;
            assert_eq!(ts.needs_qa(), expected, "score {score}");
        }
    }

    #[test]
    fn test_anchor_scenario() {
        let mut ts = TrustScore::new("writer-agent");
        assert_eq!(ts.score(), 50);

        assert_eq!(ts.update(85.0, Outcome::Good), 1);
        assert_eq!(ts.score(), 51);

        assert_eq!(ts.update(95.0, Outcome::Bad), -3);
        assert_eq!(ts.score(), 48);

        assert_eq!(ts.update(50.0, Outcome::FlaggedReal), 2);
        assert_eq!(ts.score(), 50);
    }

    #[test]
    fn test_bad_penalty_non_decreasing_in_confidence() {
        let mut prev = 0;
        for conf in 0..=100 {
            let penalty = -outcome_delta(conf as f64, Outcome::Bad);
            assert!(penalty >= prev);
            prev = penalty;
        }
    }

    #[test]
    fn test_good_never_negative_flagged_real_never_negative() {
        for conf in [0.0, 50.0, 99.0, 100.0] {
            assert!(outcome_delta(conf, Outcome::Good) >= 0);
            assert!(outcome_delta(conf, Outcome::FlaggedReal) >= 0);
        }
    }

    #[test]
    fn test_clamping_is_idempotent_at_both_bounds() {
        let mut ts = TrustScore::new("a");
        for _ in 0..100 {
            ts.update(95.0, Outcome::Bad);
        }
        assert_eq!(ts.score(), 0);
        // Further penalties clamp again, never underflow.
        ts.update(95.0, Outcome::Bad);
        assert_eq!(ts.score(), 0);

        for _ in 0..200 {
            ts.update(50.0, Outcome::FlaggedReal);
        }
        assert_eq!(ts.score(), 100);
        ts.update(85.0, Outcome::Good);
        assert_eq!(ts.score(), 100);
    }

    #[test]
    fn test_history_appended_per_update() {
        let mut ts = TrustScore::new("a");
        ts.update(85.0, Outcome::Good);
        ts.update(95.0, Outcome::Bad);
        assert_eq!(ts.history().len(), 2);
        assert_eq!(ts.history()[0].delta, 1);
        assert_eq!(ts.history()[1].delta, -3);
        assert!(ts.history()[1].reason.contains("overconfident"));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut ts = TrustScore::new("a");
        ts.update(85.0, Outcome::Good);
        let snap = ts.snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let back: TrustScoreSnapshot = serde_json::from_str(&json).unwrap();
        let restored = TrustScore::from_snapshot(back);
        assert_eq!(restored.score(), ts.score());
        assert_eq!(restored.history().len(), 1);
    }

    #[test]
    fn test_qa_sample_rate() {
        assert_eq!(TrustLevel::Untrusted.qa_sample_rate(), 1.0);
        assert_eq!(TrustLevel::LowTrust.qa_sample_rate(), 0.5);
        assert_eq!(TrustLevel::SpotCheck.qa_sample_rate(), 0.2);
        assert_eq!(TrustLevel::Autonomous.qa_sample_rate(), 0.0);
    }
}

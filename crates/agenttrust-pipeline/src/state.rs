//! Pipeline state machine vocabulary.

use serde::{Deserialize, Serialize};

/// Stages of one pipeline run. `Deliver` and `Fail` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Fixes tier and revision budget; initial state.
    Plan,
    /// Invokes the agent callable.
    Execute,
    /// Scores the output against the rubric.
    Review,
    /// Output passed and is handed to the caller.
    Deliver,
    /// Review asked for another attempt.
    Revise,
    /// Terminal failure.
    Fail,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Deliver | Self::Fail)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plan => write!(f, "plan"),
            Self::Execute => write!(f, "execute"),
            Self::Review => write!(f, "review"),
            Self::Deliver => write!(f, "deliver"),
            Self::Revise => write!(f, "revise"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// Why a run terminated in `Fail`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailReason {
    /// Review returned a FAIL verdict; no revision is attempted.
    RubricFail,
    /// REVISE verdicts exhausted the revision budget.
    RevisionLimitExceeded { max_revisions: u32 },
}

impl std::fmt::Display for FailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RubricFail => write!(f, "rubric verdict was FAIL"),
            Self::RevisionLimitExceeded { max_revisions } => {
                write!(f, "revision limit exceeded ({max_revisions} revisions)")
            }
        }
    }
}

/// Terminal disposition of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Disposition {
    /// Passed review; the agent's trust level allows direct delivery.
    Delivered,
    /// Passed review but the agent still needs QA; delivery is conditional
    /// on an external human review.
    Flagged,
    /// Terminal failure at the review stage.
    Failed { reason: FailReason },
}

impl Disposition {
    /// Which stage terminated the run.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Delivered | Self::Flagged => Stage::Deliver,
            Self::Failed { .. } => Stage::Fail,
        }
    }
}

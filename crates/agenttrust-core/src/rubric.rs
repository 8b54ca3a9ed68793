//! Eight-dimension quality rubric for agent output review.
//!
//! Each dimension is graded 0–2 for a maximum total of 16. Verdict
//! thresholds are tier-parameterized: tier 1 (quick lookups) passes at
//! 10/16, tier 2 (standard briefs) at 12/16, tier 3 (deep dives) at 14/16.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrustError};

/// The fixed review dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Accuracy,
    Completeness,
    Sources,
    Clarity,
    EpistemicHonesty,
    Actionability,
    Calibration,
    RiskAwareness,
}

impl Dimension {
    /// All dimensions, in rubric order.
    pub const ALL: [Dimension; 8] = [
        Self::Accuracy,
        Self::Completeness,
        Self::Sources,
        Self::Clarity,
        Self::EpistemicHonesty,
        Self::Actionability,
        Self::Calibration,
        Self::RiskAwareness,
    ];

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Accuracy => "Factual Accuracy",
            Self::Completeness => "Completeness",
            Self::Sources => "Source Quality",
            Self::Clarity => "Clarity & Structure",
            Self::EpistemicHonesty => "Epistemic Honesty",
            Self::Actionability => "Actionability",
            Self::Calibration => "Confidence Calibration",
            Self::RiskAwareness => "Risk Awareness",
        }
    }

    /// What a grade of Missing (0) means for this dimension.
    pub fn missing_description(self) -> &'static str {
        match self {
            Self::Accuracy => "contains factual errors or unverifiable claims",
            Self::Completeness => "major aspects missing",
            Self::Sources => "no sources or irrelevant sources",
            Self::Clarity => "disorganized or hard to follow",
            Self::EpistemicHonesty => "presents speculation as fact, no uncertainty flagged",
            Self::Actionability => "no actionable takeaways",
            Self::Calibration => "no confidence stated or wildly miscalibrated",
            Self::RiskAwareness => "no risks mentioned despite obvious ones",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Grade for one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    /// Missing or fundamentally flawed.
    Missing,
    /// Present but incomplete or has issues.
    Partial,
    /// Solid, meets expectations.
    Solid,
}

impl Grade {
    /// Points this grade contributes to the total.
    pub fn points(self) -> u8 {
        match self {
            Self::Missing => 0,
            Self::Partial => 1,
            Self::Solid => 2,
        }
    }
}

/// Grade for one dimension, with optional reviewer rationale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: Dimension,
    pub grade: Grade,
    pub rationale: Option<String>,
}

/// A fully scored rubric.
///
/// # Invariants
///
/// Contains exactly one score per dimension; `total()` is always in [0, 16].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricScore {
    scores: Vec<DimensionScore>,
}

impl RubricScore {
    /// Build from one score per dimension.
    ///
    /// The caller supplies scores in any order; they are stored in rubric
    /// order. Duplicated or missing dimensions are a programming error and
    /// panic in debug builds.
    pub fn new(mut scores: Vec<DimensionScore>) -> Self {
        debug_assert_eq!(scores.len(), Dimension::ALL.len());
        scores.sort_by_key(|s| Dimension::ALL.iter().position(|d| *d == s.dimension));
        Self { scores }
    }

    /// Per-dimension scores in rubric order.
    pub fn scores(&self) -> &[DimensionScore] {
        &self.scores
    }

    /// Grade for one dimension.
    pub fn grade(&self, dimension: Dimension) -> Option<Grade> {
        self.scores
            .iter()
            .find(|s| s.dimension == dimension)
            .map(|s| s.grade)
    }

    /// Sum of all dimension points (0–16).
    pub fn total(&self) -> u8 {
        self.scores.iter().map(|s| s.grade.points()).sum()
    }

    /// Dimensions graded Missing.
    pub fn weakest(&self) -> Vec<Dimension> {
        self.scores
            .iter()
            .filter(|s| s.grade == Grade::Missing)
            .map(|s| s.dimension)
            .collect()
    }
}

/// Review strictness tier, validated to 1..=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Tier(u8);

impl TryFrom<u8> for Tier {
    type Error = TrustError;

    fn try_from(tier: u8) -> Result<Self> {
        Self::new(tier)
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> u8 {
        tier.0
    }
}

impl Tier {
    /// Quick lookups.
    pub const QUICK: Tier = Tier(1);
    /// Standard research briefs.
    pub const STANDARD: Tier = Tier(2);
    /// Deep dives.
    pub const DEEP: Tier = Tier(3);

    /// Validate a raw tier number.
    ///
    /// # Errors
    ///
    /// [`TrustError::InvalidTier`] outside 1..=3.
    pub fn new(tier: u8) -> Result<Self> {
        if (1..=3).contains(&tier) {
            Ok(Self(tier))
        } else {
            Err(TrustError::InvalidTier { tier })
        }
    }

    pub fn as_u8(self) -> u8 {
        self.0
    }

    /// Minimum total for a PASS verdict. Non-decreasing in the tier.
    pub fn pass_threshold(self) -> u8 {
        match self.0 {
            1 => 10,
            2 => 12,
            _ => 14,
        }
    }

    /// Minimum total for a REVISE verdict (below it: FAIL). Non-decreasing
    /// in the tier and always ≤ the pass threshold.
    pub fn revise_threshold(self) -> u8 {
        self.0 * 4
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tier {}", self.0)
    }
}

/// Categorical outcome of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Revise,
    Fail,
}

impl Verdict {
    /// Pure, deterministic function of `(total, tier)`.
    pub fn from_total(total: u8, tier: Tier) -> Self {
        if total >= tier.pass_threshold() {
            Self::Pass
        } else if total >= tier.revise_threshold() {
            Self::Revise
        } else {
            Self::Fail
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Revise => write!(f, "REVISE"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

//! Adversarial reviewer: score agent outputs against the eight-dimension
//! rubric. The reviewer's job is to find errors, not confirm quality.
//!
//! Scoring goes through the [`DimensionScorer`] trait; the default
//! [`HeuristicScorer`] checks deterministic signals in the output and its
//! Beipackzettel. Production deployments plug an LLM-backed scorer into the
//! same seam.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::beipackzettel::{Beipackzettel, RiskLevel};
use crate::metrics::METRICS;
use crate::rubric::{Dimension, DimensionScore, Grade, RubricScore, Tier, Verdict};

/// Complete review of one agent output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewResult {
    pub rubric: RubricScore,
    pub verdict: Verdict,
    pub tier: Tier,
    /// Specific issues found (one per dimension graded Missing).
    pub issues: Vec<String>,
}

impl ReviewResult {
    pub fn total(&self) -> u8 {
        self.rubric.total()
    }
}

/// Grades a single rubric dimension for an output and its Beipackzettel.
pub trait DimensionScorer: Send + Sync {
    fn grade(
        &self,
        output: &str,
        insert: &Beipackzettel,
        dimension: Dimension,
    ) -> (Grade, Option<String>);
}

/// Review an output against the rubric with the default heuristic scorer.
pub fn review(output: &str, insert: &Beipackzettel, tier: Tier) -> ReviewResult {
    review_with(output, insert, tier, &HeuristicScorer)
}

/// Review with an injected [`DimensionScorer`].
pub fn review_with(
    output: &str,
    insert: &Beipackzettel,
    tier: Tier,
    scorer: &dyn DimensionScorer,
) -> ReviewResult {
    let mut scores = Vec::with_capacity(Dimension::ALL.len());
    let mut issues = Vec::new();

    for dimension in Dimension::ALL {
        let (grade, rationale) = scorer.grade(output, insert, dimension);
        if grade == Grade::Missing {
            issues.push(format!(
                "{}: {}",
                dimension.name(),
                dimension.missing_description()
            ));
        }
        scores.push(DimensionScore {
            dimension,
            grade,
            rationale,
        });
    }

    let rubric = RubricScore::new(scores);
    let verdict = Verdict::from_total(rubric.total(), tier);
    METRICS.inc_reviews_scored();
    debug!(total = rubric.total(), %verdict, %tier, "output reviewed");

    ReviewResult {
        rubric,
        verdict,
        tier,
        issues,
    }
}

/// Deterministic signal-based scorer, suitable as a floor and for tests.
///
/// Not a replacement for LLM-based review: it checks structural signals in
/// the output text and consistency rules against the Beipackzettel.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicScorer;

impl HeuristicScorer {
    fn count_signals(text: &str, signals: &[&str]) -> usize {
        signals.iter().filter(|s| text.contains(*s)).count()
    }

    fn grade_from_hits(hits: usize) -> Grade {
        match hits {
            0 => Grade::Missing,
            1 => Grade::Partial,
            _ => Grade::Solid,
        }
    }

    /// A source counts as specific when it looks resolvable: a URL, DOI,
    /// or path-like reference rather than a bare label.
    fn is_specific_source(source: &str) -> bool {
        let s = source.to_lowercase();
        s.starts_with("http") || s.contains("doi") || s.contains('/') || s.contains('.')
    }
}

impl DimensionScorer for HeuristicScorer {
    fn grade(
        &self,
        output: &str,
        insert: &Beipackzettel,
        dimension: Dimension,
    ) -> (Grade, Option<String>) {
        let text = output.to_lowercase();
        match dimension {
            // Accuracy cannot be verified heuristically; grade it benefit-of-doubt.
            Dimension::Accuracy => (Grade::Partial, Some("not verifiable heuristically".into())),

            Dimension::Completeness => {
                let grade = if output.len() < 50 {
                    Grade::Missing
                } else if output.len() < 200 {
                    Grade::Partial
                } else {
                    Grade::Solid
                };
                (grade, None)
            }

            Dimension::Sources => {
                if !insert.is_grounded() {
                    return (Grade::Missing, Some("output cites no sources".into()));
                }
                // Solid only for grounded output with specific, verifiable
                // references.
                if insert.sources().iter().any(|s| Self::is_specific_source(s)) {
                    (Grade::Solid, None)
                } else {
                    (Grade::Partial, Some("sources are vague labels".into()))
                }
            }

            Dimension::Clarity => {
                let hits = Self::count_signals(&text, &["\n\n", "## ", "- ", "1. "]);
                (Self::grade_from_hits(hits), None)
            }

            Dimension::EpistemicHonesty => {
                // Anything below 90% confidence must name its uncertainties.
                if insert.confidence() < 90.0 && insert.uncertainties().is_empty() {
                    let hedged = Self::count_signals(
                        &text,
                        &["uncertain", "might", "unclear", "not sure", "assumption"],
                    ) > 0;
                    if hedged {
                        (
                            Grade::Partial,
                            Some("hedging in prose but no explicit uncertainties".into()),
                        )
                    } else {
                        (
                            Grade::Missing,
                            Some(format!(
                                "confidence {:.0}% with no stated uncertainties",
                                insert.confidence()
                            )),
                        )
                    }
                } else {
                    (Grade::Solid, None)
                }
            }

            Dimension::Actionability => {
                let hits = Self::count_signals(
                    &text,
                    &["recommend", "next step", "should", "action", "todo"],
                );
                (Self::grade_from_hits(hits), None)
            }

            Dimension::Calibration => {
                let conf = insert.confidence();
                let risk = insert.risk_level();
                // Stated confidence conflicting with derived risk is the
                // miscalibration signal.
                if conf >= 80.0 && risk == RiskLevel::High {
                    (
                        Grade::Missing,
                        Some(format!("{conf:.0}% confidence despite {risk} risk")),
                    )
                } else {
                    let consistent = matches!(
                        (risk, conf),
                        (RiskLevel::Low, c) if c >= 80.0
                    ) || matches!(
                        (risk, conf),
                        (RiskLevel::Medium, c) if (50.0..90.0).contains(&c)
                    ) || matches!(
                        (risk, conf),
                        (RiskLevel::High, c) if c < 50.0
                    );
                    if consistent {
                        (Grade::Solid, None)
                    } else {
                        (Grade::Partial, Some("confidence loosely calibrated".into()))
                    }
                }
            }

            Dimension::RiskAwareness => {
                let hits = insert.risks().len()
                    + Self::count_signals(
                        &text,
                        &["risk", "caveat", "limitation", "warning", "might fail"],
                    );
                (Self::grade_from_hits(hits), None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beipackzettel::BeipackzettelDraft;

    fn insert(confidence: f64) -> Beipackzettel {
        Beipackzettel::from_draft(BeipackzettelDraft::new(confidence, "test-model")).unwrap()
    }

    fn strong_output() -> String {
        let mut s = String::from("## Findings\n\n");
        s.push_str("- The capital is Paris, confirmed across sources.\n");
        s.push_str("- We recommend citing the 2024 census as the next step.\n\n");
        s.push_str("One limitation: census data lags a year. ");
        s.push_str(&"Further supporting detail follows here. ".repeat(5));
        s
    }

    #[test]
    fn test_strong_grounded_output_passes_standard_tier() {
        let bpz = Beipackzettel::from_draft(
            BeipackzettelDraft::new(85.0, "test-model")
                .with_source("https://en.wikipedia.org/wiki/Paris")
                .with_uncertainty("census figures lag by one year"),
        )
        .unwrap();
        let result = review(&strong_output(), &bpz, Tier::STANDARD);
        assert_eq!(result.verdict, Verdict::Pass, "total {}", result.total());
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_ungrounded_output_scores_sources_missing() {
        let result = review(&strong_output(), &insert(85.0), Tier::STANDARD);
        assert_eq!(result.rubric.grade(Dimension::Sources), Some(Grade::Missing));
        assert!(result.issues.iter().any(|i| i.contains("Source Quality")));
    }

    #[test]
    fn test_vague_sources_are_partial() {
        let bpz = Beipackzettel::from_draft(
            BeipackzettelDraft::new(85.0, "m").with_source("my memory"),
        )
        .unwrap();
        let result = review(&strong_output(), &bpz, Tier::STANDARD);
        assert_eq!(result.rubric.grade(Dimension::Sources), Some(Grade::Partial));
    }

    #[test]
    fn test_low_confidence_without_uncertainties_fails_honesty() {
        let result = review("Short unhedged claim text.", &insert(60.0), Tier::STANDARD);
        assert_eq!(
            result.rubric.grade(Dimension::EpistemicHonesty),
            Some(Grade::Missing)
        );
    }

    #[test]
    fn test_stated_uncertainties_satisfy_honesty() {
        let bpz = Beipackzettel::from_draft(
            BeipackzettelDraft::new(60.0, "m").with_uncertainty("date unverified"),
        )
        .unwrap();
        let result = review("Short claim.", &bpz, Tier::STANDARD);
        assert_eq!(
            result.rubric.grade(Dimension::EpistemicHonesty),
            Some(Grade::Solid)
        );
    }

    #[test]
    fn test_confident_but_high_risk_is_miscalibrated() {
        let bpz = Beipackzettel::from_draft(
            BeipackzettelDraft::new(90.0, "m")
                .with_risk("a")
                .with_risk("b")
                .with_risk("c"),
        )
        .unwrap();
        let result = review(&strong_output(), &bpz, Tier::STANDARD);
        assert_eq!(
            result.rubric.grade(Dimension::Calibration),
            Some(Grade::Missing)
        );
    }

    #[test]
    fn test_short_output_fails_completeness() {
        let result = review("Paris.", &insert(85.0), Tier::QUICK);
        assert_eq!(
            result.rubric.grade(Dimension::Completeness),
            Some(Grade::Missing)
        );
    }

    #[test]
    fn test_same_input_same_verdict() {
        let bpz = insert(70.0);
        let a = review(&strong_output(), &bpz, Tier::DEEP);
        let b = review(&strong_output(), &bpz, Tier::DEEP);
        assert_eq!(a, b);
    }

    #[test]
    fn test_stricter_tier_can_downgrade_verdict() {
        // A middling output gets another chance at tier 1 but fails tier 3.
        let bpz = Beipackzettel::from_draft(
            BeipackzettelDraft::new(85.0, "m").with_source("notes.txt"),
        )
        .unwrap();
        let text = format!("Summary without structure. {}", "Filler text. ".repeat(20));
        let quick = review(&text, &bpz, Tier::QUICK);
        let deep = review(&text, &bpz, Tier::DEEP);
        assert_eq!(quick.total(), deep.total());
        assert_eq!(quick.verdict, Verdict::Revise);
        assert_eq!(deep.verdict, Verdict::Fail);
    }
}

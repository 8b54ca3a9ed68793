//! Beipackzettel: mandatory metadata attached to every agent output.
//!
//! German for "package insert": like the safety leaflet that ships with
//! medicine. An agent output without one is treated as unreviewable.
//! Construction is the only mutation point; everything derived
//! (`risk_level`, `is_grounded`, `has_gaps`) is recomputed on access.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrustError};

/// Qualitative risk classification derived from a Beipackzettel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// High confidence, nothing flagged.
    Low,
    /// Some flags or middling confidence.
    Medium,
    /// Low confidence or several known risks.
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Unvalidated Beipackzettel as produced by an agent.
///
/// This is the only path from untrusted agent output (typically JSON) into a
/// validated [`Beipackzettel`]. Required fields are `Option` so that absence
/// is distinguishable from an empty value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeipackzettelDraft {
    pub confidence: Option<f64>,
    pub sources: Option<BTreeSet<String>>,
    pub uncertainties: Option<Vec<String>>,
    pub risks: Option<Vec<String>>,
    pub not_checked: Option<Vec<String>>,
    pub model: Option<String>,
}

impl BeipackzettelDraft {
    /// Convenience constructor for the common case.
    pub fn new(confidence: f64, model: impl Into<String>) -> Self {
        Self {
            confidence: Some(confidence),
            sources: Some(BTreeSet::new()),
            uncertainties: Some(Vec::new()),
            risks: Some(Vec::new()),
            not_checked: Some(Vec::new()),
            model: Some(model.into()),
        }
    }

    /// Add a source (builder pattern).
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.sources
            .get_or_insert_with(BTreeSet::new)
            .insert(source.into());
        self
    }

    /// Add an uncertainty (builder pattern).
    pub fn with_uncertainty(mut self, uncertainty: impl Into<String>) -> Self {
        self.uncertainties
            .get_or_insert_with(Vec::new)
            .push(uncertainty.into());
        self
    }

    /// Add a known risk (builder pattern).
    pub fn with_risk(mut self, risk: impl Into<String>) -> Self {
        self.risks.get_or_insert_with(Vec::new).push(risk.into());
        self
    }

    /// Add an unchecked assumption (builder pattern).
    pub fn with_not_checked(mut self, item: impl Into<String>) -> Self {
        self.not_checked
            .get_or_insert_with(Vec::new)
            .push(item.into());
        self
    }
}

/// Validated, immutable metadata record for one agent output.
///
/// # Invariants
///
/// `confidence` is always within [0, 100]; `model` is always present.
/// Empty `sources` is valid (it means "pure generation, no grounding";
/// a red flag the reviewer scores accordingly, not a construction error).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beipackzettel {
    confidence: f64,
    sources: BTreeSet<String>,
    uncertainties: Vec<String>,
    risks: Vec<String>,
    not_checked: Vec<String>,
    model: String,
}

impl Beipackzettel {
    /// Validate a draft into a Beipackzettel.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::MalformedBeipackzettel`] when `confidence` or
    /// `model` is absent, or when `confidence` falls outside [0, 100].
    /// Absent optional sequences default to empty.
    pub fn from_draft(draft: BeipackzettelDraft) -> Result<Self> {
        let confidence = draft.confidence.ok_or_else(|| {
            TrustError::MalformedBeipackzettel("required field 'confidence' is absent".to_string())
        })?;
        if !(0.0..=100.0).contains(&confidence) {
            return Err(TrustError::MalformedBeipackzettel(format!(
                "confidence must be within 0..=100, got {confidence}"
            )));
        }
        let model = draft.model.ok_or_else(|| {
            TrustError::MalformedBeipackzettel("required field 'model' is absent".to_string())
        })?;

        Ok(Self {
            confidence,
            sources: draft.sources.unwrap_or_default(),
            uncertainties: draft.uncertainties.unwrap_or_default(),
            risks: draft.risks.unwrap_or_default(),
            not_checked: draft.not_checked.unwrap_or_default(),
            model,
        })
    }

    /// Calibrated confidence in percent (0–100).
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Sources consulted; order is irrelevant.
    pub fn sources(&self) -> &BTreeSet<String> {
        &self.sources
    }

    /// Specific things the agent is uncertain about.
    pub fn uncertainties(&self) -> &[String] {
        &self.uncertainties
    }

    /// Known risks or failure modes if someone acts on the output.
    pub fn risks(&self) -> &[String] {
        &self.risks
    }

    /// Assumptions that were made but not verified.
    pub fn not_checked(&self) -> &[String] {
        &self.not_checked
    }

    /// Identifier of the model that produced the output.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether the output cites at least one source.
    pub fn is_grounded(&self) -> bool {
        !self.sources.is_empty()
    }

    /// Whether there are known unknowns (uncertainties or unchecked items).
    pub fn has_gaps(&self) -> bool {
        !self.uncertainties.is_empty() || !self.not_checked.is_empty()
    }

    /// Qualitative risk level.
    ///
    /// High when confidence < 50 or at least three risks are flagged;
    /// low when confidence ≥ 80 and nothing is flagged; medium otherwise.
    pub fn risk_level(&self) -> RiskLevel {
        if self.confidence < 50.0 || self.risks.len() >= 3 {
            RiskLevel::High
        } else if self.confidence >= 80.0 && self.risks.is_empty() {
            RiskLevel::Low
        } else {
            RiskLevel::Medium
        }
    }
}

impl std::fmt::Display for Beipackzettel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Beipackzettel ({})", self.model)?;
        writeln!(f, "  confidence: {:.0}%", self.confidence)?;
        if self.sources.is_empty() {
            writeln!(f, "  sources: none (ungrounded)")?;
        } else {
            let joined: Vec<&str> = self.sources.iter().map(String::as_str).collect();
            writeln!(f, "  sources: {}", joined.join(", "))?;
        }
        if !self.uncertainties.is_empty() {
            writeln!(f, "  uncertain: {}", self.uncertainties.join("; "))?;
        }
        if !self.risks.is_empty() {
            writeln!(f, "  risks: {}", self.risks.join("; "))?;
        }
        if !self.not_checked.is_empty() {
            writeln!(f, "  not checked: {}", self.not_checked.join("; "))?;
        }
        write!(f, "  risk level: {}", self.risk_level())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(confidence: f64) -> BeipackzettelDraft {
        BeipackzettelDraft::new(confidence, "test-model")
    }

    #[test]
    fn test_empty_sources_is_valid_but_ungrounded() {
        let bpz = Beipackzettel::from_draft(draft(72.0)).unwrap();
        assert!(!bpz.is_grounded());
        assert_eq!(bpz.confidence(), 72.0);
    }

    #[test]
    fn test_missing_confidence_fails() {
        let d = BeipackzettelDraft {
            model: Some("m".into()),
            ..Default::default()
        };
        let err = Beipackzettel::from_draft(d).unwrap_err();
        assert!(matches!(err, TrustError::MalformedBeipackzettel(_)));
        assert!(err.to_string().contains("confidence"));
    }

    #[test]
    fn test_missing_model_fails() {
        let d = BeipackzettelDraft {
            confidence: Some(50.0),
            ..Default::default()
        };
        let err = Beipackzettel::from_draft(d).unwrap_err();
        assert!(matches!(err, TrustError::MalformedBeipackzettel(_)));
    }

    #[test]
    fn test_confidence_out_of_range_fails() {
        for bad in [-0.1, 100.5, 250.0] {
            let err = Beipackzettel::from_draft(draft(bad)).unwrap_err();
            assert!(matches!(err, TrustError::MalformedBeipackzettel(_)));
        }
        // Boundary values are fine.
        assert!(Beipackzettel::from_draft(draft(0.0)).is_ok());
        assert!(Beipackzettel::from_draft(draft(100.0)).is_ok());
    }

    #[test]
    fn test_risk_level_bands() {
        // Low confidence → high risk.
        let bpz = Beipackzettel::from_draft(draft(40.0)).unwrap();
        assert_eq!(bpz.risk_level(), RiskLevel::High);

        // Three or more risks → high risk regardless of confidence.
        let d = draft(90.0).with_risk("a").with_risk("b").with_risk("c");
        let bpz = Beipackzettel::from_draft(d).unwrap();
        assert_eq!(bpz.risk_level(), RiskLevel::High);

        // High confidence, nothing flagged → low risk.
        let bpz = Beipackzettel::from_draft(draft(85.0)).unwrap();
        assert_eq!(bpz.risk_level(), RiskLevel::Low);

        // Everything else → medium.
        let d = draft(70.0).with_risk("one known risk");
        let bpz = Beipackzettel::from_draft(d).unwrap();
        assert_eq!(bpz.risk_level(), RiskLevel::Medium);
    }

    #[test]
    fn test_has_gaps() {
        let bpz = Beipackzettel::from_draft(draft(80.0)).unwrap();
        assert!(!bpz.has_gaps());

        let d = draft(80.0).with_uncertainty("publication date unverified");
        assert!(Beipackzettel::from_draft(d).unwrap().has_gaps());

        let d = draft(80.0).with_not_checked("assumed UTF-8 input");
        assert!(Beipackzettel::from_draft(d).unwrap().has_gaps());
    }

    #[test]
    fn test_draft_deserializes_from_partial_json() {
        let d: BeipackzettelDraft =
            serde_json::from_str(r#"{"confidence": 55.0, "model": "m", "sources": ["wiki"]}"#)
                .unwrap();
        let bpz = Beipackzettel::from_draft(d).unwrap();
        assert!(bpz.is_grounded());
        assert!(bpz.uncertainties().is_empty());
    }

    #[test]
    fn test_serde_roundtrip() {
        let d = draft(64.0)
            .with_source("https://arxiv.org/abs/2506.04133")
            .with_uncertainty("date")
            .with_risk("stale");
        let bpz = Beipackzettel::from_draft(d).unwrap();
        let json = serde_json::to_string(&bpz).unwrap();
        let back: Beipackzettel = serde_json::from_str(&json).unwrap();
        assert_eq!(bpz, back);
    }
}

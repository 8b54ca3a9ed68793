//! Cheaper confidence signals for when a full consistency check is too
//! expensive: verbalized-confidence extraction with an overconfidence
//! discount, and the 3-signal claim confidence formula
//! (0.5·source + 0.3·consistency + 0.2·structural).

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrustError};

/// Admiralty reliability rating for a source (NATO system, adapted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Admiralty {
    /// Reliable source, confirmed by other sources.
    A1,
    /// Reliable source, probably true.
    A2,
    /// Usually reliable, probably true.
    B2,
    /// Fairly reliable, possibly true.
    C3,
    /// Not usually reliable, doubtful.
    D4,
    /// Unreliable, probably true (contradictory).
    E2,
}

impl Admiralty {
    fn score(self) -> f64 {
        match self {
            Self::A1 => 0.95,
            Self::A2 => 0.85,
            Self::B2 => 0.70,
            Self::C3 => 0.40,
            Self::D4 => 0.20,
            Self::E2 => 0.10,
        }
    }
}

/// Verification status of a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    /// Independently verified.
    Verified,
    /// Partially verified.
    Partial,
    /// Cannot be verified.
    Unverifiable,
}

impl Verification {
    fn score(self) -> f64 {
        match self {
            Self::Verified => 1.0,
            Self::Partial => 0.5,
            Self::Unverifiable => 0.1,
        }
    }

    /// Budget-CoCoA proxy when no real consistency samples are available.
    fn consistency_proxy(self) -> f64 {
        match self {
            Self::Verified => 0.85,
            Self::Partial => 0.60,
            Self::Unverifiable => 0.30,
        }
    }
}

/// Deterministic text markers that contribute to the structural signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralMarkers {
    pub has_doi: bool,
    pub has_url: bool,
    pub has_percentage: bool,
    pub has_year: bool,
    pub has_source_ref: bool,
}

impl StructuralMarkers {
    /// Sum of marker weights, capped at 0.50.
    fn score(self) -> f64 {
        let mut s: f64 = 0.0;
        if self.has_doi {
            s += 0.30;
        }
        if self.has_url {
            s += 0.15;
        }
        if self.has_percentage {
            s += 0.10;
        }
        if self.has_year {
            s += 0.05;
        }
        if self.has_source_ref {
            s += 0.10;
        }
        s.min(0.50)
    }
}

/// Inputs to the 3-signal formula for one claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSignals {
    pub admiralty: Admiralty,
    pub verification: Verification,
    /// Year of the evidence, for the recency discount.
    pub evidence_year: Option<i32>,
    pub current_year: i32,
    pub markers: StructuralMarkers,
}

impl ClaimSignals {
    pub fn new(admiralty: Admiralty, verification: Verification, current_year: i32) -> Self {
        Self {
            admiralty,
            verification,
            evidence_year: None,
            current_year,
            markers: StructuralMarkers::default(),
        }
    }

    pub fn with_evidence_year(mut self, year: i32) -> Self {
        self.evidence_year = Some(year);
        self
    }

    pub fn with_markers(mut self, markers: StructuralMarkers) -> Self {
        self.markers = markers;
        self
    }
}

/// Per-claim result of the 3-signal confidence formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSignalResult {
    pub claim: String,
    pub source_signal: f64,
    pub consistency_signal: f64,
    pub structural_signal: f64,
    /// Final computed confidence (0–100).
    pub confidence_pct: f64,
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Compute claim confidence from source quality, consistency proxy, and
/// structural markers.
///
/// `source = admiralty · verification · recency`, where recency decays 0.1
/// per year of evidence age, floored at 0.5 (0.8 when the year is unknown).
pub fn source_signal_confidence(claim: &str, signals: &ClaimSignals) -> SourceSignalResult {
    let recency = match signals.evidence_year {
        Some(year) => {
            let age = (signals.current_year - year).max(0) as f64;
            (1.0 - age * 0.1).max(0.5)
        }
        None => 0.8,
    };
    let source = signals.admiralty.score() * signals.verification.score() * recency;
    let consistency = signals.verification.consistency_proxy();
    let structural = signals.markers.score();

    let conf = 0.5 * source + 0.3 * consistency + 0.2 * structural;

    SourceSignalResult {
        claim: claim.to_string(),
        source_signal: round4(source),
        consistency_signal: round4(consistency),
        structural_signal: round4(structural),
        confidence_pct: round1(conf * 100.0),
    }
}

/// Weighted average of claim confidences, as a report-level figure (0–100).
///
/// With no weights every claim counts equally. Suggested weights:
/// load-bearing 1.0, supporting 0.6, contextual 0.3.
pub fn report_confidence(claims: &[SourceSignalResult], weights: Option<&[f64]>) -> f64 {
    if claims.is_empty() {
        return 0.0;
    }
    let equal = vec![1.0; claims.len()];
    let weights = weights.unwrap_or(&equal);
    debug_assert_eq!(weights.len(), claims.len());

    let total: f64 = weights.iter().take(claims.len()).sum();
    if total == 0.0 {
        return 0.0;
    }
    let weighted: f64 = claims
        .iter()
        .zip(weights)
        .map(|(c, w)| c.confidence_pct * w)
        .sum();
    round1(weighted / total)
}

/// Stated confidence extracted from text, with the overconfidence discount
/// applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerbalizedConfidence {
    /// The confidence percentage the model claimed (0–100).
    pub stated: f64,
    /// Adjusted figure after the discount.
    pub calibrated: f64,
    /// Multiplier applied to the stated value.
    pub discount: f64,
}

/// Extract and discount a model's self-reported confidence.
///
/// Models are overconfident most of the time, so a statement like
/// "confidence: 90%" is multiplied by `discount` (0.7 by default makes it
/// 63). This is a weaker signal than [`crate::calibration::sample_consistency`]
/// and should only be used when multiple samples are not feasible.
///
/// # Errors
///
/// [`TrustError::NoConfidenceStatement`] when no recognizable statement is
/// present. Panics in debug builds if `discount` is outside (0, 1].
pub fn verbalized_confidence(text: &str, discount: f64) -> Result<VerbalizedConfidence> {
    debug_assert!(discount > 0.0 && discount <= 1.0);

    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Matches both orders: "confidence: 90%" and "90% confident".
    let re = PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)(?:confidence|confident|certainty|sure)[\s:]*(\d{1,3})\s*%|(\d{1,3})\s*%\s*(?:confident|certain|sure)",
        )
        .expect("static regex compiles")
    });

    let caps = re
        .captures(text)
        .ok_or(TrustError::NoConfidenceStatement)?;
    let figure = caps
        .get(1)
        .or_else(|| caps.get(2))
        .ok_or(TrustError::NoConfidenceStatement)?;
    let stated: f64 = figure.as_str().parse().unwrap_or(0.0);
    let stated = stated.clamp(0.0, 100.0);

    Ok(VerbalizedConfidence {
        stated,
        calibrated: round1(stated * discount),
        discount,
    })
}

//! agenttrust core library
//!
//! Trust primitives for autonomous agent outputs: Budget-CoCoA consistency
//! calibration, per-agent trust scores with a registry, the mandatory
//! Beipackzettel metadata record, and the eight-dimension review rubric.

pub mod agent;
pub mod beipackzettel;
pub mod calibration;
pub mod error;
pub mod metrics;
pub mod obs;
pub mod registry;
pub mod reviewer;
pub mod rubric;
pub mod signals;
pub mod telemetry;
pub mod trust;

pub use agent::{Agent, AgentReply};
pub use beipackzettel::{Beipackzettel, BeipackzettelDraft, RiskLevel};
pub use calibration::{
    normalize_answer, sample_consistency, sample_consistency_agent, sample_consistency_with,
    AnswerAgent, AnswerClusterer, ConfidenceLevel, NormalizedMatch, SampleResult, SampledAnswer,
};
pub use error::{Result, TrustError};
pub use registry::{TrustRegistry, TrustScoreHandle};
pub use reviewer::{review, review_with, DimensionScorer, HeuristicScorer, ReviewResult};
pub use rubric::{Dimension, DimensionScore, Grade, RubricScore, Tier, Verdict};
pub use signals::{
    report_confidence, source_signal_confidence, verbalized_confidence, Admiralty, ClaimSignals,
    SourceSignalResult, StructuralMarkers, VerbalizedConfidence, Verification,
};
pub use trust::{
    outcome_delta, Outcome, TrustEvent, TrustLevel, TrustScore, TrustScoreSnapshot, INITIAL_SCORE,
    MAX_SCORE, MIN_SCORE,
};

pub use metrics::METRICS;
pub use obs::{
    emit_review_scored, emit_run_finished, emit_samples_collected, emit_trust_updated, run_span,
};
pub use telemetry::init_tracing;

/// agenttrust version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

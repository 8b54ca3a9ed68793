//! Domain-level error taxonomy for agenttrust.

/// Errors produced by the trust core.
#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    /// Every one of the dispatched sampling calls failed.
    #[error("sampling exhausted: all {attempted} calls failed (last error: {last_error})")]
    SamplingExhausted { attempted: usize, last_error: String },

    /// Consistency sampling needs at least two samples to say anything.
    #[error("invalid sample count {n}: need at least 2 samples for a consistency check")]
    InvalidSampleCount { n: usize },

    /// A required Beipackzettel field is missing or out of range.
    #[error("malformed beipackzettel: {0}")]
    MalformedBeipackzettel(String),

    /// Review tier outside the supported range.
    #[error("invalid tier {tier}: supported tiers are 1 (quick) through 3 (deep)")]
    InvalidTier { tier: u8 },

    /// The caller-supplied agent callable failed during pipeline execution.
    #[error("agent callable failed: {0}")]
    AgentFailed(String),

    /// No confidence statement could be extracted from the text.
    #[error("no confidence statement found in text (expected e.g. 'confidence: 85%')")]
    NoConfidenceStatement,
}

/// Result type for trust core operations.
pub type Result<T> = std::result::Result<T, TrustError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrustError::SamplingExhausted {
            attempted: 3,
            last_error: "timeout".to_string(),
        };
        assert!(err.to_string().contains("all 3 calls failed"));

        let err = TrustError::MalformedBeipackzettel("confidence missing".to_string());
        assert!(err.to_string().contains("malformed beipackzettel"));

        let err = TrustError::InvalidTier { tier: 7 };
        assert!(err.to_string().contains("invalid tier 7"));
    }
}

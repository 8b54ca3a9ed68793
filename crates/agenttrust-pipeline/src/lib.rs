//! AgentTrust pipeline - bounded agent orchestration with quality gates
//!
//! Provides a pipeline orchestrator that:
//! - Wraps any agent callable behind the [`agenttrust_core::Agent`] trait
//! - Requires a validated Beipackzettel on every output
//! - Reviews every attempt against the tiered rubric
//! - Bounds the revise loop and feeds outcomes back into trust scores

pub mod pipeline;
pub mod state;

// Re-export key types
pub use pipeline::{AgentPipeline, PipelineResult};
pub use state::{Disposition, FailReason, Stage};

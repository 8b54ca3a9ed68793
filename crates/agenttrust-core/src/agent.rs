//! The caller-supplied agent capability.
//!
//! The core never inspects how an agent is implemented; anything exposing
//! [`Agent::invoke`] qualifies: an SDK wrapper, a replay fixture, or a
//! scripted mock in tests. Callers apply their own timeout/cancellation
//! around the invocation; the core cannot interrupt a supplied callable.

use async_trait::async_trait;

use crate::beipackzettel::BeipackzettelDraft;

/// An agent's answer plus the package insert it must ship with.
///
/// The insert arrives as an unvalidated draft; the pipeline validates it and
/// treats a malformed draft as a fatal execution error, not a fallback.
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub output: String,
    pub insert: BeipackzettelDraft,
}

/// Capability contract for pipeline use.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Produce an output and its metadata for `query`.
    async fn invoke(&self, query: &str) -> anyhow::Result<AgentReply>;
}

#[async_trait]
impl<F> Agent for F
where
    F: Fn(&str) -> anyhow::Result<AgentReply> + Send + Sync,
{
    async fn invoke(&self, query: &str) -> anyhow::Result<AgentReply> {
        self(query)
    }
}

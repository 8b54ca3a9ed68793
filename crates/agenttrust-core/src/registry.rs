//! Injectable registry mapping agent ids to trust scores.
//!
//! The registry is deliberately not a module-level singleton: tests and
//! embedders construct isolated instances (empty or seeded from snapshots).
//! Lookups and inserts are safe under concurrency: the first reference to
//! an unseen agent id creates its entry exactly once, because insertion
//! happens under the map lock. Updates for one agent serialize on that
//! agent's own lock; different agents proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::trust::{Outcome, TrustLevel, TrustScore, TrustScoreSnapshot};

/// Shared handle to one agent's trust score.
///
/// Cheap to clone; all clones refer to the same underlying score, so
/// concurrent `update` calls are applied atomically in lock-acquisition
/// order, never lost to a torn read-modify-write.
#[derive(Debug, Clone)]
pub struct TrustScoreHandle {
    inner: Arc<Mutex<TrustScore>>,
}

impl TrustScoreHandle {
    fn new(score: TrustScore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(score)),
        }
    }

    /// Record an outcome and apply its delta. Returns the delta applied.
    pub async fn update(&self, stated_confidence: f64, outcome: Outcome) -> i32 {
        let mut score = self.inner.lock().await;
        let delta = score.update(stated_confidence, outcome);
        crate::obs::emit_trust_updated(
            score.agent_id(),
            delta,
            score.score(),
            &score.trust_level(),
        );
        delta
    }

    /// Current score.
    pub async fn score(&self) -> i32 {
        self.inner.lock().await.score()
    }

    /// Current autonomy level.
    pub async fn trust_level(&self) -> TrustLevel {
        self.inner.lock().await.trust_level()
    }

    /// Whether outputs from this agent still need QA review.
    pub async fn needs_qa(&self) -> bool {
        self.inner.lock().await.needs_qa()
    }

    /// Snapshot for external persistence.
    pub async fn snapshot(&self) -> TrustScoreSnapshot {
        self.inner.lock().await.snapshot()
    }
}

/// Process-wide (but injectable) map of agent id → trust score.
#[derive(Debug, Default)]
pub struct TrustRegistry {
    agents: Mutex<HashMap<String, TrustScoreHandle>>,
}

impl TrustRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-seeded from persisted snapshots.
    pub fn from_snapshots(snapshots: Vec<TrustScoreSnapshot>) -> Self {
        let agents = snapshots
            .into_iter()
            .map(|s| {
                (
                    s.agent_id.clone(),
                    TrustScoreHandle::new(TrustScore::from_snapshot(s)),
                )
            })
            .collect();
        Self {
            agents: Mutex::new(agents),
        }
    }

    /// Handle for `agent_id`, creating the entry at the neutral prior on
    /// first reference.
    pub async fn handle(&self, agent_id: &str) -> TrustScoreHandle {
        let mut agents = self.agents.lock().await;
        agents
            .entry(agent_id.to_string())
            .or_insert_with(|| {
                debug!(agent_id, "creating trust score entry");
                TrustScoreHandle::new(TrustScore::new(agent_id))
            })
            .clone()
    }

    /// Seed or replace a single entry from a snapshot.
    pub async fn seed(&self, snapshot: TrustScoreSnapshot) {
        let mut agents = self.agents.lock().await;
        agents.insert(
            snapshot.agent_id.clone(),
            TrustScoreHandle::new(TrustScore::from_snapshot(snapshot)),
        );
    }

    /// Snapshot every tracked agent, for an external store.
    pub async fn export(&self) -> Vec<TrustScoreSnapshot> {
        let agents = self.agents.lock().await;
        let mut snapshots = Vec::with_capacity(agents.len());
        for handle in agents.values() {
            snapshots.push(handle.snapshot().await);
        }
        snapshots
    }

    /// Ids of all tracked agents.
    pub async fn agent_ids(&self) -> Vec<String> {
        let agents = self.agents.lock().await;
        agents.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust::INITIAL_SCORE;

    #[tokio::test]
    async fn test_first_reference_creates_entry_once() {
        let registry = Arc::new(TrustRegistry::new());
        let a = registry.handle("writer").await;
        let b = registry.handle("writer").await;

        a.update(85.0, Outcome::Good).await;
        // Both handles see the same underlying score.
        assert_eq!(b.score().await, INITIAL_SCORE + 1);
        assert_eq!(registry.agent_ids().await.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_not_lost() {
        let registry = Arc::new(TrustRegistry::new());
        let mut tasks = Vec::new();
        for _ in 0..20 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let handle = registry.handle("racer").await;
                handle.update(10.0, Outcome::Good).await;
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        let handle = registry.handle("racer").await;
        assert_eq!(handle.score().await, INITIAL_SCORE + 20);
        assert_eq!(handle.snapshot().await.history.len(), 20);
    }

    #[tokio::test]
    async fn test_agents_are_independent() {
        let registry = TrustRegistry::new();
        let a = registry.handle("a").await;
        let b = registry.handle("b").await;
        a.update(95.0, Outcome::Bad).await;
        assert_eq!(a.score().await, INITIAL_SCORE - 3);
        assert_eq!(b.score().await, INITIAL_SCORE);
    }

    #[tokio::test]
    async fn test_seed_and_export_roundtrip() {
        let registry = TrustRegistry::new();
        let handle = registry.handle("a").await;
        handle.update(85.0, Outcome::Good).await;

        let snapshots = registry.export().await;
        assert_eq!(snapshots.len(), 1);

        let restored = TrustRegistry::from_snapshots(snapshots);
        let handle = restored.handle("a").await;
        assert_eq!(handle.score().await, INITIAL_SCORE + 1);
    }
}

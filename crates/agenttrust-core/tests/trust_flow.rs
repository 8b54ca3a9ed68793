//! Integration tests for the trust core: calibration, trust scores, and
//! rubric review working against each other.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use agenttrust_core::{
    review, sample_consistency, Beipackzettel, BeipackzettelDraft, ConfidenceLevel, Outcome, Tier,
    TrustError, TrustLevel, TrustRegistry, Verdict, INITIAL_SCORE,
};

fn scripted(answers: &'static [&'static str]) -> impl Fn(String) -> std::future::Ready<anyhow::Result<String>>
{
    let counter = Arc::new(AtomicUsize::new(0));
    move |_q| {
        let i = counter.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Ok(answers[i % answers.len()].to_string()))
    }
}

// ── Calibration feeds a Beipackzettel ──

#[tokio::test]
async fn calibrated_confidence_flows_into_beipackzettel() {
    let result = sample_consistency(scripted(&["Paris", "paris.", "PARIS"]), "capital?", 3)
        .await
        .unwrap();
    assert_eq!(result.confidence_level, ConfidenceLevel::High);

    let bpz = Beipackzettel::from_draft(
        BeipackzettelDraft::new(result.confidence_pct, "test-model").with_source("wiki/Paris"),
    )
    .unwrap();
    assert_eq!(bpz.confidence(), 85.0);
    assert!(bpz.is_grounded());
}

#[tokio::test]
async fn split_samples_produce_medium_confidence() {
    let result = sample_consistency(scripted(&["Paris", "Paris", "Lyon"]), "capital?", 3)
        .await
        .unwrap();
    assert_eq!(result.confidence_level, ConfidenceLevel::Medium);
    assert!(result.confidence_pct >= 50.0 && result.confidence_pct <= 70.0);
}

#[tokio::test]
async fn exhausted_sampling_surfaces_as_error() {
    let agent = |_q: String| std::future::ready(Err::<String, _>(anyhow::anyhow!("offline")));
    let err = sample_consistency(agent, "capital?", 3).await.unwrap_err();
    assert!(matches!(err, TrustError::SamplingExhausted { .. }));
}

// ── Trust registry lifecycle ──

#[tokio::test]
async fn trust_walk_through_levels() {
    let registry = TrustRegistry::new();
    let handle = registry.handle("researcher").await;

    // Neutral prior sits in LowTrust.
    assert_eq!(handle.trust_level().await, TrustLevel::LowTrust);
    assert!(handle.needs_qa().await);

    // A long run of good, honest outputs earns autonomy.
    for _ in 0..31 {
        handle.update(85.0, Outcome::Good).await;
    }
    assert_eq!(handle.score().await, INITIAL_SCORE + 31);
    assert_eq!(handle.trust_level().await, TrustLevel::Autonomous);
    assert!(!handle.needs_qa().await);

    // One overconfident failure does not revoke autonomy by itself,
    // but a streak does.
    for _ in 0..5 {
        handle.update(95.0, Outcome::Bad).await;
    }
    assert_eq!(handle.trust_level().await, TrustLevel::SpotCheck);
}

#[tokio::test]
async fn registry_survives_export_import() {
    let registry = TrustRegistry::new();
    let handle = registry.handle("writer").await;
    handle.update(95.0, Outcome::Bad).await;
    handle.update(50.0, Outcome::FlaggedReal).await;

    let restored = TrustRegistry::from_snapshots(registry.export().await);
    let handle = restored.handle("writer").await;
    assert_eq!(handle.score().await, INITIAL_SCORE - 3 + 2);
    assert_eq!(handle.snapshot().await.history.len(), 2);
}

// ── Review verdicts against real metadata ──

#[test]
fn honest_uncertain_output_revises_rather_than_fails() {
    let bpz = Beipackzettel::from_draft(
        BeipackzettelDraft::new(55.0, "test-model")
            .with_source("https://example.org/report.pdf")
            .with_uncertainty("figures not independently checked")
            .with_risk("report may be superseded"),
    )
    .unwrap();
    let output = "## Summary\n\n- The report suggests X.\n\nOne caveat: the figures \
                  might be stale, so we recommend re-checking before acting. \
                  More supporting discussion follows to give the reviewer context \
                  on methodology and scope of the underlying report.";
    let result = review(output, &bpz, Tier::STANDARD);
    assert_ne!(result.verdict, Verdict::Fail, "total {}", result.total());
}

#[test]
fn empty_output_with_ungrounded_insert_fails_deep_tier() {
    let bpz = Beipackzettel::from_draft(BeipackzettelDraft::new(95.0, "test-model")).unwrap();
    let result = review("ok", &bpz, Tier::DEEP);
    assert_eq!(result.verdict, Verdict::Fail);
    assert!(!result.issues.is_empty());
}

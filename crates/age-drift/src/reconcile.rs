//! Signal aggregation and the freeze gate
//!
//! Reconciliation produces a draft for human review and flips the store's
//! freeze gate; it never edits artifacts or code itself. The freeze holds
//! until the plan is approved and a re-scan comes back clean, at which
//! point the caller thaws the store.

use age_artifact::{
    Actor, ArtifactKind, ArtifactRecord, DraftArtifact, DriftSignal, GovernanceResult,
    ReconciliationBody, StorageError,
};
use age_store::ArtifactStore;

use crate::policy::DriftPolicy;

/// Aggregate drift signals against the policy threshold
///
/// Below the threshold nothing happens beyond logging; at or above it a
/// ReconciliationPlan draft with `freeze = true` is registered and the
/// store's freeze gate engages, blocking new change-plan registration with
/// `ReconciliationRequired` until resolution.
///
/// # Errors
/// Propagates registration and freeze-toggle errors from the store.
pub fn reconcile(
    store: &ArtifactStore,
    signals: Vec<DriftSignal>,
    policy: &DriftPolicy,
) -> GovernanceResult<Option<ArtifactRecord>> {
    let total_severity: u32 = signals.iter().map(|s| s.severity).sum();
    if total_severity < policy.reconcile_threshold {
        tracing::info!(
            total_severity,
            threshold = policy.reconcile_threshold,
            signals = signals.len(),
            "drift below threshold, no action"
        );
        return Ok(None);
    }

    let body = ReconciliationBody {
        signals,
        total_severity,
        freeze: true,
    };
    let payload = serde_json::to_value(&body).map_err(StorageError::Codec)?;
    let draft =
        DraftArtifact::new(ArtifactKind::ReconciliationPlan, payload).created_by(Actor::system("drift"));
    let id = store.register(draft)?;
    store.set_frozen(true, Actor::system("drift"))?;

    tracing::warn!(
        plan = %id,
        total_severity,
        threshold = policy.reconcile_threshold,
        "drift threshold crossed, freeze engaged"
    );
    store.get(id).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use age_artifact::{ArtifactStatus, DriftKind, GovernanceError};
    use age_store::MemoryBackend;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn signal(severity: u32) -> DriftSignal {
        DriftSignal::new(DriftKind::OrphanCode, "src/orphan.rs", severity)
    }

    #[test]
    fn below_threshold_is_a_no_op() {
        let store = ArtifactStore::new(MemoryBackend::new());
        let plan = reconcile(&store, vec![signal(2)], &DriftPolicy::default()).unwrap();
        assert_eq!(plan, None);
        assert!(!store.is_frozen());
    }

    #[test]
    fn at_threshold_emits_plan_and_freezes() {
        let store = ArtifactStore::new(MemoryBackend::new());
        let plan = reconcile(&store, vec![signal(2), signal(2)], &DriftPolicy::default())
            .unwrap()
            .unwrap();

        assert_eq!(plan.kind, ArtifactKind::ReconciliationPlan);
        assert_eq!(plan.status, ArtifactStatus::Draft);
        assert_eq!(plan.payload["freeze"], json!(true));
        assert_eq!(plan.payload["total_severity"], json!(4));
        assert!(store.is_frozen());
    }

    #[test]
    fn frozen_store_rejects_new_change_plans() {
        let store = ArtifactStore::new(MemoryBackend::new());
        reconcile(&store, vec![signal(5)], &DriftPolicy::default()).unwrap();

        let err = store
            .register(DraftArtifact::new(
                ArtifactKind::ImplementationPlan,
                json!({ "unit": "auth", "files": ["src/auth.rs"] }),
            ))
            .unwrap_err();
        assert!(matches!(err, GovernanceError::ReconciliationRequired));
    }

    #[test]
    fn freeze_does_not_block_the_reconciliation_flow_itself() {
        let store = ArtifactStore::new(MemoryBackend::new());
        let plan = reconcile(&store, vec![signal(5)], &DriftPolicy::default())
            .unwrap()
            .unwrap();

        // The human reviews and approves the plan while frozen, then the
        // caller thaws once a re-scan is clean.
        store.approve(plan.id, Actor::human("alice"), "resolved").unwrap();
        store.set_frozen(false, Actor::human("alice")).unwrap();
        assert!(!store.is_frozen());
    }

    #[test]
    fn custom_threshold_is_honored() {
        let store = ArtifactStore::new(MemoryBackend::new());
        let policy = DriftPolicy::default().with_threshold(100);
        let plan = reconcile(&store, vec![signal(50)], &policy).unwrap();
        assert_eq!(plan, None);
    }
}

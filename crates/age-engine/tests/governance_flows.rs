//! End-to-end lifecycle and pipeline flows through the engine facade

use age_engine::{
    Actor, ArtifactFilter, ArtifactKind, ArtifactStatus, DraftArtifact, EngineConfig,
    GovernanceEngine, GovernanceError, OverrideScope, PipelineMode, RepositorySnapshot, StageKind,
    StageOutcome, Version,
};
use serde_json::json;
use std::sync::Arc;

fn engine() -> GovernanceEngine {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    GovernanceEngine::new(EngineConfig::default())
}

#[test]
fn locked_test_plan_cannot_be_superseded() {
    let engine = engine();
    let t1 = engine
        .register(DraftArtifact::new(
            ArtifactKind::TestPlan,
            json!({ "covers": ["tests/foo_test.rs"] }),
        ))
        .unwrap();
    engine.approve(t1, Actor::human("alice"), "").unwrap();
    engine.lock(t1, Actor::human("alice")).unwrap();

    let result = engine.supersede(
        t1,
        DraftArtifact::new(ArtifactKind::TestPlan, json!({ "covers": ["tests/bar_test.rs"] })),
    );
    assert!(matches!(
        result,
        Err(GovernanceError::InvalidTransition { .. })
    ));
    // The locked version is untouched.
    assert_eq!(engine.get(t1).unwrap().status, ArtifactStatus::Locked);
}

#[test]
fn depending_on_a_draft_is_rejected() {
    let engine = engine();
    let t1 = engine
        .register(DraftArtifact::new(
            ArtifactKind::TestPlan,
            json!({ "covers": ["tests/foo_test.rs"] }),
        ))
        .unwrap();

    let result = engine.register(
        DraftArtifact::new(
            ArtifactKind::ImplementationPlan,
            json!({ "unit": "foo", "files": ["src/foo.rs"] }),
        )
        .depends_on(t1),
    );
    assert!(matches!(
        result,
        Err(GovernanceError::DependencyNotApproved { .. })
    ));

    // After approval the same draft goes through.
    engine.approve(t1, Actor::human("alice"), "").unwrap();
    engine
        .register(
            DraftArtifact::new(
                ArtifactKind::ImplementationPlan,
                json!({ "unit": "foo", "files": ["src/foo.rs"] }),
            )
            .depends_on(t1),
        )
        .unwrap();
}

#[test]
fn touching_a_locked_test_file_fails_validation() {
    let engine = engine();
    let t1 = engine
        .register(DraftArtifact::new(
            ArtifactKind::TestPlan,
            json!({ "covers": ["tests/foo_test.rs"] }),
        ))
        .unwrap();
    engine.approve(t1, Actor::human("alice"), "").unwrap();
    engine.lock(t1, Actor::human("alice")).unwrap();

    let plan = engine
        .register(DraftArtifact::new(
            ArtifactKind::ImplementationPlan,
            json!({ "unit": "foo", "files": ["src/foo.rs", "tests/foo_test.rs"] }),
        ))
        .unwrap();
    engine.approve(plan, Actor::human("alice"), "").unwrap();

    let repo = RepositorySnapshot::new(vec!["tests/foo_test.rs".to_string()]);
    let result = engine.validate(&repo, PipelineMode::FailFast).unwrap();

    assert!(!result.passed());
    assert_eq!(
        result.first_violation().unwrap().kind,
        "TestModificationAfterLock"
    );
}

#[test]
fn unplanned_change_halts_later_stages() {
    let engine = engine();
    let repo = RepositorySnapshot::new(vec!["src/sneaky.rs".to_string()]);
    let result = engine.validate(&repo, PipelineMode::FailFast).unwrap();

    assert_eq!(result.first_violation().unwrap().kind, "UnplannedCodeChange");
    assert_eq!(
        result.stage(StageKind::AuditVerification).unwrap().outcome,
        StageOutcome::Skipped
    );

    // The failing verdict is itself queryable as an artifact.
    let verdict = engine.get(result.result_artifact).unwrap();
    assert_eq!(verdict.payload["passed"], json!(false));
}

#[test]
fn concurrent_approval_produces_exactly_one_record() {
    let engine = Arc::new(engine());
    let a1 = engine
        .register(DraftArtifact::new(
            ArtifactKind::ImplementationPlan,
            json!({ "unit": "auth", "files": ["src/auth.rs"] }),
        ))
        .unwrap();

    let handles: Vec<_> = (0..2)
        .map(|i| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || engine.approve(a1, Actor::human(format!("op{i}")), ""))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1, "exactly one approve may win");

    let approvals: Vec<_> = engine
        .snapshot()
        .approvals()
        .iter()
        .filter(|a| a.artifact_id == a1)
        .cloned()
        .collect();
    assert_eq!(approvals.len(), 1);
}

#[test]
fn approved_payload_is_immutable_across_unrelated_operations() {
    let engine = engine();
    let plan = engine
        .register(DraftArtifact::new(
            ArtifactKind::ImplementationPlan,
            json!({ "unit": "auth", "files": ["src/auth.rs"] }),
        ))
        .unwrap();
    engine.approve(plan, Actor::human("alice"), "").unwrap();
    let hash_before = engine.get(plan).unwrap().payload_hash;

    // Unrelated traffic.
    let other = engine
        .register(DraftArtifact::new(
            ArtifactKind::ScaffoldPlan,
            json!({ "summary": "layout" }),
        ))
        .unwrap();
    engine.approve(other, Actor::human("bob"), "").unwrap();
    engine
        .override_invariant("hotspot-check", "release week", OverrideScope::Repository, Actor::human("bob"))
        .unwrap();

    assert_eq!(engine.get(plan).unwrap().payload_hash, hash_before);
}

#[test]
fn supersede_keeps_history_queryable() {
    let engine = engine();
    let plan = engine
        .register(DraftArtifact::new(
            ArtifactKind::ImplementationPlan,
            json!({ "unit": "auth", "files": ["src/auth.rs"] }),
        ))
        .unwrap();
    engine.approve(plan, Actor::human("alice"), "").unwrap();
    engine
        .supersede(
            plan,
            DraftArtifact::new(
                ArtifactKind::ImplementationPlan,
                json!({ "unit": "auth", "files": ["src/auth.rs", "src/session.rs"] }),
            ),
        )
        .unwrap();

    let v1 = engine.get_version(plan, Version(1)).unwrap();
    let v2 = engine.get_version(plan, Version(2)).unwrap();
    assert_eq!(v1.status, ArtifactStatus::Superseded);
    assert_eq!(v2.status, ArtifactStatus::Draft);
    assert_eq!(engine.get(plan).unwrap().version, Version(2));

    let superseded = engine.list(&ArtifactFilter::any().status(ArtifactStatus::Superseded));
    assert_eq!(superseded.len(), 1);
}

#[test]
fn audit_chain_survives_a_full_lifecycle() {
    let engine = engine();
    let t1 = engine
        .register(DraftArtifact::new(
            ArtifactKind::TestPlan,
            json!({ "covers": ["tests/foo_test.rs"] }),
        ))
        .unwrap();
    engine.approve(t1, Actor::human("alice"), "").unwrap();
    engine.lock(t1, Actor::human("alice")).unwrap();

    engine.verify_audit_integrity().unwrap();
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.audit_entries().len(), 3);
}

#[test]
fn overrides_require_reasons_and_stay_queryable_until_reconciled() {
    let engine = engine();
    let err = engine
        .override_invariant("lock-check", "  ", OverrideScope::Repository, Actor::human("alice"))
        .unwrap_err();
    assert_eq!(err.kind(), "SchemaInvalid");

    engine
        .override_invariant(
            "lock-check",
            "hotfix for incident 231",
            OverrideScope::Operation("supersede".to_string()),
            Actor::human("alice"),
        )
        .unwrap();
    assert_eq!(engine.unreconciled_overrides().len(), 1);

    let flipped = engine
        .reconcile_override("lock-check", Actor::human("alice"))
        .unwrap();
    assert_eq!(flipped, 1);
    assert!(engine.unreconciled_overrides().is_empty());
}

//! The governance engine facade
//!
//! One instance per governed repository, owning one artifact store and
//! delegating to the pipeline, dispatcher, and drift engine. Front ends
//! and orchestrators talk to this type only.

use age_artifact::{
    Actor, ArtifactFilter, ArtifactId, ArtifactKind, ArtifactRecord, ArtifactStatus, DraftArtifact,
    DriftSignal, FailureId, FailureReport, GovernanceResult, Override, OverrideScope, Version,
};
use age_pipeline::{InvariantPipeline, PipelineMode, PipelineResult, RepositorySnapshot};
use age_recovery::{RecoveryDispatcher, RecoveryOutcome};
use age_store::{ArtifactStore, MemoryBackend, StorageBackend, StoreSnapshot};
use std::sync::Arc;

use crate::config::EngineConfig;

/// The artifact governance engine
///
/// Synchronous by design: every call either completes and is durably
/// recorded, or fails and leaves state unchanged.
pub struct GovernanceEngine {
    config: EngineConfig,
    store: Arc<ArtifactStore>,
    pipeline: InvariantPipeline,
    dispatcher: RecoveryDispatcher,
}

impl std::fmt::Debug for GovernanceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GovernanceEngine")
            .field("code_root", &self.config.code_root)
            .field("frozen", &self.store.is_frozen())
            .finish()
    }
}

impl GovernanceEngine {
    /// Engine over an in-memory store
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_backend(config, MemoryBackend::new())
    }

    /// Engine over a pluggable storage backend
    #[must_use]
    pub fn with_backend(config: EngineConfig, backend: impl StorageBackend + 'static) -> Self {
        let store = Arc::new(ArtifactStore::with_lease_ttl(backend, config.lease_ttl()));
        let dispatcher = RecoveryDispatcher::new(Arc::clone(&store));
        tracing::info!(code_root = %config.code_root.display(), "governance engine ready");
        Self {
            config,
            store,
            pipeline: InvariantPipeline::new(),
            dispatcher,
        }
    }

    /// The underlying store, for callers composing their own passes
    #[inline]
    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- Lifecycle API ---

    /// Register a draft artifact
    ///
    /// # Errors
    /// See [`ArtifactStore::register`].
    pub fn register(&self, draft: DraftArtifact) -> GovernanceResult<ArtifactId> {
        self.store.register(draft)
    }

    /// Promote a draft to approved
    ///
    /// # Errors
    /// See [`ArtifactStore::approve`].
    pub fn approve(
        &self,
        id: ArtifactId,
        approver: Actor,
        notes: impl Into<String>,
    ) -> GovernanceResult<ArtifactRecord> {
        self.store.approve(id, approver, notes)
    }

    /// Lock an approved, lockable artifact
    ///
    /// # Errors
    /// See [`ArtifactStore::lock`].
    pub fn lock(&self, id: ArtifactId, actor: Actor) -> GovernanceResult<ArtifactRecord> {
        self.store.lock(id, actor)
    }

    /// Replace an artifact with a new draft version under the same id
    ///
    /// # Errors
    /// See [`ArtifactStore::supersede`].
    pub fn supersede(
        &self,
        old_id: ArtifactId,
        new_draft: DraftArtifact,
    ) -> GovernanceResult<ArtifactId> {
        self.store.supersede(old_id, new_draft)
    }

    /// Latest version of an artifact
    ///
    /// # Errors
    /// See [`ArtifactStore::get`].
    pub fn get(&self, id: ArtifactId) -> GovernanceResult<ArtifactRecord> {
        self.store.get(id)
    }

    /// Specific version of an artifact
    ///
    /// # Errors
    /// See [`ArtifactStore::get_version`].
    pub fn get_version(&self, id: ArtifactId, version: Version) -> GovernanceResult<ArtifactRecord> {
        self.store.get_version(id, version)
    }

    /// All records matching a filter
    #[must_use]
    pub fn list(&self, filter: &ArtifactFilter) -> Vec<ArtifactRecord> {
        self.store.list(filter)
    }

    // --- Pipeline API ---

    /// Run the invariant pipeline over a reported repository state
    ///
    /// # Errors
    /// Only verdict persistence can fail; violations live in the result.
    pub fn validate(
        &self,
        repo: &RepositorySnapshot,
        mode: PipelineMode,
    ) -> GovernanceResult<PipelineResult> {
        self.pipeline.validate(&self.store, repo, mode)
    }

    // --- Failure API ---

    /// Persist a failure report
    ///
    /// # Errors
    /// See [`RecoveryDispatcher::report`].
    pub fn report_failure(&self, report: FailureReport) -> GovernanceResult<FailureId> {
        self.dispatcher.report(report)
    }

    /// Dispatch (or re-query) recovery for a failure
    ///
    /// # Errors
    /// See [`RecoveryDispatcher::recover`].
    pub fn recover(&self, id: FailureId) -> GovernanceResult<RecoveryOutcome> {
        self.dispatcher.recover(id)
    }

    // --- Drift API ---

    /// Scan the governed code root for drift
    #[must_use]
    pub fn scan(&self) -> Vec<DriftSignal> {
        age_drift::scan(&self.config.code_root, &self.store.snapshot(), &self.config.drift)
    }

    /// Aggregate signals; at or above the threshold, emit a plan and freeze
    ///
    /// # Errors
    /// See [`age_drift::reconcile`].
    pub fn reconcile(
        &self,
        signals: Vec<DriftSignal>,
    ) -> GovernanceResult<Option<ArtifactRecord>> {
        age_drift::reconcile(&self.store, signals, &self.config.drift)
    }

    /// One scheduled drift pass: scan, then reconcile
    ///
    /// # Errors
    /// See [`age_drift::reconcile`].
    pub fn scan_and_reconcile(&self) -> GovernanceResult<Option<ArtifactRecord>> {
        let signals = self.scan();
        self.reconcile(signals)
    }

    /// Release the drift freeze once its preconditions hold
    ///
    /// Two gates, both required: every ReconciliationPlan must have left
    /// draft (a human approved the cleanup), and a fresh scan must come
    /// back clean. Returns whether the thaw happened.
    ///
    /// # Errors
    /// Propagates the audited freeze toggle.
    pub fn thaw_if_clean(&self, actor: Actor) -> GovernanceResult<bool> {
        let pending = self
            .store
            .snapshot()
            .latest_records()
            .into_iter()
            .filter(|r| {
                r.kind == ArtifactKind::ReconciliationPlan && r.status == ArtifactStatus::Draft
            })
            .count();
        if pending > 0 {
            tracing::warn!(pending, "freeze holds, reconciliation plan awaits approval");
            return Ok(false);
        }

        let signals = self.scan();
        if signals.is_empty() {
            self.store.set_frozen(false, actor)?;
            Ok(true)
        } else {
            tracing::warn!(signals = signals.len(), "freeze holds, drift still present");
            Ok(false)
        }
    }

    // --- Override surface ---

    /// Record a deliberate, reason-logged invariant bypass
    ///
    /// # Errors
    /// See [`ArtifactStore::override_invariant`].
    pub fn override_invariant(
        &self,
        target: impl Into<String>,
        reason: impl Into<String>,
        scope: OverrideScope,
        actor: Actor,
    ) -> GovernanceResult<Override> {
        self.store.override_invariant(target, reason, scope, actor)
    }

    /// Mark overrides for a target as reconciled; returns how many flipped
    ///
    /// # Errors
    /// See [`ArtifactStore::reconcile_override`].
    pub fn reconcile_override(
        &self,
        target: impl Into<String>,
        actor: Actor,
    ) -> GovernanceResult<usize> {
        self.store.reconcile_override(target, actor)
    }

    /// Overrides still awaiting reconciliation
    #[must_use]
    pub fn unreconciled_overrides(&self) -> Vec<Override> {
        self.store.unreconciled_overrides()
    }

    // --- Introspection ---

    /// Whether the drift freeze gate is engaged
    #[inline]
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.store.is_frozen()
    }

    /// Consistent point-in-time view of the store
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }

    /// Verify the audit chain end to end
    ///
    /// # Errors
    /// See [`ArtifactStore::verify_audit_integrity`].
    pub fn verify_audit_integrity(&self) -> GovernanceResult<()> {
        self.store.verify_audit_integrity()
    }
}

//! The artifact store and lifecycle state machine
//!
//! Owns every status transition. Mutating calls acquire a per-id lease,
//! validate the transition against the allowed-transition table, and commit
//! the resulting records together with exactly one audit entry in a single
//! atomic batch. A transition whose audit entry cannot be written does not
//! happen.

use crate::audit;
use crate::backend::{StorageBackend, StoreState, WriteBatch, WriteOp};
use crate::lease::LeaseTable;
use age_artifact::{
    schema, Actor, ApprovalRecord, ArtifactFilter, ArtifactId, ArtifactRecord, ArtifactStatus,
    AuditEntry, AuditOp, DraftArtifact, GovernanceError, GovernanceResult, Override, OverrideScope,
    PayloadHash, SchemaViolation, Version,
};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use ulid::Ulid;

/// Default lease hold-time ceiling for mutating calls
const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(10);

/// Consistent point-in-time view of the store
///
/// Taken once at scan start by the pipeline and the drift engine so a
/// concurrent approve elsewhere cannot produce a partial view.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    state: StoreState,
}

impl StoreSnapshot {
    /// Commit version this snapshot was taken at
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.state.version
    }

    /// Every artifact record, all versions
    #[inline]
    #[must_use]
    pub fn artifacts(&self) -> &[ArtifactRecord] {
        &self.state.artifacts
    }

    /// Latest version of each artifact id
    #[must_use]
    pub fn latest_records(&self) -> Vec<&ArtifactRecord> {
        // Records are ordered by (id, version); the last of each run wins.
        let mut out: Vec<&ArtifactRecord> = Vec::new();
        for record in &self.state.artifacts {
            match out.last_mut() {
                Some(last) if last.id == record.id => *last = record,
                _ => out.push(record),
            }
        }
        out
    }

    /// Latest version of one artifact
    #[must_use]
    pub fn latest(&self, id: ArtifactId) -> Option<&ArtifactRecord> {
        self.state
            .artifacts
            .iter()
            .filter(|r| r.id == id)
            .max_by_key(|r| r.version)
    }

    /// Every approval record
    #[inline]
    #[must_use]
    pub fn approvals(&self) -> &[ApprovalRecord] {
        &self.state.approvals
    }

    /// Approval for a specific artifact version, if any
    #[must_use]
    pub fn approval_for(&self, id: ArtifactId, version: Version) -> Option<&ApprovalRecord> {
        self.state
            .approvals
            .iter()
            .find(|a| a.artifact_id == id && a.version == version)
    }

    /// Full audit chain
    #[inline]
    #[must_use]
    pub fn audit_entries(&self) -> &[AuditEntry] {
        &self.state.audit_entries
    }

    /// Every override record
    #[inline]
    #[must_use]
    pub fn overrides(&self) -> &[Override] {
        &self.state.overrides
    }
}

/// The artifact store
///
/// One instance per governed repository. Readers never block on writer
/// leases; they observe the latest committed state through the backend.
pub struct ArtifactStore {
    backend: Arc<dyn StorageBackend>,
    leases: LeaseTable,
    /// Serializes audit-chain construction across artifact ids.
    commit_lock: Mutex<()>,
    last_audit_hash: Mutex<PayloadHash>,
    frozen: AtomicBool,
}

impl std::fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStore")
            .field("backend_version", &self.backend.version())
            .field("frozen", &self.frozen.load(Ordering::SeqCst))
            .finish()
    }
}

impl ArtifactStore {
    /// Create a store over a backend, with the default lease ceiling
    #[must_use]
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self::with_lease_ttl(backend, DEFAULT_LEASE_TTL)
    }

    /// Create a store with an explicit lease hold-time ceiling
    #[must_use]
    pub fn with_lease_ttl(backend: impl StorageBackend + 'static, ttl: Duration) -> Self {
        let backend: Arc<dyn StorageBackend> = Arc::new(backend);
        let state = backend.state();
        let last_hash = state
            .audit_entries
            .last()
            .map(|e| e.entry_hash)
            .unwrap_or_else(PayloadHash::zero);
        // Freeze state is durable through the audit log: last freeze/thaw wins.
        let frozen = state
            .audit_entries
            .iter()
            .rev()
            .find_map(|e| match e.op {
                AuditOp::Freeze => Some(true),
                AuditOp::Thaw => Some(false),
                _ => None,
            })
            .unwrap_or(false);
        Self {
            backend,
            leases: LeaseTable::new(ttl),
            commit_lock: Mutex::new(()),
            last_audit_hash: Mutex::new(last_hash),
            frozen: AtomicBool::new(frozen),
        }
    }

    /// Register a draft artifact submitted by an external producer
    ///
    /// # Errors
    /// - [`GovernanceError::SchemaInvalid`] if the payload fails its kind's
    ///   declarative schema
    /// - [`GovernanceError::DependencyNotApproved`] if any dependency is not
    ///   approved or locked
    /// - [`GovernanceError::ReconciliationRequired`] if a drift freeze is
    ///   active and the draft is a change plan
    pub fn register(&self, draft: DraftArtifact) -> GovernanceResult<ArtifactId> {
        self.check_freeze_gate(&draft)?;
        schema::validate_payload(draft.kind, &draft.payload)?;
        self.check_dependencies(&draft.depends_on)?;

        let record = ArtifactRecord {
            id: ArtifactId::new(),
            kind: draft.kind,
            version: Version::initial(),
            status: ArtifactStatus::Draft,
            created_by: draft.created_by.clone(),
            created_at: Utc::now(),
            depends_on: draft.depends_on,
            payload_hash: PayloadHash::of_payload(&draft.payload)?,
            payload: draft.payload,
        };
        let id = record.id;
        let hash = record.payload_hash;

        self.commit_with_audit(
            WriteBatch::new().push(WriteOp::PutArtifact(record)),
            AuditOp::Register,
            id,
            Version::initial(),
            draft.created_by,
            hash,
        )?;
        tracing::info!(%id, kind = %draft.kind, "artifact registered");
        Ok(id)
    }

    /// Promote a draft to approved
    ///
    /// Of two racing callers exactly one succeeds; the loser sees
    /// [`GovernanceError::ConcurrentModification`] while the winner holds
    /// the lease, or [`GovernanceError::InvalidTransition`] once the
    /// winner's approval has already committed. Neither silently overwrites.
    ///
    /// # Errors
    /// - [`GovernanceError::InvalidTransition`] if the latest version is not
    ///   a draft
    /// - [`GovernanceError::ConcurrentModification`] on lease contention
    /// - [`GovernanceError::SchemaInvalid`] if the approver identity is empty
    pub fn approve(
        &self,
        id: ArtifactId,
        approver: Actor,
        notes: impl Into<String>,
    ) -> GovernanceResult<ArtifactRecord> {
        if approver.id().trim().is_empty() {
            return Err(GovernanceError::SchemaInvalid {
                kind: "approval",
                violations: vec![SchemaViolation::new(
                    "/approver",
                    "approver identity must be non-empty",
                )],
            });
        }

        let lease = self.leases.acquire(id)?;
        let current = self.backend.latest(id).ok_or(GovernanceError::NotFound(id))?;
        self.require_transition(&current, ArtifactStatus::Approved)?;

        let mut updated = current;
        updated.status = ArtifactStatus::Approved;
        let approval = ApprovalRecord {
            artifact_id: id,
            version: updated.version,
            approver: approver.clone(),
            timestamp: Utc::now(),
            notes: notes.into(),
        };

        lease.check()?;
        self.commit_with_audit(
            WriteBatch::new()
                .push(WriteOp::PutArtifact(updated.clone()))
                .push(WriteOp::PutApproval(approval)),
            AuditOp::Approve,
            id,
            updated.version,
            approver,
            updated.payload_hash,
        )?;
        tracing::info!(%id, version = %updated.version, "artifact approved");
        Ok(updated)
    }

    /// Lock an approved, lockable artifact; terminal and irreversible
    ///
    /// # Errors
    /// [`GovernanceError::InvalidTransition`] unless the latest version is
    /// approved and its kind supports locking.
    pub fn lock(&self, id: ArtifactId, actor: Actor) -> GovernanceResult<ArtifactRecord> {
        let lease = self.leases.acquire(id)?;
        let current = self.backend.latest(id).ok_or(GovernanceError::NotFound(id))?;
        self.require_transition(&current, ArtifactStatus::Locked)?;

        let mut updated = current;
        updated.status = ArtifactStatus::Locked;

        lease.check()?;
        self.commit_with_audit(
            WriteBatch::new().push(WriteOp::PutArtifact(updated.clone())),
            AuditOp::Lock,
            id,
            updated.version,
            actor,
            updated.payload_hash,
        )?;
        tracing::info!(%id, "artifact locked");
        Ok(updated)
    }

    /// Replace an artifact with a new draft version
    ///
    /// The old version is tagged superseded and retained; the new version
    /// starts the lifecycle over as a draft under the same id. Dependents of
    /// the old version are not silently re-pointed; they surface through
    /// `list` until explicitly revalidated.
    ///
    /// # Errors
    /// [`GovernanceError::InvalidTransition`] if the latest version is
    /// locked (locking is terminal) or already superseded.
    pub fn supersede(
        &self,
        old_id: ArtifactId,
        new_draft: DraftArtifact,
    ) -> GovernanceResult<ArtifactId> {
        self.check_freeze_gate(&new_draft)?;

        let lease = self.leases.acquire(old_id)?;
        let current = self
            .backend
            .latest(old_id)
            .ok_or(GovernanceError::NotFound(old_id))?;
        self.require_transition(&current, ArtifactStatus::Superseded)?;

        if new_draft.kind != current.kind {
            return Err(GovernanceError::SchemaInvalid {
                kind: new_draft.kind.as_str(),
                violations: vec![SchemaViolation::new(
                    "/kind",
                    format!("superseding draft must keep kind {}", current.kind),
                )],
            });
        }
        schema::validate_payload(new_draft.kind, &new_draft.payload)?;

        let depends_on = if new_draft.depends_on.is_empty() {
            current.depends_on.clone()
        } else {
            new_draft.depends_on
        };
        self.check_dependencies(&depends_on)?;

        let mut old = current.clone();
        old.status = ArtifactStatus::Superseded;

        let replacement = ArtifactRecord {
            id: old_id,
            kind: current.kind,
            version: current.version.next(),
            status: ArtifactStatus::Draft,
            created_by: new_draft.created_by.clone(),
            created_at: Utc::now(),
            depends_on,
            payload_hash: PayloadHash::of_payload(&new_draft.payload)?,
            payload: new_draft.payload,
        };
        let new_version = replacement.version;
        let new_hash = replacement.payload_hash;

        lease.check()?;
        self.commit_with_audit(
            WriteBatch::new()
                .push(WriteOp::PutArtifact(old))
                .push(WriteOp::PutArtifact(replacement)),
            AuditOp::Supersede,
            old_id,
            new_version,
            new_draft.created_by,
            new_hash,
        )?;
        tracing::info!(%old_id, version = %new_version, "artifact superseded");
        Ok(old_id)
    }

    /// Latest version of an artifact
    ///
    /// # Errors
    /// [`GovernanceError::NotFound`] if the id was never registered.
    pub fn get(&self, id: ArtifactId) -> GovernanceResult<ArtifactRecord> {
        self.backend.latest(id).ok_or(GovernanceError::NotFound(id))
    }

    /// Specific version of an artifact (superseded history included)
    ///
    /// # Errors
    /// [`GovernanceError::NotFound`] if that version does not exist.
    pub fn get_version(&self, id: ArtifactId, version: Version) -> GovernanceResult<ArtifactRecord> {
        self.backend
            .at_version(id, version)
            .ok_or(GovernanceError::NotFound(id))
    }

    /// All records matching a filter, across every version
    #[must_use]
    pub fn list(&self, filter: &ArtifactFilter) -> Vec<ArtifactRecord> {
        self.backend
            .state()
            .artifacts
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect()
    }

    /// Record a deliberate, reason-logged bypass of an invariant
    ///
    /// # Errors
    /// [`GovernanceError::SchemaInvalid`] if the reason is empty.
    pub fn override_invariant(
        &self,
        target: impl Into<String>,
        reason: impl Into<String>,
        scope: OverrideScope,
        actor: Actor,
    ) -> GovernanceResult<Override> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(GovernanceError::SchemaInvalid {
                kind: "override",
                violations: vec![SchemaViolation::new(
                    "/reason",
                    "override reason must be non-empty",
                )],
            });
        }

        let record = Override {
            target: target.into(),
            reason,
            scope: scope.clone(),
            created_at: Utc::now(),
            reconciled: false,
        };
        let hash = PayloadHash::of_payload(&record)?;

        self.commit_with_audit(
            WriteBatch::new().push(WriteOp::PutOverride(record.clone())),
            AuditOp::Override,
            scope_artifact_id(&scope),
            Version(0),
            actor,
            hash,
        )?;
        tracing::warn!(target = %record.target, "invariant override recorded");
        Ok(record)
    }

    /// Mark every unreconciled override with this target as reconciled
    ///
    /// Returns the number of records flipped.
    pub fn reconcile_override(
        &self,
        target: impl Into<String>,
        actor: Actor,
    ) -> GovernanceResult<usize> {
        let target = target.into();
        let count = self
            .backend
            .state()
            .overrides
            .iter()
            .filter(|o| !o.reconciled && o.target == target)
            .count();
        if count == 0 {
            return Ok(0);
        }

        self.commit_with_audit(
            WriteBatch::new().push(WriteOp::ReconcileOverride(target)),
            AuditOp::ReconcileOverride,
            ArtifactId(Ulid::nil()),
            Version(0),
            actor,
            PayloadHash::zero(),
        )?;
        Ok(count)
    }

    /// Overrides still awaiting reconciliation; a non-empty result blocks
    /// valid project closure
    #[must_use]
    pub fn unreconciled_overrides(&self) -> Vec<Override> {
        self.backend
            .state()
            .overrides
            .into_iter()
            .filter(|o| !o.reconciled)
            .collect()
    }

    /// Engage or release the drift freeze gate
    ///
    /// While frozen, `register` and `supersede` of change plans fail with
    /// `ReconciliationRequired`. The toggle is itself audited.
    pub fn set_frozen(&self, frozen: bool, actor: Actor) -> GovernanceResult<()> {
        if self.frozen.swap(frozen, Ordering::SeqCst) == frozen {
            return Ok(());
        }
        let op = if frozen { AuditOp::Freeze } else { AuditOp::Thaw };
        let committed = self.commit_with_audit(
            WriteBatch::new(),
            op,
            ArtifactId(Ulid::nil()),
            Version(0),
            actor,
            PayloadHash::zero(),
        );
        if let Err(err) = committed {
            // A toggle whose audit entry never landed did not happen.
            self.frozen.store(!frozen, Ordering::SeqCst);
            return Err(err);
        }
        tracing::warn!(frozen, "drift freeze gate toggled");
        Ok(())
    }

    /// Whether the drift freeze gate is engaged
    #[inline]
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    /// Consistent snapshot for pipeline and drift passes
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            state: self.backend.state(),
        }
    }

    /// Verify the audit chain end to end
    ///
    /// # Errors
    /// [`GovernanceError::AuditTrailBroken`] on the first bad link.
    pub fn verify_audit_integrity(&self) -> GovernanceResult<()> {
        audit::verify_chain(&self.backend.state().audit_entries)
    }

    fn check_freeze_gate(&self, draft: &DraftArtifact) -> GovernanceResult<()> {
        if self.is_frozen() && draft.kind.is_change_plan() {
            return Err(GovernanceError::ReconciliationRequired);
        }
        Ok(())
    }

    fn check_dependencies(&self, depends_on: &[ArtifactId]) -> GovernanceResult<()> {
        for &dep in depends_on {
            let record = self
                .backend
                .latest(dep)
                .ok_or(GovernanceError::NotFound(dep))?;
            if !record.status.is_referenceable() {
                return Err(GovernanceError::DependencyNotApproved {
                    id: dep,
                    status: record.status,
                });
            }
        }
        Ok(())
    }

    fn require_transition(
        &self,
        current: &ArtifactRecord,
        to: ArtifactStatus,
    ) -> GovernanceResult<()> {
        if current.status.can_transition_to(to, current.kind) {
            Ok(())
        } else {
            Err(GovernanceError::InvalidTransition {
                id: current.id,
                from: current.status,
                to,
            })
        }
    }

    fn commit_with_audit(
        &self,
        batch: WriteBatch,
        op: AuditOp,
        artifact_id: ArtifactId,
        version: Version,
        actor: Actor,
        resulting_hash: PayloadHash,
    ) -> GovernanceResult<()> {
        let _sequenced = self.commit_lock.lock();
        let mut last = self.last_audit_hash.lock();
        let entry = audit::next_entry(op, artifact_id, version, actor, resulting_hash, *last);
        let entry_hash = entry.entry_hash;
        self.backend.commit(batch.push(WriteOp::AppendAudit(entry)))?;
        *last = entry_hash;
        Ok(())
    }
}

fn scope_artifact_id(scope: &OverrideScope) -> ArtifactId {
    match scope {
        OverrideScope::Artifact(id) => *id,
        // Repository- and operation-scoped entries carry the nil id.
        OverrideScope::Operation(_) | OverrideScope::Repository => ArtifactId(Ulid::nil()),
    }
}

//! Pluggable storage backend
//!
//! Keyed by (artifact id, version), with atomic multi-record commits and
//! consistent-snapshot reads. Local filesystem and remote document stores
//! are both valid implementations; [`MemoryBackend`] is the reference one.
//!
//! Everything persisted here is append-only except the single mutable
//! `status` field on an artifact's latest version, which is only rewritten
//! through a committed [`WriteOp::PutArtifact`].

use age_artifact::{
    ApprovalRecord, ArtifactId, ArtifactRecord, AuditEntry, Override, StorageError, Version,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// One record mutation inside an atomic batch
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Insert or overwrite the record at (id, version)
    PutArtifact(ArtifactRecord),
    /// Append an approval record
    PutApproval(ApprovalRecord),
    /// Append an audit entry
    AppendAudit(AuditEntry),
    /// Append an override record
    PutOverride(Override),
    /// Mark every unreconciled override with this target as reconciled
    ReconcileOverride(String),
}

/// An atomic multi-record write
///
/// Either every op lands or none do; a transition and its audit entry
/// always travel in the same batch.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Empty batch
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an op
    #[must_use]
    pub fn push(mut self, op: WriteOp) -> Self {
        self.ops.push(op);
        self
    }

    /// Ops in insertion order
    #[inline]
    #[must_use]
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }
}

/// Consistent view of every table at one commit version
///
/// Readers (pipeline, drift scan) work from a `StoreState` so a concurrent
/// approve elsewhere cannot produce a partial view.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    /// Monotonic commit counter at capture time
    pub version: u64,
    /// Every artifact record, all versions, ordered by (id, version)
    pub artifacts: Vec<ArtifactRecord>,
    /// Every approval record, in append order
    pub approvals: Vec<ApprovalRecord>,
    /// Every audit entry, in chain order
    pub audit_entries: Vec<AuditEntry>,
    /// Every override record, in append order
    pub overrides: Vec<Override>,
}

/// Persistence surface for the artifact store
///
/// Implementations must make `commit` atomic (all ops or none) and
/// `state()` a consistent point-in-time capture.
pub trait StorageBackend: Send + Sync {
    /// Apply a batch atomically, returning the new commit version
    fn commit(&self, batch: WriteBatch) -> Result<u64, StorageError>;

    /// Latest version of an artifact, if any
    fn latest(&self, id: ArtifactId) -> Option<ArtifactRecord>;

    /// Specific version of an artifact, if present
    fn at_version(&self, id: ArtifactId, version: Version) -> Option<ArtifactRecord>;

    /// Consistent snapshot of all tables
    fn state(&self) -> StoreState;

    /// Current commit version
    fn version(&self) -> u64;
}

#[derive(Debug, Default)]
struct MemoryInner {
    artifacts: BTreeMap<(ArtifactId, Version), ArtifactRecord>,
    approvals: Vec<ApprovalRecord>,
    audit_entries: Vec<AuditEntry>,
    overrides: Vec<Override>,
    version: u64,
}

/// In-memory reference backend
///
/// A single RwLock guards all tables, which makes batch commits trivially
/// atomic and snapshots trivially consistent.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: RwLock<MemoryInner>,
}

impl MemoryBackend {
    /// Empty backend
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn commit(&self, batch: WriteBatch) -> Result<u64, StorageError> {
        let mut inner = self.inner.write();
        for op in batch.ops() {
            match op {
                WriteOp::PutArtifact(record) => {
                    inner
                        .artifacts
                        .insert((record.id, record.version), record.clone());
                }
                WriteOp::PutApproval(record) => inner.approvals.push(record.clone()),
                WriteOp::AppendAudit(entry) => inner.audit_entries.push(entry.clone()),
                WriteOp::PutOverride(record) => inner.overrides.push(record.clone()),
                WriteOp::ReconcileOverride(target) => {
                    for record in inner
                        .overrides
                        .iter_mut()
                        .filter(|o| !o.reconciled && o.target == *target)
                    {
                        record.reconciled = true;
                    }
                }
            }
        }
        inner.version += 1;
        Ok(inner.version)
    }

    fn latest(&self, id: ArtifactId) -> Option<ArtifactRecord> {
        let inner = self.inner.read();
        inner
            .artifacts
            .range((id, Version(0))..=(id, Version(u32::MAX)))
            .next_back()
            .map(|(_, record)| record.clone())
    }

    fn at_version(&self, id: ArtifactId, version: Version) -> Option<ArtifactRecord> {
        self.inner.read().artifacts.get(&(id, version)).cloned()
    }

    fn state(&self) -> StoreState {
        let inner = self.inner.read();
        StoreState {
            version: inner.version,
            artifacts: inner.artifacts.values().cloned().collect(),
            approvals: inner.approvals.clone(),
            audit_entries: inner.audit_entries.clone(),
            overrides: inner.overrides.clone(),
        }
    }

    fn version(&self) -> u64 {
        self.inner.read().version
    }
}

//! AGE — Artifact Governance Engine
//!
//! A human-gated governor for plan-driven development pipelines. Automated
//! collaborators produce artifacts; humans approve them; executors apply
//! them; and this engine enforces that nothing moves forward except through
//! that contract:
//!
//! - **Lifecycle** (`age-store`): draft → approved → locked transitions
//!   over an append-only, hash-chained, atomically-committed store.
//! - **Pipeline** (`age-pipeline`): four ordered read-only verification
//!   stages over the store and the reported repository state.
//! - **Recovery** (`age-recovery`): failures become persisted artifacts;
//!   each category maps to exactly one recovery playbook.
//! - **Drift** (`age-drift`): scheduled scans score code/plan divergence
//!   and freeze new work above a threshold.
//!
//! [`GovernanceEngine`] wires the four behind one facade.
//!
//! # Example
//!
//! ```rust,ignore
//! use age_engine::{EngineConfig, GovernanceEngine};
//! use age_artifact::{Actor, ArtifactKind, DraftArtifact};
//! use serde_json::json;
//!
//! let engine = GovernanceEngine::new(EngineConfig::new("/repo"));
//! let plan = engine.register(DraftArtifact::new(
//!     ArtifactKind::ImplementationPlan,
//!     json!({ "unit": "auth", "files": ["src/auth.rs"] }),
//! ))?;
//! engine.approve(plan, Actor::human("alice"), "looks right")?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod engine;

pub use config::EngineConfig;
pub use engine::GovernanceEngine;

// The full API surface of the component crates, re-exported for front ends
// that depend on this crate alone.
pub use age_artifact::{
    Actor, ApprovalRecord, ArtifactFilter, ArtifactId, ArtifactKind, ArtifactRecord,
    ArtifactStatus, AuditEntry, AuditOp, DraftArtifact, DriftKind, DriftSignal, FailureCategory,
    FailureId, FailurePhase, FailureReport, GovernanceError, GovernanceResult, Override,
    OverrideScope, PayloadHash, ReconciliationBody, Version,
};
pub use age_drift::DriftPolicy;
pub use age_pipeline::{
    AppliedDiff, PipelineMode, PipelineResult, RepositorySnapshot, StageKind, StageOutcome,
};
pub use age_recovery::RecoveryOutcome;
pub use age_store::{MemoryBackend, StorageBackend, StoreSnapshot};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

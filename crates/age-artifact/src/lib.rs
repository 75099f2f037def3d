//! AGE Artifact Data Model
//!
//! Typed, versioned, schema-validated artifact records with
//! content-addressed payload hashing.
//!
//! # Core Concepts
//!
//! - [`ArtifactRecord`]: one immutable version of one artifact
//! - [`ArtifactKind`]: the fixed enumeration of artifact types
//! - [`ArtifactStatus`]: draft → approved → locked lifecycle
//! - [`PayloadHash`]: 32-byte Blake3 hash over the canonical payload bytes
//! - [`GovernanceError`]: the flat, exhaustive governance error taxonomy
//!
//! # Example
//!
//! ```rust,ignore
//! use age_artifact::{ArtifactKind, DraftArtifact};
//! use serde_json::json;
//!
//! let draft = DraftArtifact::new(
//!     ArtifactKind::TestPlan,
//!     json!({ "covers": ["tests/foo_test.rs"] }),
//! );
//! age_artifact::schema::validate_payload(draft.kind, &draft.payload)?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod hash;
pub mod records;
pub mod schema;
mod types;

pub use error::{GovernanceError, GovernanceResult, SchemaViolation, StorageError};
pub use hash::{HashError, PayloadHash};
pub use records::{
    ApprovalRecord, AuditEntry, AuditOp, DriftKind, DriftSignal, FailureCategory, FailurePhase,
    FailureReport, Override, OverrideScope, ReconciliationBody,
};
pub use types::{
    Actor, ArtifactFilter, ArtifactId, ArtifactKind, ArtifactRecord, ArtifactStatus, DraftArtifact,
    FailureId, Version,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Governance error taxonomy
//!
//! The flat, exhaustive set of contract violations the engine can surface.
//! Every variant is a stable kind: front ends render the kind and details
//! verbatim, and contract tests match on the kind string.

use crate::types::{ArtifactId, ArtifactStatus};

/// A single schema violation inside a payload
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SchemaViolation {
    /// JSON pointer-ish path of the offending element
    pub path: String,
    /// Human-readable description
    pub message: String,
}

impl SchemaViolation {
    /// Create a violation
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Main governance error type
///
/// Never silently retried or downgraded; recovery is always routed through
/// the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum GovernanceError {
    /// Payload does not conform to its kind's declarative schema
    #[error("schema invalid for {kind}: {} violation(s)", violations.len())]
    SchemaInvalid {
        /// Artifact kind whose schema was violated
        kind: &'static str,
        /// Individual violations
        violations: Vec<SchemaViolation>,
    },

    /// Requested status change is not in the allowed-transition table
    #[error("invalid transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: ArtifactId,
        from: ArtifactStatus,
        to: ArtifactStatus,
    },

    /// A `depends_on` entry is not approved or locked
    #[error("dependency {id} not approved (status: {status})")]
    DependencyNotApproved {
        id: ArtifactId,
        status: ArtifactStatus,
    },

    /// A changeset touches the governed file set of a locked artifact
    #[error("test modification after lock: {file} is governed by locked artifact {locked_by}")]
    TestModificationAfterLock { file: String, locked_by: ArtifactId },

    /// A changeset touches files no approved plan allows
    #[error("unplanned code change: {} file(s) outside all approved plans", files.len())]
    UnplannedCodeChange { files: Vec<String> },

    /// A declared architecture rule matched the changeset
    #[error("architecture violation: {file} breaks rule '{rule}'")]
    ArchitectureViolation { file: String, rule: String },

    /// An applied diff has no matching audit entry, or the hash differs
    #[error("audit trail broken: {0}")]
    AuditTrailBroken(String),

    /// A second writer contended for the same artifact id
    #[error("concurrent modification of {id}")]
    ConcurrentModification { id: ArtifactId },

    /// Drift freeze is active; new change plans are blocked
    #[error("reconciliation required: drift freeze is active")]
    ReconciliationRequired,

    /// No record for the given id
    #[error("artifact not found: {0}")]
    NotFound(ArtifactId),

    /// Storage backend fault
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl GovernanceError {
    /// Stable kind string, doubling as a contract-test fixture
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SchemaInvalid { .. } => "SchemaInvalid",
            Self::InvalidTransition { .. } => "InvalidTransition",
            Self::DependencyNotApproved { .. } => "DependencyNotApproved",
            Self::TestModificationAfterLock { .. } => "TestModificationAfterLock",
            Self::UnplannedCodeChange { .. } => "UnplannedCodeChange",
            Self::ArchitectureViolation { .. } => "ArchitectureViolation",
            Self::AuditTrailBroken(_) => "AuditTrailBroken",
            Self::ConcurrentModification { .. } => "ConcurrentModification",
            Self::ReconciliationRequired => "ReconciliationRequired",
            Self::NotFound(_) => "NotFound",
            Self::Storage(_) => "Storage",
        }
    }

    /// Whether this error blocks further pipeline progress
    ///
    /// Everything in the taxonomy blocks except a plain lookup miss.
    #[inline]
    #[must_use]
    pub const fn is_blocking(&self) -> bool {
        !matches!(self, Self::NotFound(_))
    }
}

/// Storage backend errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Backend rejected or failed a write batch
    #[error("commit failed: {0}")]
    CommitFailed(String),

    /// Record could not be encoded or decoded
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Underlying I/O fault (filesystem backends)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<crate::hash::HashError> for GovernanceError {
    fn from(value: crate::hash::HashError) -> Self {
        match value {
            crate::hash::HashError::Serialization(e) => Self::Storage(StorageError::Codec(e)),
            other => Self::Storage(StorageError::CommitFailed(other.to_string())),
        }
    }
}

/// Result type alias for governance operations
pub type GovernanceResult<T> = Result<T, GovernanceError>;

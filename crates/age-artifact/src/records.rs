//! Secondary governance records
//!
//! Approval, audit, failure, drift, reconciliation, and override records.
//! Failure reports and reconciliation plans are first-class artifacts: their
//! bodies serialize into artifact payloads. The rest live in their own
//! append-only tables.

use crate::hash::PayloadHash;
use crate::types::{Actor, ArtifactId, Version};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record of one draft → approved transition
///
/// Append-only, 1:1 with the approval of a specific artifact version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    /// Approved artifact
    pub artifact_id: ArtifactId,
    /// Version that was approved
    pub version: Version,
    /// Approving human
    pub approver: Actor,
    /// Approval timestamp
    pub timestamp: DateTime<Utc>,
    /// Free-form reviewer notes
    pub notes: String,
}

/// Lifecycle operation recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOp {
    Register,
    Approve,
    Lock,
    Supersede,
    Override,
    ReconcileOverride,
    Freeze,
    Thaw,
}

impl AuditOp {
    /// Stable lowercase identifier
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Approve => "approve",
            Self::Lock => "lock",
            Self::Supersede => "supersede",
            Self::Override => "override",
            Self::ReconcileOverride => "reconcile_override",
            Self::Freeze => "freeze",
            Self::Thaw => "thaw",
        }
    }
}

/// One entry in the hash-chained audit log
///
/// `entry_hash` covers every field including `prev_hash`, so any in-place
/// tamper breaks the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Operation performed
    pub op: AuditOp,
    /// Artifact the operation touched
    pub artifact_id: ArtifactId,
    /// Artifact version after the operation
    pub version: Version,
    /// Who performed it
    pub actor: Actor,
    /// When
    pub timestamp: DateTime<Utc>,
    /// Payload hash of the artifact after the operation
    pub resulting_hash: PayloadHash,
    /// Hash of the previous entry (zero for the first)
    pub prev_hash: PayloadHash,
    /// Hash of this entry
    pub entry_hash: PayloadHash,
}

/// Pipeline phase in which a failure was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePhase {
    Planning,
    Execution,
    Verification,
    Drift,
}

/// Exhaustive failure category; each selects exactly one recovery playbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    HumanInput,
    Planning,
    Execution,
    Verification,
    Drift,
}

impl FailureCategory {
    /// Stable lowercase identifier
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HumanInput => "human_input",
            Self::Planning => "planning",
            Self::Execution => "execution",
            Self::Verification => "verification",
            Self::Drift => "drift",
        }
    }
}

/// Structured failure record; a first-class artifact, not a log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    /// Phase the failure surfaced in
    pub phase: FailurePhase,
    /// Category selecting the recovery playbook
    pub category: FailureCategory,
    /// One-line summary
    pub summary: String,
    /// Detail lines, rendered verbatim by front ends
    pub details: Vec<String>,
    /// Unit of work the failure is scoped to, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Detection timestamp
    pub detected_at: DateTime<Utc>,
    /// Whether this failure blocks further progress
    pub blocking: bool,
}

impl FailureReport {
    /// Create a blocking report detected now
    pub fn new(
        phase: FailurePhase,
        category: FailureCategory,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            phase,
            category,
            summary: summary.into(),
            details: Vec::new(),
            unit: None,
            detected_at: Utc::now(),
            blocking: true,
        }
    }

    /// Append a detail line
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }

    /// Scope the failure to one unit of work
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Mark non-blocking
    #[inline]
    #[must_use]
    pub fn non_blocking(mut self) -> Self {
        self.blocking = false;
        self
    }
}

/// Kind of divergence between code and plans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftKind {
    /// File under the governed root with no covering change plan
    OrphanCode,
    /// Approved plan whose target path no longer exists
    OrphanPlan,
    /// File modified by more approved plans than the policy allows
    Hotspot,
}

/// One detected divergence, with a policy-assigned severity score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftSignal {
    /// Divergence kind
    pub kind: DriftKind,
    /// File path or artifact id the signal points at
    pub target: String,
    /// Integer severity; summed by `reconcile`
    pub severity: u32,
}

impl DriftSignal {
    /// Create a signal
    pub fn new(kind: DriftKind, target: impl Into<String>, severity: u32) -> Self {
        Self {
            kind,
            target: target.into(),
            severity,
        }
    }
}

/// Body of a ReconciliationPlan artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationBody {
    /// Signals that triggered the plan
    pub signals: Vec<DriftSignal>,
    /// Sum of signal severities at emission time
    pub total_severity: u32,
    /// Whether new change-plan registration is blocked until resolution
    pub freeze: bool,
}

/// Scope of a deliberate invariant bypass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideScope {
    /// One named operation only
    Operation(String),
    /// All operations on one artifact
    Artifact(ArtifactId),
    /// The whole repository
    Repository,
}

/// A deliberate, reason-logged bypass of an invariant
///
/// Never silent: persisted at creation, queryable until `reconciled` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Override {
    /// Invariant or check being bypassed
    pub target: String,
    /// Required, non-empty justification
    pub reason: String,
    /// Scope of the bypass
    pub scope: OverrideScope,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Whether the bypass has been reconciled
    pub reconciled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_report_builder() {
        let report = FailureReport::new(
            FailurePhase::Verification,
            FailureCategory::Verification,
            "tests failed",
        )
        .with_detail("assertion failed in tests/foo_test.rs")
        .with_detail("2 of 14 cases red");

        assert!(report.blocking);
        assert_eq!(report.details.len(), 2);
        assert_eq!(report.category.as_str(), "verification");
    }

    #[test]
    fn failure_report_round_trips_as_payload() {
        let report = FailureReport::new(
            FailurePhase::Execution,
            FailureCategory::Execution,
            "partial apply",
        );
        let payload = serde_json::to_value(&report).unwrap();
        let back: FailureReport = serde_json::from_value(payload).unwrap();
        assert_eq!(report, back);
    }

    #[test]
    fn drift_signal_severity() {
        let signal = DriftSignal::new(DriftKind::OrphanCode, "src/orphan.rs", 2);
        assert_eq!(signal.severity, 2);
        assert_eq!(signal.kind, DriftKind::OrphanCode);
    }

    #[test]
    fn reconciliation_body_serializes() {
        let body = ReconciliationBody {
            signals: vec![DriftSignal::new(DriftKind::Hotspot, "src/core.rs", 3)],
            total_severity: 3,
            freeze: true,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["freeze"], serde_json::json!(true));
    }

    #[test]
    fn audit_op_identifiers() {
        assert_eq!(AuditOp::Register.as_str(), "register");
        assert_eq!(AuditOp::Supersede.as_str(), "supersede");
    }
}

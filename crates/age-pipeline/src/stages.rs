//! The four verification stages
//!
//! Each stage is a pure function over the store snapshot and the reported
//! repository state. Stages never mutate anything; they return a
//! [`StageReport`] that the pipeline aggregates.

use age_artifact::{ArtifactRecord, ArtifactStatus, PayloadHash};
use age_store::StoreSnapshot;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::snapshot::RepositorySnapshot;

/// Identity of a pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    ArtifactValidation,
    ApprovalVerification,
    InvariantEnforcement,
    AuditVerification,
}

impl StageKind {
    /// All stages, in execution order
    pub const ORDERED: [StageKind; 4] = [
        Self::ArtifactValidation,
        Self::ApprovalVerification,
        Self::InvariantEnforcement,
        Self::AuditVerification,
    ];

    /// Stable lowercase identifier
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ArtifactValidation => "artifact_validation",
            Self::ApprovalVerification => "approval_verification",
            Self::InvariantEnforcement => "invariant_enforcement",
            Self::AuditVerification => "audit_verification",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Passed,
    Failed,
    /// Not executed because an earlier stage failed in fail-fast mode
    Skipped,
}

/// One violation found by a stage
///
/// `kind` is a stable governance error kind; front ends render kind and
/// detail verbatim. Serialize-only: reports flow outward, never back in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageViolation {
    pub kind: &'static str,
    pub detail: String,
}

impl StageViolation {
    fn new(kind: &'static str, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for StageViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

/// Sub-result of one stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub stage: StageKind,
    pub outcome: StageOutcome,
    pub violations: Vec<StageViolation>,
}

impl StageReport {
    fn from_violations(stage: StageKind, violations: Vec<StageViolation>) -> Self {
        let outcome = if violations.is_empty() {
            StageOutcome::Passed
        } else {
            StageOutcome::Failed
        };
        Self {
            stage,
            outcome,
            violations,
        }
    }

    pub(crate) fn skipped(stage: StageKind) -> Self {
        Self {
            stage,
            outcome: StageOutcome::Skipped,
            violations: Vec::new(),
        }
    }

    /// Whether the stage passed
    #[inline]
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome == StageOutcome::Passed
    }
}

/// String entries of an array-valued payload key
fn payload_strings<'a>(record: &'a ArtifactRecord, key: &str) -> Vec<&'a str> {
    record
        .payload
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| items.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default()
}

/// Stage 1: artifact validation
///
/// No draft artifact may be relevant to the current operation, and every
/// relevant artifact must independently re-pass its declarative schema and
/// its pinned payload hash (detects storage corruption).
pub(crate) fn artifact_validation(relevant: &[ArtifactRecord]) -> StageReport {
    let mut violations = Vec::new();
    for record in relevant {
        if record.status == ArtifactStatus::Draft {
            violations.push(StageViolation::new(
                "DependencyNotApproved",
                format!("{} ({}) is still a draft", record.id, record.kind),
            ));
        }
        if !record.verify_payload() {
            violations.push(StageViolation::new(
                "SchemaInvalid",
                format!("{} payload no longer matches its pinned hash", record.id),
            ));
        }
        if let Err(err) = age_artifact::schema::validate_payload(record.kind, &record.payload) {
            violations.push(StageViolation::new(
                "SchemaInvalid",
                format!("{} fails schema re-validation: {err}", record.id),
            ));
        }
    }
    StageReport::from_violations(StageKind::ArtifactValidation, violations)
}

/// Stage 2: approval verification
///
/// Every non-draft artifact touched by the operation must carry an
/// approval record for the exact version in play.
pub(crate) fn approval_verification(
    snapshot: &StoreSnapshot,
    relevant: &[ArtifactRecord],
) -> StageReport {
    let mut violations = Vec::new();
    for record in relevant {
        let needs_approval = matches!(
            record.status,
            ArtifactStatus::Approved | ArtifactStatus::Locked
        );
        if needs_approval && snapshot.approval_for(record.id, record.version).is_none() {
            violations.push(StageViolation::new(
                "AuditTrailBroken",
                format!(
                    "{} {} has status {} but no approval record",
                    record.id, record.version, record.status
                ),
            ));
        }
    }
    StageReport::from_violations(StageKind::ApprovalVerification, violations)
}

/// Stage 3: invariant enforcement
///
/// (a) locked governed file sets are untouchable, (b) every changed file
/// must be allowed by some approved change plan, (c) declared architecture
/// rules hold over the changeset.
pub(crate) fn invariant_enforcement(
    snapshot: &StoreSnapshot,
    repo: &RepositorySnapshot,
) -> StageReport {
    let mut violations = Vec::new();
    let latest = snapshot.latest_records();

    // (a) Locked file sets.
    for record in latest.iter().filter(|r| r.status == ArtifactStatus::Locked) {
        for governed in payload_strings(record, "covers") {
            if repo.changed_files.iter().any(|f| f == governed) {
                violations.push(StageViolation::new(
                    "TestModificationAfterLock",
                    format!("{governed} is governed by locked artifact {}", record.id),
                ));
            }
        }
    }

    // (b) Unplanned changes.
    let allowed: IndexSet<&str> = latest
        .iter()
        .filter(|r| r.kind.is_change_plan() && r.status == ArtifactStatus::Approved)
        .flat_map(|r| payload_strings(r, "files"))
        .collect();
    let unplanned: Vec<&String> = repo
        .changed_files
        .iter()
        .filter(|f| !allowed.contains(f.as_str()))
        .collect();
    for file in unplanned {
        violations.push(StageViolation::new(
            "UnplannedCodeChange",
            format!("{file} is not named by any approved plan"),
        ));
    }

    // (c) Architecture rules.
    for record in latest
        .iter()
        .filter(|r| r.kind == age_artifact::ArtifactKind::ArchitecturePlan)
        .filter(|r| r.status.is_referenceable())
    {
        let rules = record
            .payload
            .get("rules")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        for rule in &rules {
            let Some(prefix) = rule.get("forbid_prefix").and_then(|v| v.as_str()) else {
                continue;
            };
            let exemption = rule.get("unless_under").and_then(|v| v.as_str());
            for file in &repo.changed_files {
                let exempt = exemption.is_some_and(|e| file.starts_with(e));
                if file.starts_with(prefix) && !exempt {
                    violations.push(StageViolation::new(
                        "ArchitectureViolation",
                        format!("{file} breaks rule 'forbid {prefix}'"),
                    ));
                }
            }
        }
    }

    StageReport::from_violations(StageKind::InvariantEnforcement, violations)
}

/// Stage 4: audit verification
///
/// Every diff claimed to have been applied must correspond to an audit
/// entry for its plan with a matching content hash.
pub(crate) fn audit_verification(
    snapshot: &StoreSnapshot,
    repo: &RepositorySnapshot,
) -> StageReport {
    let mut violations = Vec::new();
    for diff in &repo.applied_diffs {
        let matched = snapshot.audit_entries().iter().any(|entry| {
            entry.artifact_id == diff.plan && entry.resulting_hash == diff.content_hash
        });
        if !matched {
            let detail = if diff.content_hash == PayloadHash::zero() {
                format!("diff for plan {} carries no content hash", diff.plan)
            } else {
                format!(
                    "no audit entry for plan {} with hash {}",
                    diff.plan,
                    diff.content_hash.short()
                )
            };
            violations.push(StageViolation::new("AuditTrailBroken", detail));
        }
    }
    StageReport::from_violations(StageKind::AuditVerification, violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn stage_reports_serialize_for_front_ends() {
        let report = StageReport::from_violations(
            StageKind::InvariantEnforcement,
            vec![StageViolation::new(
                "UnplannedCodeChange",
                "src/sneaky.rs is not named by any approved plan",
            )],
        );

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["stage"], serde_json::json!("invariant_enforcement"));
        assert_eq!(value["outcome"], serde_json::json!("failed"));
        assert_eq!(
            value["violations"][0]["kind"],
            serde_json::json!("UnplannedCodeChange")
        );
    }

    #[test]
    fn violation_display_pairs_kind_and_detail() {
        let violation = StageViolation::new("AuditTrailBroken", "no entry for plan");
        assert_eq!(violation.to_string(), "AuditTrailBroken: no entry for plan");
    }
}

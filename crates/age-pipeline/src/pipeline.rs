//! Pipeline orchestration
//!
//! Runs the four stages in order over one consistent store snapshot,
//! aggregates their reports, and persists the verdict back through the
//! store as a ValidationResult artifact.

use age_artifact::{
    Actor, ArtifactId, ArtifactKind, ArtifactRecord, DraftArtifact, GovernanceResult,
};
use age_store::ArtifactStore;
use serde_json::json;

use crate::snapshot::RepositorySnapshot;
use crate::stages::{self, StageKind, StageReport, StageViolation};

/// Halting behavior on a failing stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineMode {
    /// Stop at the first failing stage; later stages report `Skipped`
    #[default]
    FailFast,
    /// Run every stage regardless, for diagnostics
    Diagnostic,
}

/// Aggregated result of one verification pass
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Per-stage sub-results, in execution order
    pub stages: Vec<StageReport>,
    /// Store commit version the pass observed
    pub store_version: u64,
    /// Persisted ValidationResult artifact
    pub result_artifact: ArtifactId,
}

impl PipelineResult {
    /// Overall verdict: every executed stage passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.stages.iter().all(|s| s.violations.is_empty())
    }

    /// First violation in stage order, if any
    #[must_use]
    pub fn first_violation(&self) -> Option<&StageViolation> {
        self.stages.iter().flat_map(|s| s.violations.iter()).next()
    }

    /// Report for one stage
    #[must_use]
    pub fn stage(&self, kind: StageKind) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == kind)
    }
}

/// The CI invariant enforcement pipeline
///
/// Stateless; all inputs arrive per call. Read-only with respect to both
/// the repository and the artifact store, except for persisting its own
/// verdict.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvariantPipeline;

impl InvariantPipeline {
    /// Create a pipeline
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Run all four stages over the current store state
    ///
    /// # Errors
    /// Only persistence of the verdict can fail; stage violations are
    /// reported inside the returned [`PipelineResult`], never as an `Err`.
    pub fn validate(
        &self,
        store: &ArtifactStore,
        repo: &RepositorySnapshot,
        mode: PipelineMode,
    ) -> GovernanceResult<PipelineResult> {
        let snapshot = store.snapshot();
        let relevant: Vec<ArtifactRecord> = repo
            .relevant_ids()
            .into_iter()
            .filter_map(|id| snapshot.latest(id).cloned())
            .collect();

        let mut reports: Vec<StageReport> = Vec::with_capacity(StageKind::ORDERED.len());
        let mut halted = false;
        for kind in StageKind::ORDERED {
            if halted {
                reports.push(StageReport::skipped(kind));
                continue;
            }
            let report = match kind {
                StageKind::ArtifactValidation => stages::artifact_validation(&relevant),
                StageKind::ApprovalVerification => {
                    stages::approval_verification(&snapshot, &relevant)
                }
                StageKind::InvariantEnforcement => {
                    stages::invariant_enforcement(&snapshot, repo)
                }
                StageKind::AuditVerification => stages::audit_verification(&snapshot, repo),
            };
            if !report.passed() {
                tracing::warn!(
                    stage = %kind,
                    violations = report.violations.len(),
                    "pipeline stage failed"
                );
                if mode == PipelineMode::FailFast {
                    halted = true;
                }
            } else {
                tracing::debug!(stage = %kind, "pipeline stage passed");
            }
            reports.push(report);
        }

        let passed = reports.iter().all(|s| s.violations.is_empty());
        let errors: Vec<String> = reports
            .iter()
            .flat_map(|s| s.violations.iter())
            .map(ToString::to_string)
            .collect();
        let verdict = DraftArtifact::new(
            ArtifactKind::ValidationResult,
            json!({ "passed": passed, "errors": errors }),
        )
        .created_by(Actor::system("pipeline"));
        let result_artifact = store.register(verdict)?;

        tracing::info!(passed, store_version = snapshot.version(), "pipeline completed");
        Ok(PipelineResult {
            stages: reports,
            store_version: snapshot.version(),
            result_artifact,
        })
    }
}

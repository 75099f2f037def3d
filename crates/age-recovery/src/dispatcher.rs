//! Recovery dispatch
//!
//! One playbook per failure category, selected by a total match. No
//! category ever maps to "retry silently"; every outcome either routes the
//! failure to a human or names the exact mechanical step the caller must
//! take before the pipeline may proceed.

use age_artifact::{
    Actor, ArtifactId, ArtifactKind, DraftArtifact, FailureCategory, FailureId, FailureReport,
    GovernanceError, GovernanceResult, StorageError,
};
use age_store::ArtifactStore;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Directive returned by a recovery playbook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "directive", rename_all = "snake_case")]
pub enum RecoveryOutcome {
    /// Stop and surface the failure; an upstream artifact needs a human
    /// edit before anything downstream can continue
    HaltForUpstreamEdit,
    /// The partial execution was undone; `requires_new_plan` tells the
    /// caller whether the plan itself must be superseded before retrying
    RolledBack { requires_new_plan: bool },
    /// Re-enter planning for one unit of work, leaving sibling units alone
    ReplanUnit { unit: Option<String> },
    /// Handed to the drift reconciliation engine; no local action
    RoutedToReconciliation,
}

/// Playbook selection: category in, directive out
///
/// Total over [`FailureCategory`]; adding a category without a playbook is
/// a compile error.
#[must_use]
pub fn playbook_for(report: &FailureReport) -> RecoveryOutcome {
    match report.category {
        FailureCategory::HumanInput | FailureCategory::Planning => {
            RecoveryOutcome::HaltForUpstreamEdit
        }
        FailureCategory::Execution => RecoveryOutcome::RolledBack {
            requires_new_plan: true,
        },
        FailureCategory::Verification => RecoveryOutcome::ReplanUnit {
            unit: report.unit.clone(),
        },
        FailureCategory::Drift => RecoveryOutcome::RoutedToReconciliation,
    }
}

/// The failure taxonomy and recovery dispatcher
///
/// A failure id is the artifact id of its persisted FailureReport under a
/// typed alias, so reports survive restarts with the store and `recover`
/// can always find its input.
pub struct RecoveryDispatcher {
    store: Arc<ArtifactStore>,
    /// First-decided outcome per failure, for idempotent re-dispatch.
    outcomes: Mutex<HashMap<FailureId, RecoveryOutcome>>,
}

impl std::fmt::Debug for RecoveryDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryDispatcher")
            .field("dispatched", &self.outcomes.lock().len())
            .finish()
    }
}

impl RecoveryDispatcher {
    /// Create a dispatcher over a store
    #[must_use]
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self {
            store,
            outcomes: Mutex::new(HashMap::new()),
        }
    }

    /// Persist a failure as a FailureReport artifact
    ///
    /// # Errors
    /// Propagates registration errors from the store; a report that cannot
    /// be persisted is never dispatched.
    pub fn report(&self, report: FailureReport) -> GovernanceResult<FailureId> {
        let payload = serde_json::to_value(&report).map_err(StorageError::Codec)?;
        let draft = DraftArtifact::new(ArtifactKind::FailureReport, payload)
            .created_by(Actor::system("recovery"));
        let id = self.store.register(draft)?;
        tracing::warn!(
            failure = %id,
            phase = ?report.phase,
            category = report.category.as_str(),
            blocking = report.blocking,
            "failure reported: {}",
            report.summary
        );
        Ok(FailureId(id.0))
    }

    /// Dispatch recovery for a reported failure
    ///
    /// The first call selects the playbook from the failure's category;
    /// repeated calls return the already-decided outcome without
    /// re-dispatching.
    ///
    /// # Errors
    /// - [`GovernanceError::NotFound`] if the id does not name a persisted
    ///   failure report
    /// - [`GovernanceError::Storage`] if the stored payload no longer
    ///   decodes
    pub fn recover(&self, id: FailureId) -> GovernanceResult<RecoveryOutcome> {
        if let Some(prior) = self.outcomes.lock().get(&id) {
            tracing::debug!(failure = %id, "recovery already dispatched");
            return Ok(prior.clone());
        }

        let artifact_id = ArtifactId(id.0);
        let record = self.store.get(artifact_id)?;
        if record.kind != ArtifactKind::FailureReport {
            return Err(GovernanceError::NotFound(artifact_id));
        }
        let report: FailureReport =
            serde_json::from_value(record.payload).map_err(StorageError::Codec)?;

        let outcome = playbook_for(&report);
        tracing::info!(
            failure = %id,
            category = report.category.as_str(),
            outcome = ?outcome,
            "recovery dispatched"
        );
        self.outcomes
            .lock()
            .entry(id)
            .or_insert_with(|| outcome.clone());
        Ok(outcome)
    }

    /// Outcome already decided for a failure, if any
    #[must_use]
    pub fn dispatched_outcome(&self, id: FailureId) -> Option<RecoveryOutcome> {
        self.outcomes.lock().get(&id).cloned()
    }
}

//! Repository snapshot input
//!
//! What an executor reports back after applying approved plans: the set of
//! changed file paths and, per applied diff, the plan that authorized it
//! and the payload hash the executor worked from. The pipeline itself never
//! reads the working tree.

use age_artifact::{ArtifactId, PayloadHash};
use serde::{Deserialize, Serialize};

/// One applied diff, as reported by an executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedDiff {
    /// Plan artifact that authorized the diff
    pub plan: ArtifactId,
    /// Payload hash of the plan version the executor applied
    pub content_hash: PayloadHash,
}

/// Reported state of the repository for one verification pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    /// Files the current operation changed
    pub changed_files: Vec<String>,
    /// Diffs claimed to have been applied
    pub applied_diffs: Vec<AppliedDiff>,
    /// Artifacts relevant to the current operation; when empty, the
    /// pipeline derives relevance from `applied_diffs`
    pub scope: Vec<ArtifactId>,
}

impl RepositorySnapshot {
    /// Snapshot with a changed-file set and nothing else
    #[inline]
    #[must_use]
    pub fn new(changed_files: Vec<String>) -> Self {
        Self {
            changed_files,
            applied_diffs: Vec::new(),
            scope: Vec::new(),
        }
    }

    /// With an applied diff
    #[inline]
    #[must_use]
    pub fn with_diff(mut self, plan: ArtifactId, content_hash: PayloadHash) -> Self {
        self.applied_diffs.push(AppliedDiff { plan, content_hash });
        self
    }

    /// With an explicitly scoped artifact
    #[inline]
    #[must_use]
    pub fn with_scope(mut self, id: ArtifactId) -> Self {
        self.scope.push(id);
        self
    }

    /// Ids the pipeline treats as relevant to this operation
    #[must_use]
    pub fn relevant_ids(&self) -> Vec<ArtifactId> {
        if self.scope.is_empty() {
            self.applied_diffs.iter().map(|d| d.plan).collect()
        } else {
            self.scope.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_overrides_diff_derivation() {
        let plan = ArtifactId::new();
        let scoped = ArtifactId::new();
        let snapshot = RepositorySnapshot::new(vec![])
            .with_diff(plan, PayloadHash::zero())
            .with_scope(scoped);
        assert_eq!(snapshot.relevant_ids(), vec![scoped]);
    }

    #[test]
    fn relevance_falls_back_to_diffs() {
        let plan = ArtifactId::new();
        let snapshot = RepositorySnapshot::new(vec![]).with_diff(plan, PayloadHash::zero());
        assert_eq!(snapshot.relevant_ids(), vec![plan]);
    }
}

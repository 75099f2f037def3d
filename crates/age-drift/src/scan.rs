//! Drift scanning
//!
//! Read-only over both inputs: file metadata under the governed code root
//! (paths only, never contents) and a consistent store snapshot taken at
//! scan start. Three classifications:
//!
//! - `orphan_code`: a file under the root that no approved change plan
//!   names
//! - `orphan_plan`: an approved change plan naming a path that no longer
//!   exists
//! - `hotspot`: a file named by at least `hotspot_plans` approved change
//!   plans inside the rolling window

use age_artifact::{ArtifactRecord, ArtifactStatus, DriftKind, DriftSignal};
use age_store::StoreSnapshot;
use chrono::Utc;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

use crate::policy::DriftPolicy;

/// String entries of an array-valued payload key
fn payload_strings<'a>(record: &'a ArtifactRecord, key: &str) -> Vec<&'a str> {
    record
        .payload
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| items.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default()
}

/// Files under `root`, as sorted root-relative paths
///
/// Dot-prefixed entries are ignored; unreadable directories are logged and
/// skipped rather than aborting the scan.
fn governed_files(root: &Path) -> Vec<String> {
    let mut stack = vec![PathBuf::from(root)];
    let mut files = Vec::new();
    while let Some(dir) = stack.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(path = %dir.display(), %err, "skipping unreadable directory");
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name();
            if name.to_string_lossy().starts_with('.') {
                continue;
            }
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() {
                if let Ok(relative) = path.strip_prefix(root) {
                    files.push(relative.to_string_lossy().into_owned());
                }
            }
        }
    }
    files.sort();
    files
}

/// Compare code reality against artifact intent
///
/// Pure with respect to the store: signals are returned, never persisted
/// here. Feed them to [`crate::reconcile`] for aggregation.
#[must_use]
pub fn scan(code_root: &Path, snapshot: &StoreSnapshot, policy: &DriftPolicy) -> Vec<DriftSignal> {
    let cutoff = Utc::now() - policy.hotspot_window();
    let approved_plans: Vec<&ArtifactRecord> = snapshot
        .latest_records()
        .into_iter()
        .filter(|r| r.kind.is_change_plan() && r.status == ArtifactStatus::Approved)
        .collect();

    let mut signals = Vec::new();

    // Orphan code: governed files nobody planned.
    for file in governed_files(code_root) {
        let planned = approved_plans
            .iter()
            .any(|plan| payload_strings(plan, "files").contains(&file.as_str()));
        if !planned {
            signals.push(DriftSignal::new(
                DriftKind::OrphanCode,
                file,
                policy.orphan_code_severity,
            ));
        }
    }

    // Orphan plans: approved intent pointing at nothing.
    for plan in &approved_plans {
        let missing = payload_strings(plan, "files")
            .iter()
            .any(|file| !code_root.join(file).is_file());
        if missing {
            signals.push(DriftSignal::new(
                DriftKind::OrphanPlan,
                plan.id.to_string(),
                policy.orphan_plan_severity,
            ));
        }
    }

    // Hotspots: files churned by many plans inside the window.
    let mut plan_counts: IndexMap<&str, usize> = IndexMap::new();
    for plan in approved_plans
        .iter()
        .filter(|p| p.created_at >= cutoff)
    {
        for file in payload_strings(plan, "files") {
            *plan_counts.entry(file).or_insert(0) += 1;
        }
    }
    for (file, count) in &plan_counts {
        if *count >= policy.hotspot_plans {
            signals.push(DriftSignal::new(
                DriftKind::Hotspot,
                *file,
                policy.hotspot_severity,
            ));
        }
    }

    tracing::debug!(
        signals = signals.len(),
        store_version = snapshot.version(),
        root = %code_root.display(),
        "drift scan complete"
    );
    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use age_artifact::{Actor, ArtifactKind, DraftArtifact};
    use age_store::{ArtifactStore, MemoryBackend};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    fn approve_plan(store: &ArtifactStore, unit: &str, files: &[&str]) {
        let id = store
            .register(DraftArtifact::new(
                ArtifactKind::ImplementationPlan,
                json!({ "unit": unit, "files": files }),
            ))
            .unwrap();
        store.approve(id, Actor::human("alice"), "").unwrap();
    }

    #[test]
    fn planned_tree_scans_clean() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/auth.rs");
        let store = ArtifactStore::new(MemoryBackend::new());
        approve_plan(&store, "auth", &["src/auth.rs"]);

        let signals = scan(dir.path(), &store.snapshot(), &DriftPolicy::default());
        assert_eq!(signals, vec![]);
    }

    #[test]
    fn unplanned_file_is_orphan_code() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/auth.rs");
        touch(dir.path(), "src/orphan.rs");
        let store = ArtifactStore::new(MemoryBackend::new());
        approve_plan(&store, "auth", &["src/auth.rs"]);

        let signals = scan(dir.path(), &store.snapshot(), &DriftPolicy::default());
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, DriftKind::OrphanCode);
        assert_eq!(signals[0].target, "src/orphan.rs");
        assert_eq!(signals[0].severity, 2);
    }

    #[test]
    fn plan_for_deleted_file_is_orphan_plan() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(MemoryBackend::new());
        approve_plan(&store, "auth", &["src/deleted.rs"]);

        let signals = scan(dir.path(), &store.snapshot(), &DriftPolicy::default());
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, DriftKind::OrphanPlan);
    }

    #[test]
    fn churned_file_becomes_hotspot() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/core.rs");
        let store = ArtifactStore::new(MemoryBackend::new());
        for unit in ["a", "b", "c"] {
            approve_plan(&store, unit, &["src/core.rs"]);
        }

        let signals = scan(dir.path(), &store.snapshot(), &DriftPolicy::default());
        let hotspot: Vec<_> = signals
            .iter()
            .filter(|s| s.kind == DriftKind::Hotspot)
            .collect();
        assert_eq!(hotspot.len(), 1);
        assert_eq!(hotspot[0].target, "src/core.rs");
    }

    #[test]
    fn hotspot_window_excludes_old_plans() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/core.rs");
        let store = ArtifactStore::new(MemoryBackend::new());
        for unit in ["a", "b", "c"] {
            approve_plan(&store, unit, &["src/core.rs"]);
        }

        // A zero-day window puts every already-registered plan outside it.
        let policy = DriftPolicy::default().with_hotspot(3, 0);
        let signals = scan(dir.path(), &store.snapshot(), &policy);
        assert!(signals.iter().all(|s| s.kind != DriftKind::Hotspot));
    }

    #[test]
    fn draft_plans_do_not_cover_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/auth.rs");
        let store = ArtifactStore::new(MemoryBackend::new());
        store
            .register(DraftArtifact::new(
                ArtifactKind::ImplementationPlan,
                json!({ "unit": "auth", "files": ["src/auth.rs"] }),
            ))
            .unwrap();

        let signals = scan(dir.path(), &store.snapshot(), &DriftPolicy::default());
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, DriftKind::OrphanCode);
    }

    #[test]
    fn dot_entries_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), ".git/config");
        touch(dir.path(), ".hidden");
        let store = ArtifactStore::new(MemoryBackend::new());

        let signals = scan(dir.path(), &store.snapshot(), &DriftPolicy::default());
        assert_eq!(signals, vec![]);
    }
}

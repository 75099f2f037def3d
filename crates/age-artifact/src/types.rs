//! Core artifact types
//!
//! Defines the fundamental records of the governance engine:
//! - Artifact identity and versioning
//! - The fixed artifact kind enumeration
//! - Lifecycle statuses and the allowed-transition table
//! - The immutable per-version [`ArtifactRecord`]

use crate::hash::PayloadHash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique artifact identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactId(pub Ulid);

impl ArtifactId {
    /// Generate a new artifact id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique failure identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FailureId(pub Ulid);

impl FailureId {
    /// Generate a new failure id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for FailureId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FailureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing artifact version
///
/// A new version is a new record; versions are never edited in place.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Version(pub u32);

impl Version {
    /// First version of an artifact
    #[inline]
    #[must_use]
    pub const fn initial() -> Self {
        Self(1)
    }

    /// Successor version
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// The identity performing an operation
///
/// Producers (compiler passes, validators) are `System`; approvals and
/// overrides always come from a `Human`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Actor {
    /// A human operator, identified by name or handle
    Human(String),
    /// An automated collaborator, identified by component name
    System(String),
}

impl Actor {
    /// Create a human actor
    #[inline]
    pub fn human(id: impl Into<String>) -> Self {
        Self::Human(id.into())
    }

    /// Create a system actor
    #[inline]
    pub fn system(id: impl Into<String>) -> Self {
        Self::System(id.into())
    }

    /// True for human actors
    #[inline]
    #[must_use]
    pub fn is_human(&self) -> bool {
        matches!(self, Self::Human(_))
    }

    /// Identity string, without the role tag
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Human(id) | Self::System(id) => id,
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Human(id) => write!(f, "human:{id}"),
            Self::System(id) => write!(f, "system:{id}"),
        }
    }
}

/// The fixed enumeration of artifact kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    ProjectPlan,
    ArchitecturePlan,
    ScaffoldPlan,
    TestPlan,
    ImplementationPlan,
    RefactorPlan,
    ValidationResult,
    FailureReport,
    ReconciliationPlan,
}

impl ArtifactKind {
    /// All kinds, in declaration order
    pub const ALL: [ArtifactKind; 9] = [
        Self::ProjectPlan,
        Self::ArchitecturePlan,
        Self::ScaffoldPlan,
        Self::TestPlan,
        Self::ImplementationPlan,
        Self::RefactorPlan,
        Self::ValidationResult,
        Self::FailureReport,
        Self::ReconciliationPlan,
    ];

    /// Whether this kind supports the terminal `locked` status
    ///
    /// Only test-plan artifacts lock: their later modification must be
    /// forbidden outright rather than superseded.
    #[inline]
    #[must_use]
    pub const fn lockable(self) -> bool {
        matches!(self, Self::TestPlan)
    }

    /// Whether this kind declares a set of files it permits changes to
    #[inline]
    #[must_use]
    pub const fn is_change_plan(self) -> bool {
        matches!(self, Self::ImplementationPlan | Self::RefactorPlan)
    }

    /// Stable lowercase identifier
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProjectPlan => "project_plan",
            Self::ArchitecturePlan => "architecture_plan",
            Self::ScaffoldPlan => "scaffold_plan",
            Self::TestPlan => "test_plan",
            Self::ImplementationPlan => "implementation_plan",
            Self::RefactorPlan => "refactor_plan",
            Self::ValidationResult => "validation_result",
            Self::FailureReport => "failure_report",
            Self::ReconciliationPlan => "reconciliation_plan",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artifact lifecycle status
///
/// `Superseded` is a terminal tag applied to an old version when a new
/// version replaces it; `Locked` is terminal and only reachable from
/// `Approved` on lockable kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Draft,
    Approved,
    Locked,
    Superseded,
}

impl ArtifactStatus {
    /// Statuses reachable from `self` for an artifact of `kind`
    #[must_use]
    pub fn allowed_transitions(self, kind: ArtifactKind) -> Vec<ArtifactStatus> {
        use ArtifactStatus::*;
        match self {
            Draft => vec![Approved, Superseded],
            Approved if kind.lockable() => vec![Locked, Superseded],
            Approved => vec![Superseded],
            Locked => vec![],
            Superseded => vec![],
        }
    }

    /// Whether `self -> to` is a legal transition for `kind`
    #[inline]
    #[must_use]
    pub fn can_transition_to(self, to: ArtifactStatus, kind: ArtifactKind) -> bool {
        self.allowed_transitions(kind).contains(&to)
    }

    /// Whether a dependency in this status may be referenced
    #[inline]
    #[must_use]
    pub const fn is_referenceable(self) -> bool {
        matches!(self, Self::Approved | Self::Locked)
    }

    /// Stable lowercase identifier
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Approved => "approved",
            Self::Locked => "locked",
            Self::Superseded => "superseded",
        }
    }
}

impl std::fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable version of one artifact
///
/// # Invariants
/// - `payload_hash` is always the Blake3 hash of the canonical payload bytes
/// - never edited in place once the status leaves `Draft`; corrections are
///   new versions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Globally unique, immutable identifier
    pub id: ArtifactId,
    /// Artifact kind
    pub kind: ArtifactKind,
    /// Version of this record
    pub version: Version,
    /// Current lifecycle status
    pub status: ArtifactStatus,
    /// Producer of the draft
    pub created_by: Actor,
    /// Registration timestamp
    pub created_at: DateTime<Utc>,
    /// Ids this artifact depends on (all approved or locked at registration)
    pub depends_on: Vec<ArtifactId>,
    /// Declarative, kind-specific body
    pub payload: serde_json::Value,
    /// Hash of the canonical payload bytes, pinned at registration
    pub payload_hash: PayloadHash,
}

impl ArtifactRecord {
    /// Recompute the payload hash and compare against the pinned one
    ///
    /// Returns false if the stored payload no longer matches its hash
    /// (storage corruption or an illegal in-place edit).
    #[must_use]
    pub fn verify_payload(&self) -> bool {
        PayloadHash::of_payload(&self.payload)
            .map(|h| h == self.payload_hash)
            .unwrap_or(false)
    }

    /// Whether this version is still the live one
    #[inline]
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.status != ArtifactStatus::Superseded
    }
}

/// A candidate artifact submitted by an external producer
///
/// Untrusted until schema-validated at registration and human-approved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftArtifact {
    /// Artifact kind
    pub kind: ArtifactKind,
    /// Declarative payload
    pub payload: serde_json::Value,
    /// Dependencies, must all be approved or locked
    pub depends_on: Vec<ArtifactId>,
    /// Producer identity
    pub created_by: Actor,
}

impl DraftArtifact {
    /// Create a new draft with no dependencies
    #[inline]
    #[must_use]
    pub fn new(kind: ArtifactKind, payload: serde_json::Value) -> Self {
        Self {
            kind,
            payload,
            depends_on: Vec::new(),
            created_by: Actor::system("producer"),
        }
    }

    /// With a dependency
    #[inline]
    #[must_use]
    pub fn depends_on(mut self, id: ArtifactId) -> Self {
        self.depends_on.push(id);
        self
    }

    /// With an explicit producer
    #[inline]
    #[must_use]
    pub fn created_by(mut self, actor: Actor) -> Self {
        self.created_by = actor;
        self
    }
}

/// Query filter for `list`
///
/// All fields are conjunctive; `None` matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactFilter {
    /// Restrict to one kind
    pub kind: Option<ArtifactKind>,
    /// Restrict to one status
    pub status: Option<ArtifactStatus>,
    /// Created at or after
    pub since: Option<DateTime<Utc>>,
    /// Created at or before
    pub until: Option<DateTime<Utc>>,
}

impl ArtifactFilter {
    /// Match-everything filter
    #[inline]
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Restrict to a kind
    #[inline]
    #[must_use]
    pub fn kind(mut self, kind: ArtifactKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restrict to a status
    #[inline]
    #[must_use]
    pub fn status(mut self, status: ArtifactStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restrict to a time range (inclusive on both ends)
    #[inline]
    #[must_use]
    pub fn between(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self.until = Some(until);
        self
    }

    /// Whether a record matches this filter
    #[must_use]
    pub fn matches(&self, record: &ArtifactRecord) -> bool {
        if let Some(kind) = self.kind {
            if record.kind != kind {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.created_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if record.created_at > until {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn artifact_id_generation() {
        let id1 = ArtifactId::new();
        let id2 = ArtifactId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn version_is_monotonic() {
        let v = Version::initial();
        assert_eq!(v, Version(1));
        assert_eq!(v.next(), Version(2));
        assert!(v < v.next());
    }

    #[test]
    fn only_test_plans_lock() {
        assert!(ArtifactKind::TestPlan.lockable());
        for kind in ArtifactKind::ALL {
            if kind != ArtifactKind::TestPlan {
                assert!(!kind.lockable(), "{kind} must not be lockable");
            }
        }
    }

    #[test]
    fn draft_transitions() {
        let allowed = ArtifactStatus::Draft.allowed_transitions(ArtifactKind::TestPlan);
        assert_eq!(
            allowed,
            vec![ArtifactStatus::Approved, ArtifactStatus::Superseded]
        );
    }

    #[test]
    fn approved_locks_only_when_lockable() {
        assert!(ArtifactStatus::Approved
            .can_transition_to(ArtifactStatus::Locked, ArtifactKind::TestPlan));
        assert!(!ArtifactStatus::Approved
            .can_transition_to(ArtifactStatus::Locked, ArtifactKind::ImplementationPlan));
    }

    #[test]
    fn locked_is_terminal() {
        for kind in ArtifactKind::ALL {
            assert!(ArtifactStatus::Locked.allowed_transitions(kind).is_empty());
        }
    }

    #[test]
    fn no_transition_reverts_to_draft() {
        for kind in ArtifactKind::ALL {
            for from in [
                ArtifactStatus::Approved,
                ArtifactStatus::Locked,
                ArtifactStatus::Superseded,
            ] {
                assert!(!from.can_transition_to(ArtifactStatus::Draft, kind));
            }
        }
    }

    #[test]
    fn draft_is_not_referenceable() {
        assert!(!ArtifactStatus::Draft.is_referenceable());
        assert!(ArtifactStatus::Approved.is_referenceable());
        assert!(ArtifactStatus::Locked.is_referenceable());
        assert!(!ArtifactStatus::Superseded.is_referenceable());
    }

    #[test]
    fn record_payload_verification() {
        let payload = json!({ "covers": ["tests/foo_test.rs"] });
        let mut record = ArtifactRecord {
            id: ArtifactId::new(),
            kind: ArtifactKind::TestPlan,
            version: Version::initial(),
            status: ArtifactStatus::Draft,
            created_by: Actor::system("compiler"),
            created_at: Utc::now(),
            depends_on: vec![],
            payload: payload.clone(),
            payload_hash: PayloadHash::of_payload(&payload).unwrap(),
        };
        assert!(record.verify_payload());

        record.payload = json!({ "covers": ["tests/tampered.rs"] });
        assert!(!record.verify_payload());
    }

    #[test]
    fn filter_matches_kind_and_status() {
        let payload = json!({ "summary": "scaffold" });
        let record = ArtifactRecord {
            id: ArtifactId::new(),
            kind: ArtifactKind::ScaffoldPlan,
            version: Version::initial(),
            status: ArtifactStatus::Approved,
            created_by: Actor::human("reviewer"),
            created_at: Utc::now(),
            depends_on: vec![],
            payload: payload.clone(),
            payload_hash: PayloadHash::of_payload(&payload).unwrap(),
        };

        assert!(ArtifactFilter::any().matches(&record));
        assert!(ArtifactFilter::any()
            .kind(ArtifactKind::ScaffoldPlan)
            .status(ArtifactStatus::Approved)
            .matches(&record));
        assert!(!ArtifactFilter::any()
            .status(ArtifactStatus::Draft)
            .matches(&record));
    }

    proptest::proptest! {
        /// Transitions only ever move forward: whatever the kind, no status
        /// reachable from `from` ever precedes it in the lifecycle order.
        #[test]
        fn prop_transitions_never_move_backward(
            kind_idx in 0usize..ArtifactKind::ALL.len(),
            from in proptest::prelude::prop_oneof![
                proptest::prelude::Just(ArtifactStatus::Draft),
                proptest::prelude::Just(ArtifactStatus::Approved),
                proptest::prelude::Just(ArtifactStatus::Locked),
                proptest::prelude::Just(ArtifactStatus::Superseded),
            ],
        ) {
            fn rank(status: ArtifactStatus) -> u8 {
                match status {
                    ArtifactStatus::Draft => 0,
                    ArtifactStatus::Approved => 1,
                    ArtifactStatus::Locked | ArtifactStatus::Superseded => 2,
                }
            }
            let kind = ArtifactKind::ALL[kind_idx];
            for to in from.allowed_transitions(kind) {
                proptest::prop_assert!(rank(to) > rank(from));
                proptest::prop_assert!(from.can_transition_to(to, kind));
            }
        }
    }

    #[test]
    fn actor_roles() {
        let human = Actor::human("alice");
        let system = Actor::system("planner");
        assert!(human.is_human());
        assert!(!system.is_human());
        assert_eq!(human.to_string(), "human:alice");
        assert_eq!(system.id(), "planner");
    }
}

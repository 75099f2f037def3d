//! AGE Artifact Store & Lifecycle State Machine
//!
//! Canonical persistence and status transitions for every artifact. All
//! other governance components read and write through this crate.
//!
//! # Core Concepts
//!
//! - [`ArtifactStore`]: register / approve / lock / supersede / get / list
//! - [`StorageBackend`]: pluggable persistence with atomic multi-record
//!   commits and consistent-snapshot reads ([`MemoryBackend`] provided)
//! - [`audit`]: hash-chained, append-only operation log; a transition that
//!   cannot write its audit entry does not happen
//! - [`LeaseTable`]: single-writer-per-artifact-id discipline for mutating
//!   calls
//!
//! # Example
//!
//! ```rust,ignore
//! use age_store::{ArtifactStore, MemoryBackend};
//! use age_artifact::{Actor, ArtifactKind, DraftArtifact};
//! use serde_json::json;
//!
//! let store = ArtifactStore::new(MemoryBackend::default());
//! let draft = DraftArtifact::new(
//!     ArtifactKind::TestPlan,
//!     json!({ "covers": ["tests/foo_test.rs"] }),
//! );
//! let id = store.register(draft)?;
//! store.approve(id, Actor::human("alice"), "looks right")?;
//! store.lock(id, Actor::human("alice"))?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod audit;
mod backend;
mod lease;
mod store;

pub use backend::{MemoryBackend, StorageBackend, StoreState, WriteBatch, WriteOp};
pub use lease::{LeaseGuard, LeaseTable};
pub use store::{ArtifactStore, StoreSnapshot};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! AGE Drift Detection & Reconciliation Engine
//!
//! Per-commit checks catch acute violations; this crate catches slow
//! entropy. `scan` compares the governed code root against the approved
//! plan set and scores every divergence as a [`DriftSignal`]; `reconcile`
//! sums the scores and, at or above the policy threshold, registers a
//! ReconciliationPlan draft and freezes new change-plan registration until
//! a human approves the plan and a re-scan comes back clean.
//!
//! Reconciliation never auto-edits artifacts or code. Plans before action,
//! here as everywhere else.
//!
//! # Example
//!
//! ```rust,ignore
//! use age_drift::{reconcile, scan, DriftPolicy};
//!
//! let policy = DriftPolicy::default();
//! let signals = scan(repo_root, &store.snapshot(), &policy);
//! if let Some(plan) = reconcile(&store, signals, &policy)? {
//!     println!("drift freeze engaged, review {}", plan.id);
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod policy;
mod reconcile;
mod scan;

pub use policy::DriftPolicy;
pub use reconcile::reconcile;
pub use scan::scan;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

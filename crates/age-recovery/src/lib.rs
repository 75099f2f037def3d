//! AGE Failure Taxonomy & Recovery Dispatcher
//!
//! Failures are first-class artifacts, never log lines. Reporting one
//! persists a FailureReport artifact through the store; recovering one
//! selects exactly one playbook from the failure's category and returns a
//! directive for the caller to act on. The dispatcher itself edits
//! nothing: halting, rolling back, and replanning are the caller's moves.
//!
//! Recovery is idempotent: the first `recover` call for a failure id
//! decides the outcome, and every later call returns that same outcome.
//!
//! # Example
//!
//! ```rust,ignore
//! use age_recovery::{RecoveryDispatcher, RecoveryOutcome};
//! use age_artifact::{FailureCategory, FailurePhase, FailureReport};
//!
//! let dispatcher = RecoveryDispatcher::new(store);
//! let report = FailureReport::new(
//!     FailurePhase::Verification,
//!     FailureCategory::Verification,
//!     "2 of 14 cases red",
//! )
//! .with_unit("auth");
//! let failure = dispatcher.report(report)?;
//! let outcome = dispatcher.recover(failure)?;
//! assert!(matches!(outcome, RecoveryOutcome::ReplanUnit { .. }));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod dispatcher;

pub use dispatcher::{playbook_for, RecoveryDispatcher, RecoveryOutcome};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! AGE CI Invariant Enforcement Pipeline
//!
//! A staged, read-only verification pass over the artifact store and a
//! reported repository changeset. Four ordered stages, each producing its
//! own sub-result; any blocking failure halts the pipeline unless the
//! caller asks for diagnostic (continue-on-failure) mode.
//!
//! No stage auto-repairs anything. The aggregated result is persisted back
//! through the store as a ValidationResult artifact.
//!
//! # Example
//!
//! ```rust,ignore
//! use age_pipeline::{InvariantPipeline, PipelineMode, RepositorySnapshot};
//!
//! let pipeline = InvariantPipeline::new();
//! let repo = RepositorySnapshot::new(vec!["src/auth.rs".into()]);
//! let result = pipeline.validate(&store, &repo, PipelineMode::FailFast)?;
//! assert!(result.passed());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod pipeline;
mod snapshot;
mod stages;

pub use pipeline::{InvariantPipeline, PipelineMode, PipelineResult};
pub use snapshot::{AppliedDiff, RepositorySnapshot};
pub use stages::{StageKind, StageOutcome, StageReport, StageViolation};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Engine configuration

use age_drift::DriftPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default lease hold-time ceiling, milliseconds
const DEFAULT_LEASE_TTL_MS: u64 = 10_000;

/// Configuration for one governed repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Governed code root for drift scans
    pub code_root: PathBuf,
    /// Lease hold-time ceiling for mutating store calls, milliseconds
    pub lease_ttl_ms: u64,
    /// Drift scoring and aggregation policy
    pub drift: DriftPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            code_root: PathBuf::from("."),
            lease_ttl_ms: DEFAULT_LEASE_TTL_MS,
            drift: DriftPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Config for a governed code root, defaults elsewhere
    #[inline]
    #[must_use]
    pub fn new(code_root: impl Into<PathBuf>) -> Self {
        Self {
            code_root: code_root.into(),
            ..Self::default()
        }
    }

    /// With an explicit lease ceiling
    #[inline]
    #[must_use]
    pub fn with_lease_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.lease_ttl_ms = ttl_ms;
        self
    }

    /// With an explicit drift policy
    #[inline]
    #[must_use]
    pub fn with_drift_policy(mut self, policy: DriftPolicy) -> Self {
        self.drift = policy;
        self
    }

    /// Lease ceiling as a duration
    #[inline]
    #[must_use]
    pub fn lease_ttl(&self) -> Duration {
        Duration::from_millis(self.lease_ttl_ms)
    }
}

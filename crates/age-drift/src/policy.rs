//! Drift scoring policy
//!
//! Severity weights, the hotspot definition, and the reconciliation
//! threshold are operator knobs, not constants. The defaults are tuned so
//! that two independent signals of any kind trip the threshold while a
//! single orphan does not.

use serde::{Deserialize, Serialize};

/// Tunable drift scoring and aggregation policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftPolicy {
    /// Severity assigned to a file with no covering approved plan
    pub orphan_code_severity: u32,
    /// Severity assigned to an approved plan naming a missing path
    pub orphan_plan_severity: u32,
    /// Severity assigned to a hotspot file
    pub hotspot_severity: u32,
    /// A file becomes a hotspot when at least this many approved change
    /// plans inside the rolling window name it
    pub hotspot_plans: usize,
    /// Rolling window, in days, for hotspot counting
    pub hotspot_window_days: i64,
    /// Summed severity at or above which `reconcile` emits a plan and
    /// freezes new change-plan registration
    pub reconcile_threshold: u32,
}

impl Default for DriftPolicy {
    fn default() -> Self {
        Self {
            orphan_code_severity: 2,
            orphan_plan_severity: 2,
            hotspot_severity: 3,
            hotspot_plans: 3,
            hotspot_window_days: 14,
            reconcile_threshold: 4,
        }
    }
}

impl DriftPolicy {
    /// With an explicit reconciliation threshold
    #[inline]
    #[must_use]
    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.reconcile_threshold = threshold;
        self
    }

    /// With an explicit hotspot definition
    #[inline]
    #[must_use]
    pub fn with_hotspot(mut self, plans: usize, window_days: i64) -> Self {
        self.hotspot_plans = plans;
        self.hotspot_window_days = window_days;
        self
    }

    /// With explicit orphan severities
    #[inline]
    #[must_use]
    pub fn with_orphan_severities(mut self, code: u32, plan: u32) -> Self {
        self.orphan_code_severity = code;
        self.orphan_plan_severity = plan;
        self
    }

    /// Hotspot window as a chrono duration
    #[inline]
    #[must_use]
    pub fn hotspot_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.hotspot_window_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_trip_on_two_signals() {
        let policy = DriftPolicy::default();
        assert!(policy.orphan_code_severity * 2 >= policy.reconcile_threshold);
        assert!(policy.orphan_code_severity < policy.reconcile_threshold);
    }

    #[test]
    fn builders_override_defaults() {
        let policy = DriftPolicy::default()
            .with_threshold(10)
            .with_hotspot(5, 30)
            .with_orphan_severities(1, 4);
        assert_eq!(policy.reconcile_threshold, 10);
        assert_eq!(policy.hotspot_plans, 5);
        assert_eq!(policy.hotspot_window(), chrono::Duration::days(30));
        assert_eq!(policy.orphan_plan_severity, 4);
    }
}

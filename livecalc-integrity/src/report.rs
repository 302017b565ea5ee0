//! Integrity check results and aggregate reports.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// The outcome of recomputing one bus resource's checksum, either at a
/// consumer's `IDLE -> READY` transition or a final audit pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityCheckResult {
    pub bus_resource: String,
    pub expected: u32,
    pub actual: u32,
    pub valid: bool,
    /// The node that produced (and sealed) the resource.
    pub culprit: String,
    /// The node whose `IDLE -> READY` transition triggered this check.
    pub consumer: String,
    /// First byte offset at which the current payload diverges from the
    /// payload present when it was sealed, computed by a linear scan only
    /// when `valid` is false and a seal-time snapshot was available.
    pub diff_offset: Option<usize>,
    /// RFC 3339 timestamp of when the check ran.
    pub timestamp: String,
}

/// Aggregates every check run during a pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub results: Vec<IntegrityCheckResult>,
    pub all_valid: bool,
    pub total_checked: usize,
    pub total_failed: usize,
    pub culprit_node_ids: HashSet<String>,
}

impl IntegrityReport {
    pub fn from_results(results: Vec<IntegrityCheckResult>) -> Self {
        let total_checked = results.len();
        let total_failed = results.iter().filter(|r| !r.valid).count();
        let culprit_node_ids = results.iter().filter(|r| !r.valid).map(|r| r.culprit.clone()).collect();
        Self {
            all_valid: total_failed == 0,
            total_checked,
            total_failed,
            culprit_node_ids,
            results,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.all_valid
    }

    pub fn failures(&self) -> impl Iterator<Item = &IntegrityCheckResult> {
        self.results.iter().filter(|r| !r.valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(bus_resource: &str, culprit: &str, valid: bool) -> IntegrityCheckResult {
        IntegrityCheckResult {
            bus_resource: bus_resource.to_string(),
            expected: 1,
            actual: if valid { 1 } else { 2 },
            valid,
            culprit: culprit.to_string(),
            consumer: "B".to_string(),
            diff_offset: if valid { None } else { Some(16) },
            timestamp: "2026-07-27T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn aggregates_failures_and_culprits() {
        let report = IntegrityReport::from_results(vec![result("bus://x", "A", false), result("bus://y", "B", true)]);
        assert!(!report.all_valid);
        assert_eq!(report.total_checked, 2);
        assert_eq!(report.total_failed, 1);
        assert_eq!(report.culprit_node_ids, HashSet::from(["A".to_string()]));
    }

    #[test]
    fn empty_report_is_valid() {
        let report = IntegrityReport::from_results(vec![]);
        assert!(report.all_valid);
        assert_eq!(report.total_checked, 0);
    }
}

//! The aggregated outcome of one [`crate::Orchestrator::run`] invocation:
//! identity and timestamps, the topological order actually executed,
//! per-node timings, the accumulated integrity report, and the snapshots
//! captured at run start and run end.

use livecalc_integrity::IntegrityReport;
use serde::{Deserialize, Serialize};

use crate::orchestrator::Snapshot;
use crate::timing::RunTiming;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    /// RFC 3339 timestamp of when the run began.
    pub started_at: String,
    /// RFC 3339 timestamp of when the run finished. Always set by
    /// [`crate::Orchestrator::run`]; optional only so a host could model an
    /// in-flight run with the same type.
    pub ended_at: Option<String>,
    pub topo_order: Vec<String>,
    pub timing: RunTiming,
    pub integrity: IntegrityReport,
    pub snapshots: Vec<Snapshot>,
}

impl RunRecord {
    pub fn succeeded(&self) -> bool {
        self.integrity.all_valid
    }
}

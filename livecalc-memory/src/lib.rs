//! Shared-memory layout (C1) and atomic node-state signaling (C2) for a
//! single pipeline run.

mod error;
mod layout;
mod region;
mod signal;

pub use error::MemoryError;
pub use layout::{compute_layout, MemoryLayout, ResourceSlot, ALIGNMENT, CACHE_LINE, HEADER_SIZE};
pub use region::SharedRegion;
pub use signal::{NodeState, SignalTable};

use livecalc_validator::BusResourceDescriptor;

/// Owns a [`SharedRegion`] and its [`SignalTable`] for a single run,
/// wiring the memory offset manager and the atomic signal manager together
/// behind one handle so the orchestrator doesn't juggle both separately.
pub struct PipelineMemory {
    region: SharedRegion,
    signals: SignalTable,
}

impl PipelineMemory {
    pub fn allocate(
        node_ids: Vec<String>,
        resources: &[BusResourceDescriptor],
        enable_integrity: bool,
    ) -> Self {
        let region = SharedRegion::allocate(node_ids.len(), resources, enable_integrity);
        let signals = SignalTable::new(node_ids);
        Self { region, signals }
    }

    pub fn region(&self) -> &SharedRegion {
        &self.region
    }

    pub fn signals(&self) -> &SignalTable {
        &self.signals
    }

    /// Zero all resource slabs and reset every node to `Idle`, for
    /// `zero_memory_between_runs`. Only safe to call from the single
    /// coordinator thread before a run's worker threads start.
    pub fn reset_for_rerun(&self) {
        self.region.zero_resources();
        self.signals.reset();
    }
}

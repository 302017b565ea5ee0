//! Pipeline execution core: the DAG executor (C7), timing profiler (C8),
//! and breakpoint controller (C9) that sit on top of [`livecalc_memory`]'s
//! shared region and [`livecalc_adapter`]'s node runners.

mod breakpoint;
mod error;
mod events;
mod orchestrator;
mod run_record;
mod semaphore;
mod timing;

pub use breakpoint::{BreakpointController, PausedState};
pub use error::OrchestratorError;
pub use events::{event_channel, OrchestratorEvent};
pub use orchestrator::{Orchestrator, Snapshot};
pub use run_record::RunRecord;
pub use timing::{build_run_timing, compute_critical_path, NodeTiming, RunTiming, TimingComparison, TimingHistory};

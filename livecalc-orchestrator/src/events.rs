//! Orchestrator event stream: a plain `mpsc` channel rather than a
//! callback/singleton sidecar, so a host can observe a run from any thread
//! without registering into the orchestrator's own lifetime.

use std::sync::mpsc;

#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    NodeStarted { node: String },
    NodeCompleted { node: String, duration_ms: f64 },
    NodeFailed { node: String, reason: String },
    NodeSkipped { node: String, reason: String },
    Paused { node: String },
    Resumed,
    IntegrityFailure { resource: String },
    RunCompleted { duration_ms: f64 },
    RunAborted,
}

pub fn event_channel() -> (mpsc::Sender<OrchestratorEvent>, mpsc::Receiver<OrchestratorEvent>) {
    mpsc::channel()
}

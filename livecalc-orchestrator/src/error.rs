use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("pipeline failed validation: {0:?}")]
    Validation(Vec<livecalc_validator::ConfigError>),
    #[error("memory error: {0}")]
    Memory(#[from] livecalc_memory::MemoryError),
    #[error("integrity error: {0}")]
    Integrity(#[from] livecalc_integrity::IntegrityError),
    #[error("adapter error: {0}")]
    Adapter(#[from] livecalc_adapter::AdapterError),
    #[error("node {node:?} timed out after {timeout_ms}ms")]
    NodeTimedOut { node: String, timeout_ms: u64 },
    #[error("node {node:?} failed: {reason}")]
    NodeFailed { node: String, reason: String },
    #[error("no runner registered for node {0:?}")]
    MissingRunner(String),
    #[error("unknown breakpoint target {0:?}")]
    UnknownBreakpoint(String),
    #[error("breakpoint state persistence error: {0}")]
    StatePersistence(String),
    #[error("run aborted")]
    Aborted,
    #[error("integrity check failed: resource {resource:?} consumed by {consumer:?} does not match its sealed checksum")]
    IntegrityCheckFailed { resource: String, consumer: String },
}

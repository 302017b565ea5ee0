use thiserror::Error;

use crate::signal::NodeState;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("unknown bus resource {0:?}")]
    UnknownResource(String),
    #[error("unknown node {0:?}")]
    UnknownNode(String),
    #[error("illegal transition for node {node:?}: {from:?} -> {to:?}")]
    IllegalTransition { node: String, from: NodeState, to: NodeState },
    #[error("resource {resource:?} slice request of {requested} bytes exceeds slot size {available}")]
    SliceOutOfBounds {
        resource: String,
        requested: usize,
        available: usize,
    },
    #[error("wait for node {node:?} timed out after {timeout_ms}ms")]
    WaitTimedOut { node: String, timeout_ms: u64 },
    #[error("allocation of {requested} bytes failed")]
    AllocationFailed { requested: usize },
    #[error("resource {0:?} requested as both an input and output, or twice as an output, in the same handoff")]
    AliasedResourceAccess(String),
}

use thiserror::Error;

/// Validation failures, grouped the way spec.md §4.4 orders its rule classes:
/// the validator stops at the first class that produces any of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("pipeline has no nodes")]
    EmptyPipeline,

    #[error("node id {0:?} does not match ^[A-Za-z][A-Za-z0-9_-]*$")]
    InvalidNodeId(String),

    #[error("node {node:?} has invalid engine reference {engine:?}")]
    InvalidEngineRef { node: String, engine: String },

    #[error("node {0:?} declares no outputs")]
    NoOutputs(String),

    #[error("node {node:?} output {output:?} does not match ^bus://[A-Za-z][A-Za-z0-9_/-]*$")]
    InvalidOutputRef { node: String, output: String },

    #[error("node {node:?} input {input:?} is neither a bus:// reference nor a reserved input")]
    InvalidInputRef { node: String, input: String },

    #[error("duplicate node id {0:?}")]
    DuplicateNodeId(String),

    #[error("bus resource {0:?} is produced by more than one node")]
    DuplicateResource(String),

    #[error("input {input:?} of node {node:?} has no producer")]
    OrphanInput { node: String, input: String },

    #[error("circular dependency among nodes {cycle_nodes:?}")]
    CircularDependency { cycle_nodes: Vec<String> },

    #[error("invalid size spec {spec:?} for {key:?} on node {node:?}: {reason}")]
    InvalidSizeSpec {
        node: String,
        key: String,
        spec: String,
        reason: String,
    },
}

/// Non-fatal observations surfaced alongside a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// A bus resource is produced but has no consumer.
    UnusedOutput { node: String, resource: String },
    /// A node has no consumers at all for any of its outputs.
    SinkNode { node: String },
}

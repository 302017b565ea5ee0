//! The pipeline configuration schema consumed by the orchestration core.
//!
//! This mirrors the JSON document the host's config loader hands the core:
//! the core only reads the `pipeline` object and ignores any sibling
//! extension fields the host may have attached.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level document handed to the core. Only `pipeline` is consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub nodes: Vec<NodeConfig>,
    #[serde(default)]
    pub debug: DebugConfig,
    #[serde(default)]
    pub error_handling: ErrorHandlingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub id: String,
    pub engine: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugConfig {
    #[serde(default)]
    pub breakpoints: Vec<String>,
    #[serde(default)]
    pub enable_integrity_checks: bool,
    #[serde(default)]
    pub halt_on_integrity_failure: bool,
    #[serde(default)]
    pub zero_memory_between_runs: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorHandlingConfig {
    #[serde(default)]
    pub continue_on_error: bool,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for ErrorHandlingConfig {
    fn default() -> Self {
        Self {
            continue_on_error: false,
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Reserved host-supplied inputs that never become bus resources.
pub const RESERVED_INPUTS: [&str; 3] = ["$policies", "$assumptions", "$scenarios"];

impl NodeConfig {
    pub fn is_reserved_input(input: &str) -> bool {
        RESERVED_INPUTS.contains(&input)
    }
}

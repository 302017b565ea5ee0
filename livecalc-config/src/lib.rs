//! Pipeline configuration schema and host daemon settings for LiveCalc.

mod config;
mod env;
pub mod schema;

pub use config::{load_daemon_settings, load_pipeline_config, parse_pipeline_config, DaemonSettings};
pub use env::apply_env_overrides;
pub use schema::{ConfigDocument, DebugConfig, ErrorHandlingConfig, NodeConfig, PipelineConfig};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid value for {0}: {1}")]
    InvalidEnvValue(String, String),
}

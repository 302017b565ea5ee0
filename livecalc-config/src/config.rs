//! Daemon settings (host-level knobs, not part of the pipeline JSON schema)
//! and pipeline configuration loading.

use crate::env::apply_env_overrides;
use crate::schema::ConfigDocument;
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings owned by the hosting tool, not by the pipeline document itself:
/// worker pool sizing and the two defaults a pipeline's `debug` block may omit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    pub worker_threads: usize,
    pub default_timeout_ms: u64,
    pub zero_memory_between_runs: bool,
    pub enable_integrity_checks: bool,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus_capped(),
            default_timeout_ms: 30_000,
            zero_memory_between_runs: false,
            enable_integrity_checks: true,
        }
    }
}

fn num_cpus_capped() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8))
        .unwrap_or(1)
}

/// Load daemon settings from an optional TOML file, then apply env overrides.
pub fn load_daemon_settings(path: Option<&Path>) -> Result<DaemonSettings, ConfigError> {
    let mut settings = match path {
        Some(p) if p.exists() => {
            let text = std::fs::read_to_string(p).map_err(|e| ConfigError::Io(e.to_string()))?;
            toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?
        }
        _ => DaemonSettings::default(),
    };
    apply_env_overrides(&mut settings)?;
    Ok(settings)
}

/// Parse a pipeline configuration document from a JSON string.
pub fn parse_pipeline_config(json: &str) -> Result<ConfigDocument, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Load a pipeline configuration document from a JSON file.
pub fn load_pipeline_config(path: &Path) -> Result<ConfigDocument, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
    parse_pipeline_config(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_cap_worker_threads_at_eight() {
        let settings = DaemonSettings::default();
        assert!(settings.worker_threads >= 1 && settings.worker_threads <= 8);
    }

    #[test]
    fn missing_settings_file_falls_back_to_defaults() {
        let settings = load_daemon_settings(Some(Path::new("/nonexistent/livecalc.toml"))).unwrap();
        assert_eq!(settings.default_timeout_ms, 30_000);
    }

    #[test]
    fn parses_minimal_pipeline_document() {
        let json = r#"{
            "pipeline": {
                "nodes": [
                    {"id": "A", "engine": "native://a", "outputs": ["bus://x"]}
                ]
            }
        }"#;
        let doc = parse_pipeline_config(json).unwrap();
        assert_eq!(doc.pipeline.nodes.len(), 1);
        assert_eq!(doc.pipeline.nodes[0].id, "A");
    }
}

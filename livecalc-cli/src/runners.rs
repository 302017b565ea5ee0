//! Resolve each node's `engine` reference to a loaded [`NodeRunner`].
//!
//! Native modules are loaded from `<modules_dir>/<name>.wasm`; script
//! modules from `<modules_dir>/<name>.lua`.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use livecalc_adapter::{EngineKind, NativeRunner, NodeRunner, ScriptRunner};
use livecalc_config::PipelineConfig;

pub fn build_runners(config: &PipelineConfig, modules_dir: &Path) -> Result<HashMap<String, Box<dyn NodeRunner>>> {
    let mut runners: HashMap<String, Box<dyn NodeRunner>> = HashMap::new();
    for node in &config.nodes {
        let (kind, name) = EngineKind::from_engine_ref(&node.engine)
            .with_context(|| format!("node {:?} has an unrecognized engine reference {:?}", node.id, node.engine))?;
        let runner: Box<dyn NodeRunner> = match kind {
            EngineKind::Native => {
                let path = modules_dir.join(format!("{name}.wasm"));
                Box::new(
                    NativeRunner::load(&path)
                        .with_context(|| format!("loading native module {:?} for node {:?}", path, node.id))?,
                )
            }
            EngineKind::Script => {
                let path = modules_dir.join(format!("{name}.lua"));
                let source = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading script module {:?} for node {:?}", path, node.id))?;
                Box::new(
                    ScriptRunner::load(&source)
                        .with_context(|| format!("loading script module {:?} for node {:?}", path, node.id))?,
                )
            }
        };
        runners.insert(node.id.clone(), runner);
    }
    Ok(runners)
}

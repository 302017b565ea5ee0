use std::path::Path;

use crate::exit_code;

pub fn run(config_path: &Path) -> i32 {
    let doc = match livecalc_config::load_pipeline_config(config_path) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("error: {e}");
            return exit_code::VALIDATION_ERROR;
        }
    };

    match livecalc_validator::validate(&doc.pipeline) {
        Ok(validated) => {
            println!("ok: {} nodes, {} resources", validated.topo_order.len(), validated.resources.len());
            for warning in &validated.warnings {
                println!("warning: {warning:?}");
            }
            exit_code::SUCCESS
        }
        Err(errors) => {
            for error in &errors {
                eprintln!("error: {error}");
            }
            exit_code::VALIDATION_ERROR
        }
    }
}

//! `livecalc run`: validate, execute, and (optionally) interactively debug
//! one pipeline run, then persist a snapshot and its resource catalog so
//! `export-csv` can inspect it afterward.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use livecalc_orchestrator::{event_channel, Orchestrator, OrchestratorError, OrchestratorEvent};

use crate::exit_code;
use crate::runners::build_runners;

pub struct RunArgs<'a> {
    pub config_path: &'a Path,
    pub daemon_settings_path: Option<&'a Path>,
    pub modules_dir: &'a Path,
    pub breakpoint_db_path: &'a Path,
    pub snapshot_dir: &'a Path,
    pub policies_path: Option<&'a Path>,
    pub assumptions_path: Option<&'a Path>,
    pub scenarios_path: Option<&'a Path>,
    pub interactive: bool,
}

fn read_host_input(path: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match path {
        Some(p) => Ok(std::fs::read(p)?),
        None => Ok(Vec::new()),
    }
}

pub fn run(args: RunArgs) -> i32 {
    match run_inner(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_code::RUNTIME_ERROR
        }
    }
}

fn run_inner(args: RunArgs) -> anyhow::Result<i32> {
    let doc = livecalc_config::load_pipeline_config(args.config_path)?;
    let daemon = livecalc_config::load_daemon_settings(args.daemon_settings_path)?;
    let runners = build_runners(&doc.pipeline, args.modules_dir)?;

    let mut host_inputs = HashMap::new();
    host_inputs.insert("$policies".to_string(), read_host_input(args.policies_path)?);
    host_inputs.insert("$assumptions".to_string(), read_host_input(args.assumptions_path)?);
    host_inputs.insert("$scenarios".to_string(), read_host_input(args.scenarios_path)?);

    let (tx, rx) = event_channel();
    let orchestrator = match Orchestrator::build(
        &doc.pipeline,
        &daemon,
        runners,
        args.breakpoint_db_path,
        host_inputs,
        tx,
    ) {
        Ok(o) => Arc::new(o),
        Err(OrchestratorError::Validation(errors)) => {
            for error in &errors {
                eprintln!("error: {error}");
            }
            return Ok(exit_code::VALIDATION_ERROR);
        }
        Err(e) => return Err(e.into()),
    };

    std::thread::spawn(move || {
        for event in rx {
            tracing::info!(?event, "orchestrator event");
        }
    });

    let run_id = uuid::Uuid::new_v4().to_string();

    let run_handle = {
        let orchestrator = orchestrator.clone();
        let run_id = run_id.clone();
        std::thread::spawn(move || orchestrator.run(&run_id))
    };

    if args.interactive {
        run_debug_console(&orchestrator, &run_id);
    }

    let result = run_handle.join().expect("orchestrator run thread panicked");

    let record = match result {
        Ok(record) => record,
        Err(OrchestratorError::Validation(errors)) => {
            for error in &errors {
                eprintln!("error: {error}");
            }
            return Ok(exit_code::VALIDATION_ERROR);
        }
        Err(e @ (OrchestratorError::NodeTimedOut { .. } | OrchestratorError::Aborted)) => {
            eprintln!("error: {e}");
            return Ok(exit_code::CANCELLED_OR_TIMED_OUT);
        }
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(exit_code::RUNTIME_ERROR);
        }
    };

    println!("{}", serde_json::to_string_pretty(&record)?);

    for failure in record.integrity.failures() {
        eprintln!(
            "integrity failure: resource {:?} producer {:?} consumer {:?} expected={:08x} actual={:08x}{}",
            failure.bus_resource,
            failure.culprit,
            failure.consumer,
            failure.expected,
            failure.actual,
            failure.diff_offset.map(|o| format!(" diff_offset={o}")).unwrap_or_default(),
        );
    }

    orchestrator.snapshot(&run_id)?;
    persist_metadata_sidecar(args.snapshot_dir, &run_id, orchestrator.resources())?;

    if !record.integrity.all_valid {
        return Ok(exit_code::INTEGRITY_FAILURE);
    }
    Ok(exit_code::SUCCESS)
}

fn persist_metadata_sidecar(
    snapshot_dir: &Path,
    run_id: &str,
    resources: &[livecalc_validator::BusResourceDescriptor],
) -> anyhow::Result<()> {
    std::fs::create_dir_all(snapshot_dir)?;
    let path = snapshot_dir.join(format!("{run_id}.meta.json"));
    let payload = serde_json::to_vec_pretty(resources)?;
    std::fs::write(path, payload)?;
    Ok(())
}

/// A stdin-driven stand-in for the cross-process pause/resume/step/abort
/// protocol: there is no daemon or IPC layer here, so debugging a run means
/// typing commands at the terminal that ran it.
fn run_debug_console(orchestrator: &Arc<Orchestrator>, run_id: &str) {
    println!(
        "interactive debug console: pause <node> | toggle <node> | clear | resume | step | abort | snapshot | state <node> | quit"
    );
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let mut parts = line.trim().splitn(2, char::is_whitespace);
        match (parts.next(), parts.next()) {
            (Some("pause"), Some(node)) => orchestrator.pause_at(node.trim()),
            (Some("toggle"), Some(node)) => {
                let enabled = orchestrator.toggle_breakpoint(node.trim());
                println!("breakpoint {node:?} now {}", if enabled { "enabled" } else { "disabled" });
            }
            (Some("clear"), _) => orchestrator.clear_breakpoints(),
            (Some("resume"), _) => orchestrator.resume(),
            (Some("step"), _) => orchestrator.step(),
            (Some("abort"), _) => {
                orchestrator.abort();
                break;
            }
            (Some("snapshot"), _) => match orchestrator.snapshot(run_id) {
                Ok(_) => println!("snapshot persisted for run {run_id}"),
                Err(e) => println!("snapshot failed: {e}"),
            },
            (Some("state"), Some(node)) => match orchestrator.paused_state(node.trim()) {
                Some(state) => println!(
                    "paused at {:?} ({} resources captured, hit count {})",
                    state.paused_node,
                    state.bus_data_snapshot.len(),
                    orchestrator.breakpoint_hit_count(node.trim())
                ),
                None => println!("{node:?} is not currently paused"),
            },
            (Some("quit"), _) => break,
            (Some(other), _) if !other.is_empty() => println!("unrecognized command: {other:?}"),
            _ => {}
        }
    }
}

//! Breakpoint controller (C9): gates node execution on a configured or
//! dynamically-added breakpoint list, supports pause/resume/step, tracks
//! how many times each breakpoint has fired, and persists run snapshots
//! to `sled` so they survive process restarts (grounded on the same
//! `sled`-backed state-store pattern used for pipeline state elsewhere in
//! this codebase).

use std::collections::HashMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::{Condvar, Mutex};

use crate::error::OrchestratorError;

#[derive(Debug, Clone, Copy, Default)]
struct BreakpointEntry {
    enabled: bool,
    hit_count: u32,
}

/// Bus state captured at the moment a node's breakpoint fired, so a paused
/// debug session can inspect exactly what execution was about to hand off.
#[derive(Debug, Clone, Default)]
pub struct PausedState {
    pub paused_node: String,
    pub bus_data_snapshot: HashMap<String, Vec<u8>>,
    pub checksums: HashMap<String, String>,
    pub paused_at_epoch_ms: u64,
}

fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

pub struct BreakpointController {
    db: sled::Db,
    breakpoints: Mutex<HashMap<String, BreakpointEntry>>,
    paused: Mutex<bool>,
    step_remaining: Mutex<u32>,
    condvar: Condvar,
    paused_states: Mutex<HashMap<String, PausedState>>,
}

impl BreakpointController {
    pub fn open(db_path: &Path, initial_breakpoints: &[String]) -> Result<Self, OrchestratorError> {
        let db = sled::open(db_path).map_err(|e| OrchestratorError::StatePersistence(e.to_string()))?;
        let breakpoints = initial_breakpoints
            .iter()
            .map(|id| (id.clone(), BreakpointEntry { enabled: true, hit_count: 0 }))
            .collect();
        Ok(Self {
            db,
            breakpoints: Mutex::new(breakpoints),
            paused: Mutex::new(false),
            step_remaining: Mutex::new(0),
            condvar: Condvar::new(),
            paused_states: Mutex::new(HashMap::new()),
        })
    }

    pub fn add_breakpoint(&self, node: &str) {
        self.breakpoints.lock().entry(node.to_string()).or_default().enabled = true;
    }

    pub fn remove_breakpoint(&self, node: &str) {
        self.breakpoints.lock().remove(node);
    }

    pub fn is_breakpoint(&self, node: &str) -> bool {
        self.breakpoints.lock().contains_key(node)
    }

    /// Whether `node` is a currently-enabled breakpoint (the gating check
    /// [`gate`] actually uses, as opposed to [`is_breakpoint`]'s mere
    /// presence check — a disabled breakpoint stays configured but inert).
    pub fn should_pause_at(&self, node: &str) -> bool {
        self.breakpoints.lock().get(node).map(|e| e.enabled).unwrap_or(false)
    }

    /// Flip a breakpoint's enabled state, registering it first if absent.
    /// Returns the new enabled state.
    pub fn toggle(&self, node: &str) -> bool {
        let mut map = self.breakpoints.lock();
        let entry = map.entry(node.to_string()).or_default();
        entry.enabled = !entry.enabled;
        entry.enabled
    }

    pub fn set_enabled(&self, node: &str, enabled: bool) {
        self.breakpoints.lock().entry(node.to_string()).or_default().enabled = enabled;
    }

    pub fn clear_all(&self) {
        self.breakpoints.lock().clear();
    }

    pub fn hit_count(&self, node: &str) -> u32 {
        self.breakpoints.lock().get(node).map(|e| e.hit_count).unwrap_or(0)
    }

    /// Replace the full breakpoint set with `ids`, all enabled — the
    /// counterpart to a pipeline config's `debug.breakpoints` list.
    pub fn import_from_config(&self, ids: &[String]) {
        let mut map = self.breakpoints.lock();
        map.clear();
        for id in ids {
            map.insert(id.clone(), BreakpointEntry { enabled: true, hit_count: 0 });
        }
    }

    /// Enabled breakpoint node ids, sorted for a deterministic config round-trip.
    pub fn export_to_config(&self) -> Vec<String> {
        let mut ids: Vec<String> =
            self.breakpoints.lock().iter().filter(|(_, e)| e.enabled).map(|(id, _)| id.clone()).collect();
        ids.sort();
        ids
    }

    pub fn resume(&self) {
        *self.paused.lock() = false;
        self.condvar.notify_all();
    }

    /// Allow exactly one currently-blocked (or next-to-block) node through,
    /// then re-pause the pipeline.
    pub fn step(&self) {
        *self.step_remaining.lock() += 1;
        self.condvar.notify_all();
    }

    /// Currently paused node, if any gate call is blocked right now.
    pub fn paused_state(&self, node: &str) -> Option<PausedState> {
        self.paused_states.lock().get(node).cloned()
    }

    pub fn all_paused_states(&self) -> Vec<PausedState> {
        self.paused_states.lock().values().cloned().collect()
    }

    /// Called by a worker before running `node`. Blocks if the pipeline is
    /// paused, or marks it paused if `node` is an enabled breakpoint.
    /// `capture` is invoked only when a pause is about to begin, lazily
    /// producing the bus snapshot and checksums to attach to the paused state.
    pub fn gate<F>(&self, node: &str, capture: F) -> bool
    where
        F: FnOnce() -> (HashMap<String, Vec<u8>>, HashMap<String, String>),
    {
        let should_pause = self.should_pause_at(node);
        let mut paused = self.paused.lock();
        if should_pause {
            *paused = true;
            self.breakpoints.lock().entry(node.to_string()).or_default().hit_count += 1;
            let (bus_data_snapshot, checksums) = capture();
            self.paused_states.lock().insert(
                node.to_string(),
                PausedState { paused_node: node.to_string(), bus_data_snapshot, checksums, paused_at_epoch_ms: epoch_ms() },
            );
        }
        let mut hit = false;
        while *paused {
            hit = true;
            let mut step_remaining = self.step_remaining.lock();
            if *step_remaining > 0 {
                *step_remaining -= 1;
                break;
            }
            drop(step_remaining);
            self.condvar.wait(&mut paused);
        }
        if hit {
            self.paused_states.lock().remove(node);
        }
        hit
    }

    pub fn persist_snapshot(&self, run_id: &str, node: &str, payload: &[u8]) -> Result<(), OrchestratorError> {
        let key = format!("snapshot:{run_id}:{node}");
        self.db
            .insert(key.as_bytes(), payload)
            .map_err(|e| OrchestratorError::StatePersistence(e.to_string()))?;
        self.db.flush().map_err(|e| OrchestratorError::StatePersistence(e.to_string()))?;
        Ok(())
    }

    pub fn load_snapshot(&self, run_id: &str, node: &str) -> Result<Option<Vec<u8>>, OrchestratorError> {
        let key = format!("snapshot:{run_id}:{node}");
        self.db
            .get(key.as_bytes())
            .map(|opt| opt.map(|v| v.to_vec()))
            .map_err(|e| OrchestratorError::StatePersistence(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn no_capture() -> (HashMap<String, Vec<u8>>, HashMap<String, String>) {
        (HashMap::new(), HashMap::new())
    }

    #[test]
    fn non_breakpoint_node_never_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let controller = BreakpointController::open(dir.path(), &[]).unwrap();
        assert!(!controller.gate("any_node", no_capture));
    }

    #[test]
    fn breakpoint_blocks_until_resumed() {
        let dir = tempfile::tempdir().unwrap();
        let controller = Arc::new(BreakpointController::open(dir.path(), &["a".to_string()]).unwrap());
        let gate_controller = controller.clone();
        let handle = std::thread::spawn(move || gate_controller.gate("a", no_capture));
        std::thread::sleep(std::time::Duration::from_millis(20));
        controller.resume();
        assert!(handle.join().unwrap());
        assert_eq!(controller.hit_count("a"), 1);
    }

    #[test]
    fn paused_state_is_available_while_blocked_and_cleared_after() {
        let dir = tempfile::tempdir().unwrap();
        let controller = Arc::new(BreakpointController::open(dir.path(), &["a".to_string()]).unwrap());
        let gate_controller = controller.clone();
        let handle = std::thread::spawn(move || {
            gate_controller.gate("a", || {
                let mut bus = HashMap::new();
                bus.insert("prices".to_string(), vec![1, 2, 3]);
                (bus, HashMap::new())
            })
        });
        std::thread::sleep(std::time::Duration::from_millis(20));
        let state = controller.paused_state("a").expect("should be paused");
        assert_eq!(state.paused_node, "a");
        assert_eq!(state.bus_data_snapshot.get("prices"), Some(&vec![1, 2, 3]));
        controller.resume();
        handle.join().unwrap();
        assert!(controller.paused_state("a").is_none());
    }

    #[test]
    fn toggle_enables_then_disables() {
        let dir = tempfile::tempdir().unwrap();
        let controller = BreakpointController::open(dir.path(), &[]).unwrap();
        assert!(controller.toggle("a"));
        assert!(controller.should_pause_at("a"));
        assert!(!controller.toggle("a"));
        assert!(!controller.should_pause_at("a"));
    }

    #[test]
    fn import_and_export_round_trip_enabled_ids() {
        let dir = tempfile::tempdir().unwrap();
        let controller = BreakpointController::open(dir.path(), &[]).unwrap();
        controller.import_from_config(&["b".to_string(), "a".to_string()]);
        assert_eq!(controller.export_to_config(), vec!["a".to_string(), "b".to_string()]);
        controller.clear_all();
        assert!(controller.export_to_config().is_empty());
    }

    #[test]
    fn snapshot_round_trips_through_sled() {
        let dir = tempfile::tempdir().unwrap();
        let controller = BreakpointController::open(dir.path(), &[]).unwrap();
        controller.persist_snapshot("run-1", "node-a", b"payload").unwrap();
        assert_eq!(
            controller.load_snapshot("run-1", "node-a").unwrap(),
            Some(b"payload".to_vec())
        );
    }
}

//! The DAG executor (C7): validates a pipeline, lays out shared memory,
//! and drives nodes through their engine adapters level by level, bounded
//! to a fixed worker pool. Pauses, single-steps, and snapshots are
//! delegated to [`BreakpointController`]; phase timings feed
//! [`TimingHistory`].

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Instant;

use parking_lot::Mutex;

use livecalc_adapter::NodeRunner;
use livecalc_config::{DaemonSettings, PipelineConfig};
use livecalc_integrity::{IntegrityCheckResult, IntegrityError, IntegrityReport};
use livecalc_memory::{NodeState, PipelineMemory};
use livecalc_validator::BusResourceDescriptor;

use crate::breakpoint::{BreakpointController, PausedState};
use crate::error::OrchestratorError;
use crate::events::OrchestratorEvent;
use crate::run_record::RunRecord;
use crate::semaphore::Semaphore;
use crate::timing::{build_run_timing, NodeTiming, TimingHistory};

/// A point-in-time capture of a run's memory state, taken at a breakpoint,
/// at run start/end, or on explicit request.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    pub node_states: HashMap<String, NodeState>,
    pub resources: HashMap<String, Vec<u8>>,
}

pub struct Orchestrator {
    topo_order: Vec<String>,
    resources: Vec<BusResourceDescriptor>,
    edges: Vec<(String, String)>,
    successors: HashMap<String, Vec<String>>,
    node_inputs: HashMap<String, Vec<String>>,
    // Not behind a mutex: `PipelineMemory`'s status cells are individually
    // atomic and its resource region hands out disjoint slabs (see
    // `SharedRegion::resource_views`), so concurrently executing same-level
    // nodes (the only nodes that ever run at once, see `levels`) never
    // contend for the same byte range. A mutex here would force every
    // adapter invocation onto one thread at a time, defeating the whole
    // point of the worker pool.
    memory: PipelineMemory,
    runners: HashMap<String, Mutex<Box<dyn NodeRunner>>>,
    breakpoints: BreakpointController,
    host_inputs: HashMap<String, Vec<u8>>,
    timeout_ms: u64,
    continue_on_error: bool,
    worker_threads: usize,
    zero_memory_between_runs: bool,
    enable_integrity: bool,
    halt_on_integrity_failure: bool,
    timing_history: Mutex<TimingHistory>,
    // `mpsc::Sender` is `Send` but not `Sync`; wrapping it is what lets
    // `Orchestrator` itself be `Sync` so worker threads can share `&self`.
    events: Mutex<mpsc::Sender<OrchestratorEvent>>,
    cancel: AtomicBool,
    /// Nodes marked unreachable after an upstream failure when the run
    /// doesn't halt on error; these are skipped rather than executed.
    unreachable: Mutex<HashSet<String>>,
    /// Results of every consumer-side integrity recompute performed this
    /// run, accumulated into the run's `IntegrityReport`.
    integrity_results: Mutex<Vec<IntegrityCheckResult>>,
    /// Byte-for-byte payload captured the moment each resource was last
    /// sealed, so a mismatch can be localized with `diff_offset`.
    seal_snapshots: Mutex<HashMap<String, Vec<u8>>>,
}

impl Orchestrator {
    pub fn build(
        config: &PipelineConfig,
        daemon: &DaemonSettings,
        runners: HashMap<String, Box<dyn NodeRunner>>,
        breakpoint_db_path: &Path,
        host_inputs: HashMap<String, Vec<u8>>,
        events: mpsc::Sender<OrchestratorEvent>,
    ) -> Result<Self, OrchestratorError> {
        let validated = livecalc_validator::validate(config).map_err(OrchestratorError::Validation)?;
        let enable_integrity = config.debug.enable_integrity_checks && daemon.enable_integrity_checks;
        let memory = PipelineMemory::allocate(validated.topo_order.clone(), &validated.resources, enable_integrity);
        let breakpoints = BreakpointController::open(breakpoint_db_path, &config.debug.breakpoints)?;

        let node_inputs = config.nodes.iter().map(|n| (n.id.clone(), n.inputs.clone())).collect();

        let edges: Vec<(String, String)> = validated
            .resources
            .iter()
            .flat_map(|r| r.consumers.iter().map(move |c| (r.producer.clone(), c.clone())))
            .collect();

        let runners = runners.into_iter().map(|(k, v)| (k, Mutex::new(v))).collect();

        let mut successors: HashMap<String, Vec<String>> = HashMap::new();
        for (from, to) in &edges {
            successors.entry(from.clone()).or_default().push(to.clone());
        }

        Ok(Self {
            topo_order: validated.topo_order,
            resources: validated.resources,
            edges,
            successors,
            node_inputs,
            memory,
            runners,
            breakpoints,
            host_inputs,
            timeout_ms: config.error_handling.timeout_ms,
            continue_on_error: config.error_handling.continue_on_error,
            worker_threads: daemon.worker_threads.max(1),
            zero_memory_between_runs: config.debug.zero_memory_between_runs || daemon.zero_memory_between_runs,
            enable_integrity,
            halt_on_integrity_failure: config.debug.halt_on_integrity_failure,
            timing_history: Mutex::new(TimingHistory::new()),
            events: Mutex::new(events),
            cancel: AtomicBool::new(false),
            unreachable: Mutex::new(HashSet::new()),
            integrity_results: Mutex::new(Vec::new()),
            seal_snapshots: Mutex::new(HashMap::new()),
        })
    }

    /// Every node reachable by following producer→consumer edges forward
    /// from `start`, not including `start` itself.
    fn descendants_of(&self, start: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack: Vec<&str> = self.successors.get(start).map(|v| v.iter().map(|s| s.as_str()).collect()).unwrap_or_default();
        while let Some(node) = stack.pop() {
            if seen.insert(node.to_string()) {
                if let Some(next) = self.successors.get(node) {
                    stack.extend(next.iter().map(|s| s.as_str()));
                }
            }
        }
        seen
    }

    fn emit(&self, event: OrchestratorEvent) {
        self.events.lock().send(event).ok();
    }

    /// Group nodes into batches that can safely execute in parallel, using
    /// longest-path-from-source depth. This is a conservative schedule: a
    /// node waits for every node at a shallower depth to finish, not just
    /// its direct producers, trading a little concurrency for a scheduler
    /// simple enough to reason about without a dynamic dependency tracker.
    fn levels(&self) -> Vec<Vec<String>> {
        let mut depth: HashMap<&str, usize> = HashMap::new();
        let mut predecessors_of: HashMap<&str, Vec<&str>> = HashMap::new();
        for (from, to) in &self.edges {
            predecessors_of.entry(to.as_str()).or_default().push(from.as_str());
        }
        for node in &self.topo_order {
            let preds = predecessors_of.get(node.as_str()).cloned().unwrap_or_default();
            let d = preds.iter().map(|p| depth.get(p).copied().unwrap_or(0) + 1).max().unwrap_or(0);
            depth.insert(node.as_str(), d);
        }
        let max_depth = depth.values().copied().max().unwrap_or(0);
        let mut levels = vec![Vec::new(); max_depth + 1];
        for node in &self.topo_order {
            levels[depth[node.as_str()]].push(node.clone());
        }
        levels
    }

    pub fn run(&self, run_id: &str) -> Result<RunRecord, OrchestratorError> {
        if self.zero_memory_between_runs {
            self.memory.reset_for_rerun();
        }
        self.cancel.store(false, Ordering::Release);
        self.unreachable.lock().clear();
        self.integrity_results.lock().clear();
        self.seal_snapshots.lock().clear();

        let started_at = chrono::Utc::now().to_rfc3339();
        let start_snapshot = self.capture_full_snapshot()?;
        let run_start = Instant::now();
        let node_timings: Mutex<Vec<NodeTiming>> = Mutex::new(Vec::new());
        let first_error: Mutex<Option<OrchestratorError>> = Mutex::new(None);
        let semaphore = Semaphore::new(self.worker_threads);

        for level in self.levels() {
            if self.cancel.load(Ordering::Acquire) {
                break;
            }
            std::thread::scope(|scope| {
                for node_id in &level {
                    semaphore.acquire();
                    let node_timings = &node_timings;
                    let first_error = &first_error;
                    let semaphore = &semaphore;
                    scope.spawn(move || {
                        if self.unreachable.lock().contains(node_id) {
                            semaphore.release();
                            self.emit(OrchestratorEvent::NodeSkipped {
                                node: node_id.clone(),
                                reason: "unreachable after upstream failure".to_string(),
                            });
                            return;
                        }
                        let result = self.execute_node(run_id, node_id);
                        semaphore.release();
                        match result {
                            Ok(timing) => node_timings.lock().push(timing),
                            Err(e) => {
                                self.emit(OrchestratorEvent::NodeFailed {
                                    node: node_id.clone(),
                                    reason: e.to_string(),
                                });
                                if self.continue_on_error {
                                    self.mark_descendants_unreachable(node_id);
                                } else {
                                    self.cancel.store(true, Ordering::Release);
                                    let mut fe = first_error.lock();
                                    if fe.is_none() {
                                        *fe = Some(e);
                                    }
                                }
                            }
                        }
                    });
                }
            });
        }

        if let Some(e) = first_error.into_inner() {
            self.emit(OrchestratorEvent::RunAborted);
            return Err(e);
        }

        let run_timing = build_run_timing(node_timings.into_inner(), &self.topo_order, &self.edges);
        self.timing_history.lock().push(run_timing.clone());
        self.emit(OrchestratorEvent::RunCompleted {
            duration_ms: run_start.elapsed().as_secs_f64() * 1000.0,
        });

        let end_snapshot = self.capture_full_snapshot()?;
        let integrity = IntegrityReport::from_results(self.integrity_results.lock().clone());

        Ok(RunRecord {
            run_id: run_id.to_string(),
            started_at,
            ended_at: Some(chrono::Utc::now().to_rfc3339()),
            topo_order: self.topo_order.clone(),
            timing: run_timing,
            integrity,
            snapshots: vec![start_snapshot, end_snapshot],
        })
    }

    /// Mark every not-yet-run descendant of a failed node `ERROR` so a
    /// non-halting run doesn't attempt them against stale or absent inputs.
    fn mark_descendants_unreachable(&self, failed_node: &str) {
        let descendants = self.descendants_of(failed_node);
        if descendants.is_empty() {
            return;
        }
        let mut unreachable = self.unreachable.lock();
        for node in descendants {
            if matches!(self.memory.signals().read(&node), Ok(NodeState::Idle) | Ok(NodeState::Ready)) {
                if let Err(e) = self.memory.signals().force(&node, NodeState::Error) {
                    tracing::warn!(node = %node, error = %e, "failed to mark unreachable node as errored");
                }
            }
            unreachable.insert(node);
        }
    }

    fn execute_node(&self, run_id: &str, node_id: &str) -> Result<NodeTiming, OrchestratorError> {
        let wait_start = Instant::now();
        if self.breakpoints.should_pause_at(node_id) {
            self.emit(OrchestratorEvent::Paused { node: node_id.to_string() });
        }
        let was_paused = self.breakpoints.gate(node_id, || self.capture_bus_snapshot());
        if was_paused {
            self.emit(OrchestratorEvent::Resumed);
        }
        if self.cancel.load(Ordering::Acquire) {
            return Err(OrchestratorError::Aborted);
        }
        let wait_ms = wait_start.elapsed().as_secs_f64() * 1000.0;

        self.emit(OrchestratorEvent::NodeStarted { node: node_id.to_string() });

        let inputs = self.node_inputs.get(node_id).cloned().unwrap_or_default();

        self.memory.signals().signal(node_id, NodeState::Ready)?;
        self.check_input_integrity(node_id, &inputs)?;
        self.memory.signals().signal(node_id, NodeState::Running)?;

        let bus_input_names: Vec<&str> = inputs.iter().filter_map(|i| i.strip_prefix("bus://")).collect();
        let mut host_input_bytes: Vec<(&str, Vec<u8>)> = Vec::new();
        for input in &inputs {
            if input.strip_prefix("bus://").is_none() {
                host_input_bytes.push((input.as_str(), self.host_inputs.get(input).cloned().unwrap_or_default()));
            }
        }
        let output_names: Vec<&str> =
            self.resources.iter().filter(|r| r.producer == node_id).map(|r| r.name.as_str()).collect();

        let init_start = Instant::now();
        let runner = self.runners.get(node_id).ok_or_else(|| OrchestratorError::MissingRunner(node_id.to_string()))?;
        let mut runner = runner.lock();
        runner.init()?;
        let init_ms = init_start.elapsed().as_secs_f64() * 1000.0;

        // The adapter reads and writes directly into the shared region's
        // resource slabs (`SharedRegion::resource_views`) rather than a
        // heap-staged copy: this is the zero-copy handoff the atomic state
        // signaling coordinates access around.
        let execute_start = Instant::now();
        {
            let (bus_views, mut output_views) = self.memory.region().resource_views(&bus_input_names, &output_names)?;
            let mut input_refs: Vec<(&str, &[u8])> = bus_input_names.iter().copied().zip(bus_views).collect();
            input_refs.extend(host_input_bytes.iter().map(|(name, bytes)| (*name, bytes.as_slice())));
            let mut output_refs: Vec<(&str, &mut [u8])> =
                output_names.iter().copied().zip(output_views.iter_mut().map(|b| &mut **b)).collect();
            runner.run_chunk(&input_refs, &mut output_refs)?;
        }
        let execute_ms = execute_start.elapsed().as_secs_f64() * 1000.0;
        if execute_ms > self.timeout_ms as f64 {
            return Err(OrchestratorError::NodeTimedOut { node: node_id.to_string(), timeout_ms: self.timeout_ms });
        }

        let handoff_start = Instant::now();
        if self.enable_integrity {
            for name in &output_names {
                if let Err(e) = livecalc_integrity::seal_resource(self.memory.region(), name) {
                    self.emit(OrchestratorEvent::IntegrityFailure { resource: name.to_string() });
                    return Err(e.into());
                }
                let bytes = self.memory.region().resource_slice(name)?.to_vec();
                self.seal_snapshots.lock().insert(name.to_string(), bytes);
            }
        }
        self.memory.signals().signal(node_id, NodeState::Done)?;
        let _ = run_id;
        let handoff_ms = handoff_start.elapsed().as_secs_f64() * 1000.0;

        self.emit(OrchestratorEvent::NodeCompleted {
            node: node_id.to_string(),
            duration_ms: wait_ms + init_ms + execute_ms + handoff_ms,
        });

        Ok(NodeTiming { node: node_id.to_string(), wait_ms, init_ms, execute_ms, handoff_ms })
    }

    /// At the moment `node_id` transitions `IDLE -> READY`, recompute and
    /// compare the checksum of every bus resource it consumes against the
    /// checksum its producer sealed at `RUNNING -> DONE`. A mismatch is
    /// recorded into the run's `IntegrityReport` regardless of
    /// `halt_on_integrity_failure`; that flag only controls whether the
    /// consumer is forced into `ERROR` instead of proceeding.
    fn check_input_integrity(&self, node_id: &str, inputs: &[String]) -> Result<(), OrchestratorError> {
        if !self.enable_integrity {
            return Ok(());
        }
        for input in inputs {
            let Some(resource_name) = input.strip_prefix("bus://") else { continue };
            let Some(resource) = self.resources.iter().find(|r| r.name == resource_name) else { continue };
            let seal_snapshot = self.seal_snapshots.lock().get(resource_name).cloned();
            let result = livecalc_integrity::check_resource(
                self.memory.region(),
                resource_name,
                &resource.producer,
                node_id,
                seal_snapshot.as_deref(),
            );
            let result = match result {
                Ok(result) => result,
                Err(IntegrityError::NoTrailer(_)) => continue,
                Err(e) => return Err(e.into()),
            };
            let valid = result.valid;
            self.integrity_results.lock().push(result);
            if !valid {
                self.emit(OrchestratorEvent::IntegrityFailure { resource: resource_name.to_string() });
                if self.halt_on_integrity_failure {
                    // Forced, not signaled: the consumer is sitting in
                    // `READY`, which the transition table never allows to
                    // go straight to `ERROR` on its own.
                    self.memory.signals().force(node_id, NodeState::Error)?;
                    return Err(OrchestratorError::IntegrityCheckFailed { resource: resource_name.to_string(), consumer: node_id.to_string() });
                }
            }
        }
        Ok(())
    }

    /// Current bus bytes and (if integrity checks are on) checksums for
    /// every resource, used to seed a breakpoint's paused state and the
    /// CLI's manual `snapshot` command.
    fn capture_bus_snapshot(&self) -> (HashMap<String, Vec<u8>>, HashMap<String, String>) {
        let mut bus_data_snapshot = HashMap::with_capacity(self.resources.len());
        let mut checksums = HashMap::new();
        for resource in &self.resources {
            if let Ok(bytes) = self.memory.region().resource_slice(&resource.name) {
                bus_data_snapshot.insert(resource.name.clone(), bytes.to_vec());
            }
            if self.enable_integrity {
                if let Ok(Some((checksum, _epoch))) = self.memory.region().integrity_trailer(&resource.name) {
                    checksums.insert(resource.name.clone(), format!("{checksum:08x}"));
                }
            }
        }
        (bus_data_snapshot, checksums)
    }

    /// A full point-in-time `Snapshot` (every node's state plus every
    /// resource's current bytes), used for the `RunRecord`'s start/end
    /// captures. Unlike [`Self::snapshot`], this does not persist anything
    /// to the breakpoint store.
    fn capture_full_snapshot(&self) -> Result<Snapshot, OrchestratorError> {
        let mut node_states = HashMap::with_capacity(self.topo_order.len());
        for node in &self.topo_order {
            node_states.insert(node.clone(), self.memory.signals().read(node)?);
        }
        let mut resources = HashMap::with_capacity(self.resources.len());
        for resource in &self.resources {
            resources.insert(resource.name.clone(), self.memory.region().resource_slice(&resource.name)?.to_vec());
        }
        Ok(Snapshot { node_states, resources })
    }

    pub fn pause_at(&self, node: &str) {
        self.breakpoints.add_breakpoint(node);
    }

    pub fn toggle_breakpoint(&self, node: &str) -> bool {
        self.breakpoints.toggle(node)
    }

    pub fn set_breakpoint_enabled(&self, node: &str, enabled: bool) {
        self.breakpoints.set_enabled(node, enabled);
    }

    pub fn clear_breakpoints(&self) {
        self.breakpoints.clear_all();
    }

    pub fn import_breakpoints(&self, ids: &[String]) {
        self.breakpoints.import_from_config(ids);
    }

    pub fn export_breakpoints(&self) -> Vec<String> {
        self.breakpoints.export_to_config()
    }

    pub fn breakpoint_hit_count(&self, node: &str) -> u32 {
        self.breakpoints.hit_count(node)
    }

    /// Bus snapshot, checksums, and pause timestamp for a node currently
    /// blocked at a breakpoint, or `None` if it isn't paused.
    pub fn paused_state(&self, node: &str) -> Option<PausedState> {
        self.breakpoints.paused_state(node)
    }

    pub fn all_paused_states(&self) -> Vec<PausedState> {
        self.breakpoints.all_paused_states()
    }

    pub fn resume(&self) {
        self.breakpoints.resume();
    }

    pub fn step(&self) {
        self.breakpoints.step();
    }

    pub fn abort(&self) {
        self.cancel.store(true, Ordering::Release);
        self.breakpoints.resume();
    }

    pub fn snapshot(&self, run_id: &str) -> Result<Snapshot, OrchestratorError> {
        let mut node_states = HashMap::new();
        for node in &self.topo_order {
            node_states.insert(node.clone(), self.memory.signals().read(node)?);
        }
        let mut resources = HashMap::new();
        for resource in &self.resources {
            let bytes = self.memory.region().resource_slice(&resource.name)?.to_vec();
            self.breakpoints.persist_snapshot(run_id, &resource.name, &bytes)?;
            resources.insert(resource.name.clone(), bytes);
        }
        Ok(Snapshot { node_states, resources })
    }

    pub fn timing_history(&self) -> &Mutex<TimingHistory> {
        &self.timing_history
    }

    pub fn topo_order(&self) -> &[String] {
        &self.topo_order
    }

    pub fn resources(&self) -> &[BusResourceDescriptor] {
        &self.resources
    }

    pub fn memory(&self) -> &PipelineMemory {
        &self.memory
    }

    pub fn enable_integrity(&self) -> bool {
        self.enable_integrity
    }
}

/// Drain running state on drop: any node still `Running` when the
/// orchestrator is torn down (process exit, panic unwind, early return) is
/// marked `Error` rather than left stuck, and every engine instance gets a
/// chance to release its resources, so a reader of the shared region after
/// an aborted process never observes a node frozen mid-execution.
impl Drop for Orchestrator {
    fn drop(&mut self) {
        for node in &self.topo_order {
            if matches!(self.memory.signals().read(node), Ok(NodeState::Running)) {
                if let Err(e) = self.memory.signals().signal(node, NodeState::Error) {
                    tracing::warn!(node = %node, error = %e, "failed to mark interrupted node as errored on drop");
                }
            }
        }

        for (node, runner) in &self.runners {
            if let Err(e) = runner.lock().dispose() {
                tracing::warn!(node = %node, error = %e, "engine dispose failed during orchestrator teardown");
            }
        }
    }
}

//! Atomic node state signaling: each node owns one cache-line
//! status cell, transitioned by CAS as the orchestrator drives execution.

use crate::error::MemoryError;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// A node's execution state, stored as a `u32` in its status cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u32)]
pub enum NodeState {
    Idle = 0,
    Ready = 1,
    Running = 2,
    Done = 3,
    Error = 4,
    Paused = 5,
}

impl NodeState {
    fn from_u32(v: u32) -> Self {
        match v {
            0 => NodeState::Idle,
            1 => NodeState::Ready,
            2 => NodeState::Running,
            3 => NodeState::Done,
            4 => NodeState::Error,
            5 => NodeState::Paused,
            other => unreachable!("invalid node state encoding {other}"),
        }
    }

    /// Allowed transitions: `IDLE->READY->RUNNING->{DONE,ERROR,PAUSED}`,
    /// `PAUSED->{RUNNING,ERROR}`, `DONE->IDLE` (re-run). Any other write is
    /// rejected.
    fn allows(self, to: NodeState) -> bool {
        use NodeState::*;
        matches!(
            (self, to),
            (Idle, Ready)
                | (Ready, Running)
                | (Running, Done)
                | (Running, Error)
                | (Running, Paused)
                | (Paused, Running)
                | (Paused, Error)
                | (Done, Idle)
        )
    }
}

/// One node's status cell, padded to a full cache line so CAS traffic from
/// one worker thread never invalidates a neighbor node's cell.
#[repr(C, align(64))]
struct StatusCell {
    state: AtomicU32,
    _padding: [u8; 60],
}

impl StatusCell {
    fn new() -> Self {
        Self {
            state: AtomicU32::new(NodeState::Idle as u32),
            _padding: [0; 60],
        }
    }
}

/// The full per-node status table for a pipeline run.
pub struct SignalTable {
    node_ids: Vec<String>,
    cells: Vec<StatusCell>,
}

impl SignalTable {
    pub fn new(node_ids: Vec<String>) -> Self {
        let cells = node_ids.iter().map(|_| StatusCell::new()).collect();
        Self { node_ids, cells }
    }

    fn index_of(&self, node: &str) -> Result<usize, MemoryError> {
        self.node_ids
            .iter()
            .position(|n| n == node)
            .ok_or_else(|| MemoryError::UnknownNode(node.to_string()))
    }

    /// CAS `node` into `new_state`, validating the transition table, and
    /// return the state it held just before the change. Release ordering on
    /// success so writes to the node's output resources made before this
    /// call are visible to any thread that observes the new state with
    /// acquire ordering. Fails without retrying if the transition isn't in
    /// the allowed set; a concurrent writer racing to a *different* allowed
    /// target retries against the freshly observed state.
    pub fn signal(&self, node: &str, new_state: NodeState) -> Result<NodeState, MemoryError> {
        let idx = self.index_of(node)?;
        let cell = &self.cells[idx].state;
        let mut current = cell.load(Ordering::Acquire);
        loop {
            let current_state = NodeState::from_u32(current);
            if !current_state.allows(new_state) {
                return Err(MemoryError::IllegalTransition {
                    node: node.to_string(),
                    from: current_state,
                    to: new_state,
                });
            }
            match cell.compare_exchange_weak(current, new_state as u32, Ordering::Release, Ordering::Acquire) {
                Ok(_) => return Ok(current_state),
                Err(actual) => current = actual,
            }
        }
    }

    pub fn read(&self, node: &str) -> Result<NodeState, MemoryError> {
        let idx = self.index_of(node)?;
        Ok(NodeState::from_u32(self.cells[idx].state.load(Ordering::Acquire)))
    }

    /// Spin-then-yield wait for `node` to reach `state`, bounded by `timeout`.
    pub fn wait_until(&self, node: &str, state: NodeState, timeout: Duration) -> Result<(), MemoryError> {
        let idx = self.index_of(node)?;
        let deadline = Instant::now() + timeout;
        let mut spins = 0u32;
        loop {
            let current = self.cells[idx].state.load(Ordering::Acquire);
            if current == state as u32 {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(MemoryError::WaitTimedOut {
                    node: node.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            spins += 1;
            if spins < 1000 {
                std::hint::spin_loop();
            } else {
                std::thread::yield_now();
            }
        }
    }

    pub fn node_ids(&self) -> &[String] {
        &self.node_ids
    }

    /// Unconditionally overwrite `node`'s state, bypassing the transition
    /// table. This is an administrative override for cases that aren't a
    /// node's own execution-driven transition — e.g. forcing a not-yet-run
    /// descendant of a failed node straight to `Error` so a non-halting run
    /// doesn't attempt it. A node's own lifecycle should always go through
    /// [`Self::signal`].
    pub fn force(&self, node: &str, state: NodeState) -> Result<(), MemoryError> {
        let idx = self.index_of(node)?;
        self.cells[idx].state.store(state as u32, Ordering::Release);
        Ok(())
    }

    /// Reset every cell to `Idle`. Used between runs.
    pub fn reset(&self) {
        for cell in &self.cells {
            cell.state.store(NodeState::Idle as u32, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_and_read_round_trip() {
        let table = SignalTable::new(vec!["a".to_string(), "b".to_string()]);
        table.signal("a", NodeState::Ready).unwrap();
        table.signal("a", NodeState::Running).unwrap();
        assert_eq!(table.read("a").unwrap(), NodeState::Running);
        assert_eq!(table.read("b").unwrap(), NodeState::Idle);
    }

    #[test]
    fn signal_returns_the_previous_state() {
        let table = SignalTable::new(vec!["a".to_string()]);
        assert_eq!(table.signal("a", NodeState::Ready).unwrap(), NodeState::Idle);
        assert_eq!(table.signal("a", NodeState::Running).unwrap(), NodeState::Ready);
    }

    #[test]
    fn illegal_transition_is_rejected() {
        let table = SignalTable::new(vec!["a".to_string()]);
        let err = table.signal("a", NodeState::Running).unwrap_err();
        assert!(matches!(err, MemoryError::IllegalTransition { from: NodeState::Idle, to: NodeState::Running, .. }));
        assert_eq!(table.read("a").unwrap(), NodeState::Idle);
    }

    #[test]
    fn done_may_transition_back_to_idle_for_a_rerun() {
        let table = SignalTable::new(vec!["a".to_string()]);
        table.signal("a", NodeState::Ready).unwrap();
        table.signal("a", NodeState::Running).unwrap();
        table.signal("a", NodeState::Done).unwrap();
        table.signal("a", NodeState::Idle).unwrap();
        assert_eq!(table.read("a").unwrap(), NodeState::Idle);
    }

    #[test]
    fn unknown_node_errors() {
        let table = SignalTable::new(vec!["a".to_string()]);
        assert!(table.signal("missing", NodeState::Done).is_err());
    }

    #[test]
    fn wait_until_returns_once_state_reached() {
        let table = std::sync::Arc::new(SignalTable::new(vec!["a".to_string()]));
        let waiter = table.clone();
        let handle = std::thread::spawn(move || waiter.wait_until("a", NodeState::Done, Duration::from_secs(1)));
        std::thread::sleep(Duration::from_millis(10));
        table.signal("a", NodeState::Ready).unwrap();
        table.signal("a", NodeState::Running).unwrap();
        table.signal("a", NodeState::Done).unwrap();
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn wait_until_times_out() {
        let table = SignalTable::new(vec!["a".to_string()]);
        let result = table.wait_until("a", NodeState::Done, Duration::from_millis(20));
        assert!(matches!(result, Err(MemoryError::WaitTimedOut { .. })));
    }

    #[test]
    fn reset_restores_idle() {
        let table = SignalTable::new(vec!["a".to_string()]);
        table.signal("a", NodeState::Ready).unwrap();
        table.signal("a", NodeState::Running).unwrap();
        table.signal("a", NodeState::Error).unwrap();
        table.reset();
        assert_eq!(table.read("a").unwrap(), NodeState::Idle);
    }
}

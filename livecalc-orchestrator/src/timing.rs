//! Timing profiler (C8): per-node phase timings, critical path, a
//! parallel-execution heuristic, and a bounded history of recent runs.

use std::collections::{HashMap, VecDeque};

/// One node's timing breakdown for a single run, in milliseconds.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NodeTiming {
    pub node: String,
    /// Time spent blocked on a breakpoint or waiting for dependencies.
    pub wait_ms: f64,
    /// Engine `init` cost (first call only; zero on subsequent runs in the
    /// same process if the adapter caches its engine instance).
    pub init_ms: f64,
    pub execute_ms: f64,
    /// Integrity sealing plus signaling cost after `execute`.
    pub handoff_ms: f64,
}

impl NodeTiming {
    pub fn total_ms(&self) -> f64 {
        self.wait_ms + self.init_ms + self.execute_ms + self.handoff_ms
    }
}

/// Full timing record for one pipeline run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunTiming {
    pub node_timings: Vec<NodeTiming>,
    pub critical_path: Vec<String>,
    pub critical_path_ms: f64,
    /// Heuristic estimate of how much the run benefited from parallel
    /// execution: `1 - critical_path_ms / sum(total_ms)`. Near zero means
    /// the pipeline is effectively a single chain; higher means more of
    /// its node time ran concurrently.
    pub parallel_speedup_estimate: f64,
}

/// Longest-path (by total node time) through the DAG, given producer/
/// consumer edges derived from the bus resource catalog.
pub fn compute_critical_path(
    node_timings: &[NodeTiming],
    topo_order: &[String],
    edges: &[(String, String)],
) -> (Vec<String>, f64) {
    let totals: HashMap<&str, f64> = node_timings.iter().map(|t| (t.node.as_str(), t.total_ms())).collect();
    let mut predecessors_of: HashMap<&str, Vec<&str>> = HashMap::new();
    for (from, to) in edges {
        predecessors_of.entry(to.as_str()).or_default().push(from.as_str());
    }

    let mut finish: HashMap<&str, f64> = HashMap::new();
    let mut back: HashMap<&str, Option<&str>> = HashMap::new();

    for node in topo_order {
        let own = *totals.get(node.as_str()).unwrap_or(&0.0);
        let preds = predecessors_of.get(node.as_str()).cloned().unwrap_or_default();
        let mut best_pred = None;
        let mut best_finish = 0.0;
        for pred in preds {
            let pred_finish = *finish.get(pred).unwrap_or(&0.0);
            if pred_finish >= best_finish {
                best_finish = pred_finish;
                best_pred = Some(pred);
            }
        }
        finish.insert(node.as_str(), own + best_finish);
        back.insert(node.as_str(), best_pred);
    }

    let end = finish
        .iter()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(&node, _)| node);

    let Some(mut cursor) = end else {
        return (Vec::new(), 0.0);
    };
    let total_ms = finish[cursor];
    let mut path = vec![cursor.to_string()];
    while let Some(Some(pred)) = back.get(cursor) {
        path.push(pred.to_string());
        cursor = pred;
    }
    path.reverse();
    (path, total_ms)
}

pub fn build_run_timing(node_timings: Vec<NodeTiming>, topo_order: &[String], edges: &[(String, String)]) -> RunTiming {
    let (critical_path, critical_path_ms) = compute_critical_path(&node_timings, topo_order, edges);
    let sequential_total: f64 = node_timings.iter().map(|t| t.total_ms()).sum();
    let parallel_speedup_estimate = if sequential_total > 0.0 {
        (1.0 - critical_path_ms / sequential_total).max(0.0)
    } else {
        0.0
    };
    RunTiming {
        node_timings,
        critical_path,
        critical_path_ms,
        parallel_speedup_estimate,
    }
}

/// Per-node delta between two runs, most useful for spotting regressions
/// after a node's implementation changes.
#[derive(Debug, Clone)]
pub struct TimingComparison {
    pub node_deltas_ms: HashMap<String, f64>,
    pub critical_path_delta_ms: f64,
}

const HISTORY_CAPACITY: usize = 10;

/// Ring buffer of the last 10 runs' timings.
#[derive(Debug, Default)]
pub struct TimingHistory {
    runs: VecDeque<RunTiming>,
}

impl TimingHistory {
    pub fn new() -> Self {
        Self { runs: VecDeque::with_capacity(HISTORY_CAPACITY) }
    }

    pub fn push(&mut self, timing: RunTiming) {
        if self.runs.len() == HISTORY_CAPACITY {
            self.runs.pop_front();
        }
        self.runs.push_back(timing);
    }

    pub fn latest(&self) -> Option<&RunTiming> {
        self.runs.back()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Compare run at `index_a` against run at `index_b` (0 = oldest kept).
    pub fn compare(&self, index_a: usize, index_b: usize) -> Option<TimingComparison> {
        let a = self.runs.get(index_a)?;
        let b = self.runs.get(index_b)?;
        let a_totals: HashMap<&str, f64> = a.node_timings.iter().map(|t| (t.node.as_str(), t.total_ms())).collect();
        let mut node_deltas_ms = HashMap::new();
        for timing in &b.node_timings {
            let before = a_totals.get(timing.node.as_str()).copied().unwrap_or(0.0);
            node_deltas_ms.insert(timing.node.clone(), timing.total_ms() - before);
        }
        Some(TimingComparison {
            node_deltas_ms,
            critical_path_delta_ms: b.critical_path_ms - a.critical_path_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing(node: &str, total: f64) -> NodeTiming {
        NodeTiming { node: node.to_string(), wait_ms: 0.0, init_ms: 0.0, execute_ms: total, handoff_ms: 0.0 }
    }

    #[test]
    fn critical_path_follows_the_longest_chain() {
        let timings = vec![timing("a", 10.0), timing("b", 5.0), timing("c", 20.0)];
        let topo = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let edges = vec![("a".to_string(), "c".to_string()), ("b".to_string(), "c".to_string())];
        let (path, total) = compute_critical_path(&timings, &topo, &edges);
        assert_eq!(path, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(total, 30.0);
    }

    #[test]
    fn history_caps_at_ten_runs() {
        let mut history = TimingHistory::new();
        for i in 0..15 {
            history.push(build_run_timing(vec![timing("a", i as f64)], &["a".to_string()], &[]));
        }
        assert_eq!(history.len(), 10);
        assert_eq!(history.latest().unwrap().node_timings[0].node, "a");
    }

    #[test]
    fn compare_reports_per_node_delta() {
        let mut history = TimingHistory::new();
        history.push(build_run_timing(vec![timing("a", 10.0)], &["a".to_string()], &[]));
        history.push(build_run_timing(vec![timing("a", 15.0)], &["a".to_string()], &[]));
        let comparison = history.compare(0, 1).unwrap();
        assert_eq!(comparison.node_deltas_ms["a"], 5.0);
    }
}

//! Scheduler-private bookkeeping for one execution.

use std::collections::HashMap;
use wave_model::{NodeExecutionStatus, NodeId, Value};

/// What the scheduler remembers about the most recent terminal attempt at running a node
/// *in the current iteration*. Readiness and loop-edge gating both read this; a loop re-entry
/// removes a node's entry so it becomes eligible again.
#[derive(Debug, Clone)]
pub struct NodeOutcome {
    /// Index into `Execution.node_executions` of the record this outcome summarizes.
    pub node_execution_index: usize,
    pub status: NodeExecutionStatus,
    /// The resolved input scope the node saw (or would have seen, for a skip).
    pub input: Value,
    pub output: Value,
    pub iteration: u32,
}

impl NodeOutcome {
    pub fn satisfies_unconditional(&self) -> bool {
        self.status == NodeExecutionStatus::Completed
    }
}

/// Per-execution mutable scheduler state. Not `Clone` — there is exactly one of these per
/// `Scheduler::run` call, mutated only by the task driving the wave loop.
#[derive(Default)]
pub struct RunState {
    /// Current-iteration terminal outcome per node. Absence means "not yet run this
    /// iteration" (either never run, or cleared by a loop re-entry).
    pub completed: HashMap<NodeId, NodeOutcome>,
    /// Current iteration index per node (0 = first entry), incremented on each loop re-entry
    /// that targets it.
    pub iteration: HashMap<NodeId, u32>,
    /// Number of times each loop edge has fired so far, keyed by edge id.
    pub loop_fires: HashMap<String, u32>,
    /// Set once any node reaches `Failed`, used for the fail-fast "no new waves" rule (spec
    /// §7) unless `continue_on_error` is set.
    pub any_node_failed: bool,
}

impl RunState {
    pub fn is_terminal(&self, node_id: &str) -> bool {
        self.completed.contains_key(node_id)
    }
}

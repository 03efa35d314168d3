//! The execution plan a validated workflow produces.

use std::collections::HashMap;
use wave_model::{EdgeId, NodeId};

/// Adjacency, split by whether the connecting edge participates in the acyclic subgraph, plus
/// the topological wave-depth assignment the scheduler consumes in order.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Non-loop outgoing edge ids per node.
    pub non_loop_successors: HashMap<NodeId, Vec<EdgeId>>,
    /// Loop outgoing edge ids per node (at most one per target, enforced by validation).
    pub loop_successors: HashMap<NodeId, Vec<EdgeId>>,
    /// Non-loop incoming edge ids per node — the set a node's readiness check walks.
    pub non_loop_predecessors: HashMap<NodeId, Vec<EdgeId>>,
    /// Topological depth per node: `1 + max(depth(p))` over non-loop predecessors, `0` for
    /// sources.
    pub depth: HashMap<NodeId, u32>,
    /// Node ids grouped by depth, ascending. `waves[0]` is the first wave the scheduler runs.
    pub waves: Vec<Vec<NodeId>>,
}

impl Plan {
    pub fn depth_of(&self, node_id: &str) -> u32 {
        self.depth.get(node_id).copied().unwrap_or(0)
    }

    pub fn non_loop_successors_of(&self, node_id: &str) -> &[EdgeId] {
        self.non_loop_successors.get(node_id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn loop_successors_of(&self, node_id: &str) -> &[EdgeId] {
        self.loop_successors.get(node_id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn non_loop_predecessors_of(&self, node_id: &str) -> &[EdgeId] {
        self.non_loop_predecessors.get(node_id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Nodes with non-loop out-degree 0 — the sinks whose completed output forms the
    /// execution's aggregate output.
    pub fn sinks<'a>(&'a self, all_node_ids: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
        all_node_ids
            .filter(|id| self.non_loop_successors_of(id).is_empty())
            .collect()
    }
}

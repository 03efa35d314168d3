//! Loop-edge subgraph bookkeeping.

use std::collections::{HashSet, VecDeque};
use wave_model::{NodeId, Workflow};
use wave_validate::Plan;

/// All nodes reachable from `start` (inclusive) by following non-loop successor edges.
pub fn reachable_forward(plan: &Plan, workflow: &Workflow, start: &str) -> HashSet<NodeId> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(start.to_string());
    seen.insert(start.to_string());
    while let Some(node_id) = queue.pop_front() {
        for edge_id in plan.non_loop_successors_of(&node_id) {
            if let Some(edge) = workflow.edge(edge_id) {
                if seen.insert(edge.to.clone()) {
                    queue.push_back(edge.to.clone());
                }
            }
        }
    }
    seen
}

/// All nodes that transitively feed `target` by non-loop predecessor edges (inclusive).
pub fn ancestors(plan: &Plan, workflow: &Workflow, target: &str) -> HashSet<NodeId> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(target.to_string());
    seen.insert(target.to_string());
    while let Some(node_id) = queue.pop_front() {
        for edge_id in plan.non_loop_predecessors_of(&node_id) {
            if let Some(edge) = workflow.edge(edge_id) {
                if seen.insert(edge.from.clone()) {
                    queue.push_back(edge.from.clone());
                }
            }
        }
    }
    seen
}

/// The set of nodes a loop re-entry clears: `target` and everything transitively reachable
/// from it via non-loop edges, minus the region strictly upstream of `target` itself — the
/// nodes that fed `target` the first time around and whose output the loop iteration should
/// not erase. The loop source and everything between it and `target` lie on the forward path
/// *out of* `target`, so they belong to the downstream set and get cleared along with it.
pub fn loop_reentry_clear_set(plan: &Plan, workflow: &Workflow, target: &str) -> HashSet<NodeId> {
    let downstream = reachable_forward(plan, workflow, target);
    let mut upstream_of_target = ancestors(plan, workflow, target);
    upstream_of_target.remove(target);
    downstream.difference(&upstream_of_target).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use wave_model::{Edge, Loop, Node, Value, WorkflowStatus};

    fn node(id: &str) -> Node {
        Node { id: id.to_string(), name: id.to_string(), node_type: "noop".to_string(), config: Value::map(), description: None, metadata: None }
    }

    fn edge(id: &str, from: &str, to: &str) -> Edge {
        Edge { id: id.to_string(), from: from.to_string(), to: to.to_string(), source_handle: None, condition: None, loop_spec: None, metadata: None }
    }

    fn loop_edge(id: &str, from: &str, to: &str, max: u32) -> Edge {
        let mut e = edge(id, from, to);
        e.loop_spec = Some(Loop { max_iterations: max });
        e
    }

    #[test]
    fn clears_target_and_downstream_only() {
        // gen -> review -> check -> (loop back to review, max 3) ; check -> format
        let wf = Workflow {
            id: "wf".into(),
            name: "wf".into(),
            version: 1,
            status: WorkflowStatus::Active,
            nodes: vec![node("gen"), node("review"), node("check"), node("format")],
            edges: vec![
                edge("e1", "gen", "review"),
                edge("e2", "review", "check"),
                edge("e3", "check", "format"),
                loop_edge("e4", "check", "review", 3),
            ],
            variables: BTreeMap::new(),
            metadata: None,
            trigger: None,
        };
        let plan = wave_validate::validate(&wf, None).unwrap();
        let cleared = loop_reentry_clear_set(&plan, &wf, "review");
        assert!(cleared.contains("review"));
        assert!(cleared.contains("check"));
        assert!(cleared.contains("format"));
        assert!(!cleared.contains("gen"));
    }
}

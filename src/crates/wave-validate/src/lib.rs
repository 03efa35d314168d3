//! Static validator: rejects malformed workflows and produces an [`Plan`] for the scheduler
//! to execute.

pub mod catalog;
pub mod plan;

pub use catalog::TypeCatalog;
pub use plan::Plan;

use std::collections::{HashMap, HashSet, VecDeque};
use wave_model::{EngineError, Result, Workflow};

/// Runs every structural and type-catalog rule and, if all pass, returns the execution
/// [`Plan`]. Errors name the offending entity in `details`.
pub fn validate(workflow: &Workflow, registry: Option<&dyn TypeCatalog>) -> Result<Plan> {
    validate_metadata(workflow)?;
    validate_nodes(workflow, registry)?;
    validate_edges(workflow)?;
    validate_loop_targets(workflow)?;
    validate_conditions_and_ports(workflow, registry)?;

    let (non_loop_successors, loop_successors, non_loop_predecessors) = build_adjacency(workflow);
    let (depth, waves) = topological_waves(workflow, &non_loop_successors, &non_loop_predecessors)?;

    Ok(Plan {
        non_loop_successors,
        loop_successors,
        non_loop_predecessors,
        depth,
        waves,
    })
}

fn invalid(message: impl Into<String>, details: serde_json::Value) -> EngineError {
    EngineError::Validation { message: message.into(), details }
}

fn validate_metadata(workflow: &Workflow) -> Result<()> {
    if workflow.name.trim().is_empty() {
        return Err(invalid("workflow name must not be empty", serde_json::json!({ "workflow_id": workflow.id })));
    }
    if workflow.nodes.is_empty() {
        return Err(invalid("workflow must contain at least one node", serde_json::json!({ "workflow_id": workflow.id })));
    }
    Ok(())
}

fn validate_nodes(workflow: &Workflow, registry: Option<&dyn TypeCatalog>) -> Result<()> {
    let mut seen = HashSet::new();
    for node in &workflow.nodes {
        if node.id.trim().is_empty() {
            return Err(invalid("node id must not be empty", serde_json::json!({ "node_name": node.name })));
        }
        if !seen.insert(node.id.clone()) {
            return Err(invalid(format!("duplicate node id '{}'", node.id), serde_json::json!({ "node_id": node.id })));
        }
        if node.name.trim().is_empty() {
            return Err(invalid("node name must not be empty", serde_json::json!({ "node_id": node.id })));
        }
        if node.node_type.trim().is_empty() {
            return Err(invalid("node type must not be empty", serde_json::json!({ "node_id": node.id })));
        }
        if let Some(registry) = registry {
            if !registry.is_registered(&node.node_type) {
                return Err(invalid(
                    format!("node '{}' has unregistered type '{}'", node.id, node.node_type),
                    serde_json::json!({ "node_id": node.id, "node_type": node.node_type }),
                ));
            }
        }
    }
    Ok(())
}

fn validate_edges(workflow: &Workflow) -> Result<()> {
    let node_ids: HashSet<&str> = workflow.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut seen_edge_ids = HashSet::new();
    let mut loop_targets: HashMap<&str, u32> = HashMap::new();

    for edge in &workflow.edges {
        if !seen_edge_ids.insert(edge.id.clone()) {
            return Err(invalid(format!("duplicate edge id '{}'", edge.id), serde_json::json!({ "edge_id": edge.id })));
        }
        if !node_ids.contains(edge.from.as_str()) {
            return Err(invalid(
                format!("edge '{}' references unknown source node '{}'", edge.id, edge.from),
                serde_json::json!({ "edge_id": edge.id, "node_id": edge.from }),
            ));
        }
        if !node_ids.contains(edge.to.as_str()) {
            return Err(invalid(
                format!("edge '{}' references unknown target node '{}'", edge.id, edge.to),
                serde_json::json!({ "edge_id": edge.id, "node_id": edge.to }),
            ));
        }
        if edge.from == edge.to {
            return Err(invalid(
                format!("edge '{}' is a self-loop ('{}' -> '{}')", edge.id, edge.from, edge.to),
                serde_json::json!({ "edge_id": edge.id, "node_id": edge.from }),
            ));
        }
        if edge.is_loop() {
            if let Some(spec) = &edge.loop_spec {
                if spec.max_iterations < 1 {
                    return Err(invalid(
                        format!("loop edge '{}' must have max_iterations >= 1", edge.id),
                        serde_json::json!({ "edge_id": edge.id }),
                    ));
                }
            }
            let count = loop_targets.entry(edge.to.as_str()).or_insert(0);
            *count += 1;
            if *count > 1 {
                return Err(invalid(
                    format!("node '{}' is targeted by more than one loop edge", edge.to),
                    serde_json::json!({ "node_id": edge.to }),
                ));
            }
        }
    }
    Ok(())
}

/// A node reachable *only* via a loop back-edge (no forward, non-loop inbound edge) can never
/// be entered in the first place, since loop edges only re-enter nodes that already ran.
/// Rejected as `ValidationError`.
fn validate_loop_targets(workflow: &Workflow) -> Result<()> {
    let mut has_forward_inbound: HashSet<&str> = HashSet::new();
    for edge in workflow.edges.iter().filter(|e| !e.is_loop()) {
        has_forward_inbound.insert(edge.to.as_str());
    }
    for edge in workflow.edges.iter().filter(|e| e.is_loop()) {
        if !has_forward_inbound.contains(edge.to.as_str()) {
            return Err(invalid(
                format!("node '{}' is an unreachable loop target (no forward edge reaches it)", edge.to),
                serde_json::json!({ "node_id": edge.to, "edge_id": edge.id }),
            ));
        }
    }
    Ok(())
}

fn validate_conditions_and_ports(workflow: &Workflow, registry: Option<&dyn TypeCatalog>) -> Result<()> {
    for edge in workflow.edges.iter().filter(|e| !e.is_loop()) {
        if let Some(condition) = &edge.condition {
            wave_template::validate_condition_syntax(condition).map_err(|e| {
                invalid(
                    format!("edge '{}' has an invalid condition: {}", edge.id, e),
                    serde_json::json!({ "edge_id": edge.id }),
                )
            })?;
        }
        if let Some(handle) = &edge.source_handle {
            if let Some(registry) = registry {
                let source_node = workflow.node(&edge.from);
                if let Some(source_node) = source_node {
                    if let Some(ports) = registry.ports(&source_node.node_type) {
                        if !ports.iter().any(|p| p == handle) {
                            return Err(invalid(
                                format!(
                                    "edge '{}' uses source handle '{}' not declared by node type '{}'",
                                    edge.id, handle, source_node.node_type
                                ),
                                serde_json::json!({ "edge_id": edge.id, "source_handle": handle }),
                            ));
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

type Adjacency = (
    HashMap<String, Vec<String>>,
    HashMap<String, Vec<String>>,
    HashMap<String, Vec<String>>,
);

fn build_adjacency(workflow: &Workflow) -> Adjacency {
    let mut non_loop_successors: HashMap<String, Vec<String>> = HashMap::new();
    let mut loop_successors: HashMap<String, Vec<String>> = HashMap::new();
    let mut non_loop_predecessors: HashMap<String, Vec<String>> = HashMap::new();

    for node in &workflow.nodes {
        non_loop_successors.entry(node.id.clone()).or_default();
        non_loop_predecessors.entry(node.id.clone()).or_default();
    }

    for edge in &workflow.edges {
        if edge.is_loop() {
            loop_successors.entry(edge.from.clone()).or_default().push(edge.id.clone());
        } else {
            non_loop_successors.entry(edge.from.clone()).or_default().push(edge.id.clone());
            non_loop_predecessors.entry(edge.to.clone()).or_default().push(edge.id.clone());
        }
    }

    (non_loop_successors, loop_successors, non_loop_predecessors)
}

/// Kahn's algorithm over the non-loop subgraph: simultaneously checks acyclicity and assigns each node its
/// topological wave depth.
fn topological_waves(
    workflow: &Workflow,
    non_loop_successors: &HashMap<String, Vec<String>>,
    non_loop_predecessors: &HashMap<String, Vec<String>>,
) -> Result<(HashMap<String, u32>, Vec<Vec<String>>)> {
    let edge_by_id: HashMap<&str, &wave_model::Edge> = workflow.edges.iter().map(|e| (e.id.as_str(), e)).collect();

    let mut in_degree: HashMap<String, usize> = HashMap::new();
    for node in &workflow.nodes {
        in_degree.insert(node.id.clone(), non_loop_predecessors.get(&node.id).map(|v| v.len()).unwrap_or(0));
    }

    let mut queue: VecDeque<String> = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(id, _)| id.clone())
        .collect();
    let mut remaining_in_degree = in_degree.clone();
    let mut processed: HashSet<String> = HashSet::new();
    let mut computed_depth: HashMap<String, u32> = HashMap::new();
    for id in &queue {
        computed_depth.insert(id.clone(), 0);
    }

    while let Some(node_id) = queue.pop_front() {
        if !processed.insert(node_id.clone()) {
            continue;
        }
        let this_depth = computed_depth.get(&node_id).copied().unwrap_or(0);
        for edge_id in non_loop_successors.get(&node_id).map(|v| v.as_slice()).unwrap_or(&[]) {
            let edge = edge_by_id[edge_id.as_str()];
            let successor = &edge.to;
            let candidate_depth = this_depth + 1;
            let entry = computed_depth.entry(successor.clone()).or_insert(candidate_depth);
            if candidate_depth > *entry {
                *entry = candidate_depth;
            }
            let degree = remaining_in_degree.get_mut(successor).expect("node in edge not in workflow");
            *degree -= 1;
            if *degree == 0 {
                queue.push_back(successor.clone());
            }
        }
    }

    if processed.len() != workflow.nodes.len() {
        let unprocessed: Vec<&str> = workflow
            .nodes
            .iter()
            .map(|n| n.id.as_str())
            .filter(|id| !processed.contains(*id))
            .collect();
        return Err(invalid(
            "the non-loop subgraph contains a cycle".to_string(),
            serde_json::json!({ "nodes_in_cycle_or_downstream": unprocessed }),
        ));
    }

    let mut waves: Vec<Vec<String>> = Vec::new();
    for node in &workflow.nodes {
        let d = computed_depth.get(&node.id).copied().unwrap_or(0);
        if d as usize >= waves.len() {
            waves.resize(d as usize + 1, Vec::new());
        }
        waves[d as usize].push(node.id.clone());
    }

    Ok((computed_depth, waves))
}

use std::collections::BTreeMap;
use wave_model::{Edge, Loop, Node, Value, Workflow, WorkflowStatus};
use wave_validate::validate;

fn node(id: &str) -> Node {
    Node {
        id: id.to_string(),
        name: id.to_string(),
        node_type: "noop".to_string(),
        config: Value::map(),
        description: None,
        metadata: None,
    }
}

fn edge(id: &str, from: &str, to: &str) -> Edge {
    Edge {
        id: id.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        source_handle: None,
        condition: None,
        loop_spec: None,
        metadata: None,
    }
}

fn workflow(nodes: Vec<Node>, edges: Vec<Edge>) -> Workflow {
    Workflow {
        id: "wf1".to_string(),
        name: "test workflow".to_string(),
        version: 1,
        status: WorkflowStatus::Active,
        nodes,
        edges,
        variables: BTreeMap::new(),
        metadata: None,
        trigger: None,
    }
}

#[test]
fn rejects_empty_workflow_name() {
    let mut wf = workflow(vec![node("a")], vec![]);
    wf.name = String::new();
    assert!(validate(&wf, None).is_err());
}

#[test]
fn rejects_zero_nodes() {
    let wf = workflow(vec![], vec![]);
    assert!(validate(&wf, None).is_err());
}

#[test]
fn single_node_no_edges_is_depth_zero() {
    let wf = workflow(vec![node("a")], vec![]);
    let plan = validate(&wf, None).unwrap();
    assert_eq!(plan.depth_of("a"), 0);
    assert_eq!(plan.waves, vec![vec!["a".to_string()]]);
}

#[test]
fn linear_pipeline_assigns_increasing_depth() {
    let wf = workflow(
        vec![node("a"), node("b"), node("c")],
        vec![edge("e1", "a", "b"), edge("e2", "b", "c")],
    );
    let plan = validate(&wf, None).unwrap();
    assert_eq!(plan.depth_of("a"), 0);
    assert_eq!(plan.depth_of("b"), 1);
    assert_eq!(plan.depth_of("c"), 2);
    assert_eq!(plan.waves.len(), 3);
}

#[test]
fn fan_out_fan_in_shares_depth() {
    let wf = workflow(
        vec![node("s"), node("p"), node("q"), node("r"), node("j")],
        vec![
            edge("e1", "s", "p"),
            edge("e2", "s", "q"),
            edge("e3", "s", "r"),
            edge("e4", "p", "j"),
            edge("e5", "q", "j"),
            edge("e6", "r", "j"),
        ],
    );
    let plan = validate(&wf, None).unwrap();
    assert_eq!(plan.depth_of("p"), 1);
    assert_eq!(plan.depth_of("q"), 1);
    assert_eq!(plan.depth_of("r"), 1);
    assert_eq!(plan.depth_of("j"), 2);
    assert_eq!(plan.waves[1].len(), 3);
}

#[test]
fn rejects_self_loop() {
    let wf = workflow(vec![node("a")], vec![edge("e1", "a", "a")]);
    assert!(validate(&wf, None).is_err());
}

#[test]
fn rejects_cycle_in_non_loop_subgraph() {
    let wf = workflow(
        vec![node("a"), node("b")],
        vec![edge("e1", "a", "b"), edge("e2", "b", "a")],
    );
    assert!(validate(&wf, None).is_err());
}

#[test]
fn accepts_loop_edge_reentering_a_forward_reached_node() {
    let mut loop_edge = edge("e2", "check", "b");
    loop_edge.loop_spec = Some(Loop { max_iterations: 3 });
    let wf = workflow(
        vec![node("a"), node("b"), node("check")],
        vec![edge("e1", "a", "b"), edge("e0", "b", "check"), loop_edge],
    );
    let plan = validate(&wf, None).unwrap();
    assert_eq!(plan.loop_successors_of("check"), &["e2".to_string()]);
}

#[test]
fn rejects_unreachable_loop_target() {
    let mut loop_edge = edge("e1", "b", "a");
    loop_edge.loop_spec = Some(Loop { max_iterations: 2 });
    // "a" has no non-loop inbound edge at all — only the loop edge targets it.
    let wf = workflow(vec![node("a"), node("b")], vec![loop_edge]);
    assert!(validate(&wf, None).is_err());
}

#[test]
fn rejects_duplicate_node_ids() {
    let wf = workflow(vec![node("a"), node("a")], vec![]);
    assert!(validate(&wf, None).is_err());
}

#[test]
fn rejects_duplicate_edge_ids() {
    let wf = workflow(
        vec![node("a"), node("b"), node("c")],
        vec![edge("e1", "a", "b"), edge("e1", "b", "c")],
    );
    assert!(validate(&wf, None).is_err());
}

#[test]
fn rejects_edge_to_unknown_node() {
    let wf = workflow(vec![node("a")], vec![edge("e1", "a", "ghost")]);
    assert!(validate(&wf, None).is_err());
}

#[test]
fn rejects_invalid_condition_syntax() {
    let mut e = edge("e1", "a", "b");
    e.condition = Some("input.x >=".to_string());
    let wf = workflow(vec![node("a"), node("b")], vec![e]);
    assert!(validate(&wf, None).is_err());
}

#[test]
fn accepts_valid_condition_syntax() {
    let mut e = edge("e1", "a", "b");
    e.condition = Some("input.score >= 80 && !input.flagged".to_string());
    let wf = workflow(vec![node("a"), node("b")], vec![e]);
    assert!(validate(&wf, None).is_ok());
}

#[test]
fn rejects_more_than_one_loop_edge_per_target() {
    let mut l1 = edge("e1", "x", "a");
    l1.loop_spec = Some(Loop { max_iterations: 1 });
    let mut l2 = edge("e2", "y", "a");
    l2.loop_spec = Some(Loop { max_iterations: 1 });
    let wf = workflow(
        vec![node("a"), node("x"), node("y")],
        vec![edge("e0", "x", "a"), edge("e00", "y", "a"), l1, l2],
    );
    assert!(validate(&wf, None).is_err());
}

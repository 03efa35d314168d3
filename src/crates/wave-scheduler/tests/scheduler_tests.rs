//! End-to-end scheduler scenarios: linear pipeline, fan-out/fan-in, conditional
//! routing, loop-edge re-entry, transient retry, and cancellation.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wave_model::{EngineError, Edge, Loop, Node, Result, Value, Workflow, WorkflowStatus};
use wave_registry::{ConditionalExecutor, EchoExecutor, ExecutionContext, Executor, ExecutorRegistry};
use wave_scheduler::{ExecutionOptions, Scheduler};

fn node(id: &str, node_type: &str) -> Node {
    Node {
        id: id.to_string(),
        name: id.to_string(),
        node_type: node_type.to_string(),
        config: Value::map(),
        description: None,
        metadata: None,
    }
}

fn node_with_config(id: &str, node_type: &str, config: Value) -> Node {
    Node { config, ..node(id, node_type) }
}

fn edge(id: &str, from: &str, to: &str) -> Edge {
    Edge { id: id.to_string(), from: from.to_string(), to: to.to_string(), source_handle: None, condition: None, loop_spec: None, metadata: None }
}

fn handle_edge(id: &str, from: &str, to: &str, handle: &str) -> Edge {
    Edge { source_handle: Some(handle.to_string()), ..edge(id, from, to) }
}

fn loop_edge(id: &str, from: &str, to: &str, max: u32) -> Edge {
    Edge { loop_spec: Some(Loop { max_iterations: max }), ..edge(id, from, to) }
}

fn workflow(nodes: Vec<Node>, edges: Vec<Edge>) -> Workflow {
    Workflow {
        id: "wf".to_string(),
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

fn m(pairs: &[(&str, Value)]) -> Value {
    Value::Map(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
}

#[tokio::test]
async fn linear_pipeline_runs_all_three_nodes_in_order() {
    let wf = workflow(
        vec![node("a", "echo"), node("b", "echo"), node("c", "echo")],
        vec![edge("e1", "a", "b"), edge("e2", "b", "c")],
    );
    let plan = wave_validate::validate(&wf, None).unwrap();
    let registry = ExecutorRegistry::new().with("echo", Arc::new(EchoExecutor));
    let scheduler = Scheduler::new(&wf, &plan, &registry);

    let (execution, _journal) = scheduler.run(m(&[("x", Value::Int(1))]), ExecutionOptions::new(), CancellationToken::new()).await;

    assert_eq!(execution.status, wave_model::ExecutionStatus::Completed);
    assert_eq!(execution.node_executions.len(), 3);
    assert_eq!(execution.output.as_ref().and_then(|o| o.get_path("x")), Some(&Value::Int(1)));
    for id in ["a", "b", "c"] {
        assert_eq!(execution.latest_for_node(id).unwrap().status, wave_model::NodeExecutionStatus::Completed);
    }
}

#[tokio::test]
async fn fan_out_fan_in_merges_named_predecessor_outputs() {
    let wf = workflow(
        vec![node("start", "echo"), node("b", "echo"), node("c", "echo"), node("d", "echo")],
        vec![edge("e1", "start", "b"), edge("e2", "start", "c"), edge("e3", "b", "d"), edge("e4", "c", "d")],
    );
    let plan = wave_validate::validate(&wf, None).unwrap();
    let registry = ExecutorRegistry::new().with("echo", Arc::new(EchoExecutor));
    let scheduler = Scheduler::new(&wf, &plan, &registry);

    let (execution, _journal) = scheduler.run(m(&[("seed", Value::Int(1))]), ExecutionOptions::new(), CancellationToken::new()).await;

    assert_eq!(execution.status, wave_model::ExecutionStatus::Completed);
    let output = execution.output.expect("d is the only sink and completed");
    assert_eq!(output.get_path("seed"), Some(&Value::Int(1)));
    assert_eq!(output.get_path("b.seed"), Some(&Value::Int(1)));
    assert_eq!(output.get_path("c.seed"), Some(&Value::Int(1)));
}

#[tokio::test]
async fn conditional_routing_picks_the_matching_branch_and_skips_the_other() {
    let wf = workflow(
        vec![
            node("start", "echo"),
            node_with_config("cond", "conditional", m(&[("expression", Value::String("input.score >= 80".to_string()))])),
            node("true_branch", "echo"),
            node("false_branch", "echo"),
        ],
        vec![
            edge("e1", "start", "cond"),
            handle_edge("e2", "cond", "true_branch", "true"),
            handle_edge("e3", "cond", "false_branch", "false"),
        ],
    );
    let plan = wave_validate::validate(&wf, None).unwrap();
    let registry = ExecutorRegistry::new().with("echo", Arc::new(EchoExecutor)).with("conditional", Arc::new(ConditionalExecutor));
    let scheduler = Scheduler::new(&wf, &plan, &registry);

    let (execution, _journal) = scheduler.run(m(&[("score", Value::Int(90))]), ExecutionOptions::new(), CancellationToken::new()).await;

    assert_eq!(execution.status, wave_model::ExecutionStatus::Completed);
    assert_eq!(execution.latest_for_node("true_branch").unwrap().status, wave_model::NodeExecutionStatus::Completed);
    assert_eq!(execution.latest_for_node("false_branch").unwrap().status, wave_model::NodeExecutionStatus::Skipped);
}

#[tokio::test]
async fn loop_edge_reenters_up_to_max_iterations() {
    // gen -> review -> check -> format, with an unconditioned loop edge check -> review
    // capped at 2 iterations. review/check/format should each run 3 times (1 initial pass
    // plus 2 loop re-entries); gen runs once.
    let wf = workflow(
        vec![node("gen", "echo"), node("review", "echo"), node("check", "echo"), node("format", "echo")],
        vec![
            edge("e1", "gen", "review"),
            edge("e2", "review", "check"),
            edge("e3", "check", "format"),
            loop_edge("e4", "check", "review", 2),
        ],
    );
    let plan = wave_validate::validate(&wf, None).unwrap();
    let registry = ExecutorRegistry::new().with("echo", Arc::new(EchoExecutor));
    let scheduler = Scheduler::new(&wf, &plan, &registry);

    let (execution, _journal) = scheduler.run(m(&[("seed", Value::Int(1))]), ExecutionOptions::new(), CancellationToken::new()).await;

    assert_eq!(execution.status, wave_model::ExecutionStatus::Completed);
    assert_eq!(execution.executions_for_node("gen").len(), 1);
    assert_eq!(execution.executions_for_node("review").len(), 3);
    assert_eq!(execution.executions_for_node("check").len(), 3);
    assert_eq!(execution.executions_for_node("format").len(), 3);
    assert_eq!(execution.latest_for_node("review").unwrap().iteration, 2);
}

struct FlakyExecutor {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Executor for FlakyExecutor {
    async fn execute(&self, _ctx: &ExecutionContext, _config: &Value, input: &Value) -> Result<Value> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
        if attempt < 2 {
            Err(EngineError::executor_transient("simulated transient failure"))
        } else {
            Ok(input.clone())
        }
    }
}

#[tokio::test(start_paused = true)]
async fn transient_failure_retries_then_succeeds() {
    let wf = workflow(vec![node("flaky", "flaky")], vec![]);
    let plan = wave_validate::validate(&wf, None).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = ExecutorRegistry::new().with("flaky", Arc::new(FlakyExecutor { calls: calls.clone() }));
    let scheduler = Scheduler::new(&wf, &plan, &registry);

    let (execution, journal) = scheduler.run(Value::map(), ExecutionOptions::new(), CancellationToken::new()).await;

    assert_eq!(execution.status, wave_model::ExecutionStatus::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let ne = execution.latest_for_node("flaky").unwrap();
    assert_eq!(ne.status, wave_model::NodeExecutionStatus::Completed);
    assert_eq!(ne.retry_count, 2);

    let retrying_events = journal.history().await.into_iter().filter(|e| matches!(e.kind, wave_model::EventKind::NodeRetrying { .. })).count();
    assert_eq!(retrying_events, 2);
}

struct SlowExecutor;

#[async_trait]
impl Executor for SlowExecutor {
    async fn execute(&self, _ctx: &ExecutionContext, _config: &Value, input: &Value) -> Result<Value> {
        tokio::time::sleep(Duration::from_secs(9_999)).await;
        Ok(input.clone())
    }
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_in_flight_node() {
    let wf = workflow(vec![node("slow", "slow")], vec![]);
    let plan = wave_validate::validate(&wf, None).unwrap();
    let registry = ExecutorRegistry::new().with("slow", Arc::new(SlowExecutor));
    let scheduler = Scheduler::new(&wf, &plan, &registry);
    let cancellation = CancellationToken::new();

    let run_fut = scheduler.run(Value::map(), ExecutionOptions::new(), cancellation.clone());
    let canceller = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancellation.cancel();
    };
    let (execution, _canceller_result) = tokio::join!(run_fut, canceller);

    assert_eq!(execution.status, wave_model::ExecutionStatus::Cancelled);
    assert_eq!(execution.latest_for_node("slow").unwrap().status, wave_model::NodeExecutionStatus::Cancelled);
}

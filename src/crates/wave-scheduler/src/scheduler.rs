//! The wave-based scheduler: drives a validated [`Plan`] to a terminal [`Execution`].
//!
//! Runs one wave at a time behind a hard barrier: every node in a wave is dispatched
//! concurrently, and the scheduler only advances to the next wave once the whole wave has
//! settled (or the run is cancelled).

use crate::dispatch;
use crate::options::ExecutionOptions;
use crate::retry::RetryPolicy;
use crate::state::{NodeOutcome, RunState};
use crate::subgraph;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use wave_journal::Journal;
use wave_model::{EngineError, EventKind, Execution, ExecutionStatus, Node, NodeExecution, NodeExecutionStatus, NodeId, Value, Workflow};
use wave_registry::ExecutorRegistry;
use wave_template::InputScope;
use wave_validate::Plan;

/// Drives one [`Workflow`]/[`Plan`] pair to completion against a given input. Stateless across
/// runs — build one per execution, or reuse across many since it only borrows.
pub struct Scheduler<'a> {
    workflow: &'a Workflow,
    plan: &'a Plan,
    registry: &'a ExecutorRegistry,
}

/// Shared, read-only context threaded through one wave's worth of node dispatch.
struct WaveCtx<'a> {
    workflow: &'a Workflow,
    plan: &'a Plan,
    registry: &'a ExecutorRegistry,
    journal: &'a Journal,
    semaphore: &'a Semaphore,
    cancellation: &'a CancellationToken,
    execution_id: &'a str,
    variables: &'a BTreeMap<String, Value>,
    initial_input: &'a Value,
    strict_mode: bool,
    retry_policy: &'a RetryPolicy,
}

enum Dispatch {
    Skip(String),
    Run(InputScope),
}

impl<'a> Scheduler<'a> {
    pub fn new(workflow: &'a Workflow, plan: &'a Plan, registry: &'a ExecutorRegistry) -> Self {
        Scheduler { workflow, plan, registry }
    }

    /// Runs the workflow to a terminal status. Returns the final [`Execution`] record together
    /// with the [`Journal`] that was built alongside it — callers that want the live event
    /// stream should `journal.subscribe()` before awaiting this future.
    pub async fn run(&self, input: Value, options: ExecutionOptions, cancellation: CancellationToken) -> (Execution, Journal) {
        let execution_id = Uuid::new_v4().to_string();
        let journal = Journal::new(execution_id.clone());

        let raw_variables = overlay_variables(&self.workflow.variables, &options.variables);
        let variables = match wave_template::resolve_variables(&raw_variables, &input) {
            Ok(v) => v,
            Err(e) => return self.fail_before_start(execution_id, journal, input, e).await,
        };

        let mut execution = Execution {
            id: execution_id.clone(),
            workflow_id: self.workflow.id.clone(),
            status: ExecutionStatus::Running,
            input: input.clone(),
            output: None,
            node_executions: Vec::new(),
            variables: variables.clone(),
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        };
        journal.append(EventKind::ExecutionStarted).await;
        tracing::info!(execution_id = %execution.id, workflow_id = %self.workflow.id, "execution started");

        let semaphore = Semaphore::new(options.effective_parallelism(default_workers()));
        let retry_policy = RetryPolicy::default();
        let deadline = options.deadline.map(|d| tokio::time::Instant::now() + d);
        let mut state = RunState::default();

        loop {
            if cancellation.is_cancelled() {
                break;
            }
            if deadline.is_some_and(|dl| tokio::time::Instant::now() >= dl) {
                execution.status = ExecutionStatus::Timeout;
                break;
            }
            if state.any_node_failed && !options.continue_on_error {
                break;
            }

            let ready = ready_nodes(self.workflow, self.plan, &state);
            if ready.is_empty() {
                break;
            }
            let min_depth = ready.iter().map(|id| self.plan.depth_of(id)).min().expect("ready is non-empty");
            let wave_nodes: Vec<NodeId> = ready.into_iter().filter(|id| self.plan.depth_of(id) == min_depth).collect();

            journal.append(EventKind::WaveStarted { depth: min_depth, node_ids: wave_nodes.clone() }).await;
            tracing::debug!(execution_id = %execution.id, depth = min_depth, nodes = ?wave_nodes, "wave started");

            let ctx = WaveCtx {
                workflow: self.workflow,
                plan: self.plan,
                registry: self.registry,
                journal: &journal,
                semaphore: &semaphore,
                cancellation: &cancellation,
                execution_id: &execution.id,
                variables: &variables,
                initial_input: &input,
                strict_mode: options.strict_mode,
                retry_policy: &retry_policy,
            };

            let node_futures = wave_nodes.iter().map(|node_id| run_one_node(&ctx, node_id, &state));
            let grace_guard = async {
                cancellation.cancelled().await;
                tokio::time::sleep(options.cancellation_grace_period).await;
            };

            let results = tokio::select! {
                biased;
                _ = grace_guard => {
                    wave_nodes
                        .iter()
                        .map(|id| forced_result(self.workflow.node(id).expect("plan node id must exist"), &execution.id, &state, NodeExecutionStatus::Cancelled, "cancellation grace period elapsed"))
                        .collect::<Vec<_>>()
                }
                results = futures::future::join_all(node_futures) => results,
            };

            for (node_id, node_execution, outcome) in results {
                if outcome.status == NodeExecutionStatus::Failed {
                    state.any_node_failed = true;
                }
                let index = execution.node_executions.len();
                execution.node_executions.push(node_execution);
                let mut outcome = outcome;
                outcome.node_execution_index = index;
                state.completed.insert(node_id, outcome);
            }

            journal.append(EventKind::WaveCompleted { depth: min_depth }).await;

            handle_loop_reentries(self.workflow, self.plan, &mut state, &journal, options.strict_mode).await;
        }

        self.finalize(execution, journal, &mut state, &cancellation).await
    }

    async fn fail_before_start(&self, execution_id: String, journal: Journal, input: Value, e: EngineError) -> (Execution, Journal) {
        let now = Utc::now();
        let execution = Execution {
            id: execution_id,
            workflow_id: self.workflow.id.clone(),
            status: ExecutionStatus::Failed,
            input,
            output: None,
            node_executions: Vec::new(),
            variables: BTreeMap::new(),
            error: Some(e.message().to_string()),
            started_at: now,
            completed_at: Some(now),
        };
        journal.append(EventKind::ExecutionFailed { error: e.message().to_string() }).await;
        (execution, journal)
    }

    async fn finalize(&self, mut execution: Execution, journal: Journal, state: &mut RunState, cancellation: &CancellationToken) -> (Execution, Journal) {
        let cancelled = cancellation.is_cancelled();

        for node in &self.workflow.nodes {
            if !state.is_terminal(&node.id) {
                let reason = if cancelled { "execution cancelled before this node could run" } else { "execution ended before this node became ready" };
                let status = if cancelled { NodeExecutionStatus::Cancelled } else { NodeExecutionStatus::Skipped };
                let (node_id, node_execution, mut outcome) = forced_result(node, &execution.id, state, status, reason);
                if status == NodeExecutionStatus::Skipped {
                    journal.append(EventKind::NodeSkipped { node_id: node_id.clone(), node_execution_id: node_execution.id.clone(), reason: reason.to_string() }).await;
                }
                let index = execution.node_executions.len();
                execution.node_executions.push(node_execution);
                outcome.node_execution_index = index;
                state.completed.insert(node_id, outcome);
            }
        }

        if execution.status == ExecutionStatus::Running {
            execution.status = if cancelled {
                ExecutionStatus::Cancelled
            } else if state.any_node_failed {
                ExecutionStatus::Failed
            } else {
                ExecutionStatus::Completed
            };
        }

        if execution.status == ExecutionStatus::Failed && execution.error.is_none() {
            execution.error = execution
                .node_executions
                .iter()
                .find(|ne| ne.status == NodeExecutionStatus::Failed)
                .and_then(|ne| ne.error.clone());
        }

        execution.output = self.aggregate_output(state);
        execution.completed_at = Some(Utc::now());

        let terminal_event = match execution.status {
            ExecutionStatus::Completed => EventKind::ExecutionCompleted,
            ExecutionStatus::Cancelled => EventKind::ExecutionCancelled,
            ExecutionStatus::Timeout => EventKind::ExecutionFailed { error: "execution deadline elapsed".to_string() },
            _ => EventKind::ExecutionFailed { error: execution.error.clone().unwrap_or_else(|| "execution failed".to_string()) },
        };
        journal.append(terminal_event).await;
        tracing::info!(execution_id = %execution.id, status = ?execution.status, "execution finished");

        (execution, journal)
    }

    fn aggregate_output(&self, state: &RunState) -> Option<Value> {
        let all_ids: Vec<&str> = self.workflow.nodes.iter().map(|n| n.id.as_str()).collect();
        let sinks = self.plan.sinks(all_ids.into_iter());
        let completed_sinks: Vec<(&str, Value)> = sinks
            .into_iter()
            .filter_map(|id| {
                state
                    .completed
                    .get(id)
                    .filter(|o| o.status == NodeExecutionStatus::Completed)
                    .map(|o| (id, o.output.clone()))
            })
            .collect();

        match completed_sinks.len() {
            0 => None,
            1 => Some(completed_sinks.into_iter().next().unwrap().1),
            _ => {
                let mut map = BTreeMap::new();
                for (id, output) in completed_sinks {
                    map.insert(id.to_string(), output);
                }
                Some(Value::Map(map))
            }
        }
    }
}

fn overlay_variables(workflow_vars: &BTreeMap<String, Value>, overrides: &BTreeMap<String, Value>) -> BTreeMap<String, Value> {
    let mut merged = workflow_vars.clone();
    for (k, v) in overrides {
        merged.insert(k.clone(), v.clone());
    }
    merged
}

fn default_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

/// Nodes not yet terminal this iteration whose every non-loop predecessor already is (spec
/// §4.4 step 1).
fn ready_nodes(workflow: &Workflow, plan: &Plan, state: &RunState) -> Vec<NodeId> {
    workflow
        .nodes
        .iter()
        .map(|n| n.id.clone())
        .filter(|id| !state.is_terminal(id))
        .filter(|id| {
            plan.non_loop_predecessors_of(id).iter().all(|edge_id| {
                let edge = workflow.edge(edge_id).expect("plan edge id must exist in workflow");
                state.is_terminal(&edge.from)
            })
        })
        .collect()
}

/// Evaluates a gate expression (an edge condition or a loop condition): `Ok(Some(result))` on
/// success, `Ok(None)` to treat the gate as
/// unsatisfied without failing the execution, `Err` only when `strict_mode` escalates an
/// evaluation failure to a fatal error for the whole run.
fn evaluate_gate(strict_mode: bool, expression: &str, input: &Value, output: &Value) -> Result<Option<bool>, EngineError> {
    match wave_template::evaluate_condition(expression, input, output) {
        Ok(result) => Ok(Some(result)),
        Err(e) if strict_mode => Err(EngineError::internal(format!("condition '{}' failed to evaluate in strict mode: {}", expression, e.message()))),
        Err(_) => Ok(None),
    }
}

async fn determine_dispatch(ctx: &WaveCtx<'_>, node_id: &str, state: &RunState) -> Result<Dispatch, EngineError> {
    let predecessor_edge_ids = ctx.plan.non_loop_predecessors_of(node_id);
    if predecessor_edge_ids.is_empty() {
        return Ok(Dispatch::Run(InputScope::from_initial_input(ctx.initial_input.clone())));
    }
    let predecessor_edges: Vec<&wave_model::Edge> = predecessor_edge_ids.iter().map(|id| ctx.workflow.edge(id).expect("plan edge id must exist in workflow")).collect();

    let mut satisfying: Vec<(String, Value)> = Vec::new();
    for edge in predecessor_edges {
        let outcome = state.completed.get(&edge.from).expect("readiness guarantees predecessor is terminal");
        if !outcome.satisfies_unconditional() {
            continue;
        }
        if let Some(handle) = &edge.source_handle {
            let selected = outcome.output.get_path("selected_route").and_then(Value::as_str);
            if selected != Some(handle.as_str()) {
                continue;
            }
        }
        if let Some(condition) = &edge.condition {
            match evaluate_gate(ctx.strict_mode, condition, &outcome.input, &outcome.output)? {
                Some(result) => {
                    ctx.journal
                        .append(EventKind::ConditionEvaluated { edge_id: edge.id.clone(), expression: condition.clone(), result })
                        .await;
                    if !result {
                        continue;
                    }
                }
                None => continue,
            }
        }
        satisfying.push((edge.from.clone(), outcome.output.clone()));
    }

    if satisfying.is_empty() {
        return Ok(Dispatch::Skip("no inbound edge was satisfied".to_string()));
    }

    let scope = if satisfying.len() == 1 {
        let (parent_id, parent_output) = satisfying.into_iter().next().unwrap();
        InputScope::from_single_predecessor(ctx.initial_input.clone(), parent_id, parent_output)
    } else {
        InputScope::from_multiple_predecessors(ctx.initial_input.clone(), satisfying.into_iter().collect())
    };
    Ok(Dispatch::Run(scope))
}

async fn run_one_node(ctx: &WaveCtx<'_>, node_id: &str, state: &RunState) -> (NodeId, NodeExecution, NodeOutcome) {
    let node = ctx.workflow.node(node_id).expect("wave node id must exist in workflow");
    let iteration = state.iteration.get(node_id).copied().unwrap_or(0);

    let dispatch = match determine_dispatch(ctx, node_id, state).await {
        Ok(d) => d,
        Err(e) => return terminal(node, ctx.execution_id, iteration, NodeExecutionStatus::Failed, None, None, Some(e.message().to_string())),
    };

    let scope = match dispatch {
        Dispatch::Skip(reason) => {
            let node_execution_id = Uuid::new_v4().to_string();
            ctx.journal.append(EventKind::NodeSkipped { node_id: node_id.to_string(), node_execution_id: node_execution_id.clone(), reason: reason.clone() }).await;
            return terminal_with_id(node, ctx.execution_id, node_execution_id, iteration, NodeExecutionStatus::Skipped, None, None, None);
        }
        Dispatch::Run(scope) => scope,
    };

    let node_execution_id = Uuid::new_v4().to_string();
    let started_at = Utc::now();
    ctx.journal.append(EventKind::NodeStarted { node_id: node_id.to_string(), node_execution_id: node_execution_id.clone(), iteration }).await;

    let _permit = ctx.semaphore.acquire().await.expect("scheduler semaphore is never closed");

    let mut retry_count: u32 = 0;
    let mut last_resolved_config = Value::map();
    let mut last_input = Value::Null;

    loop {
        let attempt = dispatch::attempt(node, ctx.registry, ctx.variables, &scope, ctx.cancellation, ctx.execution_id).await;
        last_resolved_config = attempt.resolved_config;
        last_input = attempt.input_snapshot;

        match attempt.outcome {
            Ok(output) => {
                ctx.journal
                    .append(EventKind::NodeCompleted { node_id: node_id.to_string(), node_execution_id: node_execution_id.clone(), output: output.clone() })
                    .await;
                let node_execution = NodeExecution {
                    id: node_execution_id,
                    execution_id: ctx.execution_id.to_string(),
                    node_id: node_id.to_string(),
                    node_type: node.node_type.clone(),
                    status: NodeExecutionStatus::Completed,
                    input: Some(last_input.clone()),
                    resolved_config: Some(last_resolved_config),
                    output: Some(output.clone()),
                    error: None,
                    retry_count,
                    iteration,
                    started_at: Some(started_at),
                    completed_at: Some(Utc::now()),
                };
                let outcome = NodeOutcome { node_execution_index: 0, status: NodeExecutionStatus::Completed, input: last_input, output, iteration };
                return (node_id.to_string(), node_execution, outcome);
            }
            Err(e) => {
                if matches!(e, EngineError::Cancelled { .. }) {
                    return finish_failed(node, ctx.execution_id, node_execution_id, iteration, started_at, retry_count, last_resolved_config, last_input, &e, NodeExecutionStatus::Cancelled);
                }
                if e.is_transient() && ctx.retry_policy.should_retry(retry_count) {
                    let delay = ctx.retry_policy.calculate_delay(retry_count as usize);
                    retry_count += 1;
                    ctx.journal
                        .append(EventKind::NodeRetrying { node_id: node_id.to_string(), node_execution_id: node_execution_id.clone(), attempt: retry_count, delay_ms: delay.as_millis() as u64 })
                        .await;
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = ctx.cancellation.cancelled() => {
                            return finish_failed(node, ctx.execution_id, node_execution_id, iteration, started_at, retry_count, last_resolved_config, last_input, &EngineError::cancelled("cancelled while waiting to retry"), NodeExecutionStatus::Cancelled);
                        }
                    }
                    continue;
                }
                let message = e.message().to_string();
                ctx.journal
                    .append(EventKind::NodeFailed { node_id: node_id.to_string(), node_execution_id: node_execution_id.clone(), error_kind: error_kind_name(&e).to_string(), message })
                    .await;
                return finish_failed(node, ctx.execution_id, node_execution_id, iteration, started_at, retry_count, last_resolved_config, last_input, &e, NodeExecutionStatus::Failed);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn finish_failed(
    node: &Node,
    execution_id: &str,
    node_execution_id: String,
    iteration: u32,
    started_at: chrono::DateTime<Utc>,
    retry_count: u32,
    resolved_config: Value,
    input: Value,
    error: &EngineError,
    status: NodeExecutionStatus,
) -> (NodeId, NodeExecution, NodeOutcome) {
    let node_execution = NodeExecution {
        id: node_execution_id,
        execution_id: execution_id.to_string(),
        node_id: node.id.clone(),
        node_type: node.node_type.clone(),
        status,
        input: Some(input.clone()),
        resolved_config: Some(resolved_config),
        output: None,
        error: Some(error.message().to_string()),
        retry_count,
        iteration,
        started_at: Some(started_at),
        completed_at: Some(Utc::now()),
    };
    let outcome = NodeOutcome { node_execution_index: 0, status, input, output: Value::Null, iteration };
    (node.id.clone(), node_execution, outcome)
}

fn terminal(node: &Node, execution_id: &str, iteration: u32, status: NodeExecutionStatus, input: Option<Value>, output: Option<Value>, error: Option<String>) -> (NodeId, NodeExecution, NodeOutcome) {
    terminal_with_id(node, execution_id, Uuid::new_v4().to_string(), iteration, status, input, output, error)
}

#[allow(clippy::too_many_arguments)]
fn terminal_with_id(
    node: &Node,
    execution_id: &str,
    node_execution_id: String,
    iteration: u32,
    status: NodeExecutionStatus,
    input: Option<Value>,
    output: Option<Value>,
    error: Option<String>,
) -> (NodeId, NodeExecution, NodeOutcome) {
    let now = Utc::now();
    let node_execution = NodeExecution {
        id: node_execution_id,
        execution_id: execution_id.to_string(),
        node_id: node.id.clone(),
        node_type: node.node_type.clone(),
        status,
        input: input.clone(),
        resolved_config: None,
        output: output.clone(),
        error,
        retry_count: 0,
        iteration,
        started_at: Some(now),
        completed_at: Some(now),
    };
    let outcome = NodeOutcome {
        node_execution_index: 0,
        status,
        input: input.unwrap_or(Value::Null),
        output: output.unwrap_or(Value::Null),
        iteration,
    };
    (node.id.clone(), node_execution, outcome)
}

fn forced_result(node: &Node, execution_id: &str, state: &RunState, status: NodeExecutionStatus, reason: &str) -> (NodeId, NodeExecution, NodeOutcome) {
    let iteration = state.iteration.get(&node.id).copied().unwrap_or(0);
    terminal(node, execution_id, iteration, status, None, None, Some(reason.to_string()))
}

fn error_kind_name(e: &EngineError) -> &'static str {
    match e {
        EngineError::Validation { .. } => "validation",
        EngineError::Template { .. } => "template",
        EngineError::ExecutorPermanent { .. } => "executor_permanent",
        EngineError::ExecutorTransient { .. } => "executor_transient",
        EngineError::Timeout { .. } => "timeout",
        EngineError::Cancelled { .. } => "cancelled",
        EngineError::ConditionEvaluation { .. } => "condition_evaluation",
        EngineError::Internal { .. } => "internal",
    }
}

/// After a wave completes, checks each newly-completed node's loop edges and re-opens the
/// target subgraph when the loop should fire.
async fn handle_loop_reentries(workflow: &Workflow, plan: &Plan, state: &mut RunState, journal: &Journal, strict_mode: bool) {
    let completed_this_round: Vec<NodeId> = state
        .completed
        .iter()
        .filter(|(_, o)| o.status == NodeExecutionStatus::Completed)
        .map(|(id, _)| id.clone())
        .collect();

    for source_id in completed_this_round {
        let loop_edge_ids: Vec<String> = plan.loop_successors_of(&source_id).to_vec();
        for edge_id in loop_edge_ids {
            let edge = match workflow.edge(&edge_id) {
                Some(e) => e,
                None => continue,
            };
            let Some(loop_spec) = edge.loop_spec else { continue };
            let fires = state.loop_fires.get(&edge_id).copied().unwrap_or(0);
            if fires >= loop_spec.max_iterations {
                continue;
            }

            let outcome = state.completed.get(&source_id).expect("just confirmed completed");
            let should_fire = match &edge.condition {
                None => true,
                Some(condition) => match evaluate_gate(strict_mode, condition, &outcome.input, &outcome.output) {
                    Ok(Some(result)) => {
                        journal.append(EventKind::ConditionEvaluated { edge_id: edge.id.clone(), expression: condition.clone(), result }).await;
                        result
                    }
                    Ok(None) => false,
                    Err(e) => {
                        journal.append(EventKind::ErrorOccurred { message: e.message().to_string() }).await;
                        false
                    }
                },
            };
            if !should_fire {
                continue;
            }

            *state.loop_fires.entry(edge_id.clone()).or_insert(0) += 1;
            let next_iteration = state.iteration.get(&edge.to).copied().unwrap_or(0) + 1;
            state.iteration.insert(edge.to.clone(), next_iteration);

            let cleared = subgraph::loop_reentry_clear_set(plan, workflow, &edge.to);
            for node_id in cleared {
                state.completed.remove(&node_id);
            }
            tracing::debug!(edge_id = %edge_id, target = %edge.to, iteration = next_iteration, "loop edge fired");
        }
    }
}


//! Single-node dispatch: template resolution, one executor invocation, and the
//! timeout/cancellation race around it.
//!
//! Retrying a node is the scheduler's concern, not this module's — this
//! file only knows how to make *one* attempt and report what happened.

use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wave_model::{EngineError, Node, Result, Value};
use wave_registry::{ExecutionContext, ExecutorRegistry};
use wave_template::{resolve_value, InputScope, ResolveContext};

/// What one attempt at running a node produced, independent of whether it succeeds.
pub struct Attempt {
    pub resolved_config: Value,
    pub input_snapshot: Value,
    pub outcome: Result<Value>,
}

/// The node-local `resolvedConfig.timeout` field, in milliseconds.
fn node_timeout(resolved_config: &Value) -> Option<Duration> {
    resolved_config.get_path("timeout").and_then(Value::as_f64).map(Duration::from_millis)
}

/// Resolves `node.config`'s placeholders and runs the matching executor once, racing it
/// against the node's own timeout (if any) and the shared cancellation token.
pub async fn attempt(
    node: &Node,
    registry: &ExecutorRegistry,
    variables: &std::collections::BTreeMap<String, Value>,
    input_scope: &InputScope,
    cancellation: &CancellationToken,
    execution_id: &str,
) -> Attempt {
    let input_snapshot = effective_input(input_scope);

    let executor = match registry.get(&node.node_type) {
        Some(e) => e,
        None => {
            return Attempt {
                resolved_config: Value::map(),
                input_snapshot,
                outcome: Err(EngineError::internal(format!(
                    "no executor registered for node type '{}' (node '{}') — this should have been caught by validation",
                    node.node_type, node.id
                ))),
            }
        }
    };

    let optional_keys: HashSet<String> = executor.optional_config_keys();
    let resolve_ctx = ResolveContext {
        variables,
        scope: input_scope,
        optional_keys: &optional_keys,
    };

    let resolved_config = match resolve_value(&node.config, &resolve_ctx) {
        Ok(v) => v,
        Err(e) => {
            return Attempt {
                resolved_config: Value::map(),
                input_snapshot,
                outcome: Err(e),
            }
        }
    };

    let timeout = node_timeout(&resolved_config);
    let ctx = ExecutionContext::new(execution_id, node.id.clone(), cancellation.clone(), timeout);

    let outcome = run_with_timeout_and_cancellation(&ctx, &*executor, &resolved_config, &input_snapshot, timeout, cancellation).await;

    Attempt {
        resolved_config,
        input_snapshot,
        outcome,
    }
}

async fn run_with_timeout_and_cancellation(
    ctx: &ExecutionContext,
    executor: &dyn wave_registry::Executor,
    resolved_config: &Value,
    input: &Value,
    timeout: Option<Duration>,
    cancellation: &CancellationToken,
) -> Result<Value> {
    let execute_fut = executor.execute(ctx, resolved_config, input);

    let raced = async {
        tokio::select! {
            biased;
            _ = cancellation.cancelled() => {
                Err(EngineError::cancelled(format!("execution cancelled while node '{}' was running", ctx.node_id())))
            }
            result = execute_fut => result,
        }
    };

    match timeout {
        Some(d) => match tokio::time::timeout(d, raced).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::timeout(format!("node '{}' exceeded its {:?} timeout", ctx.node_id(), d))),
        },
        None => raced.await,
    }
}

fn effective_input(scope: &InputScope) -> Value {
    scope.resolve("").unwrap_or_else(|| scope.initial_input().clone())
}

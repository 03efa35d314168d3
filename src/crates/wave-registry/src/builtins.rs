//! Reference executor implementations. These are never assumed by `wave-scheduler`, which
//! treats every executor as opaque; they exist so tests and `wave-cli`'s demo have something
//! to register.

use crate::context::ExecutionContext;
use crate::executor::{Executor, Ports};
use async_trait::async_trait;
use std::collections::BTreeMap;
use wave_model::{EngineError, Result, Value};

/// Returns its input unchanged. Used by tests that need a trivial always-succeeding node.
pub struct EchoExecutor;

#[async_trait]
impl Executor for EchoExecutor {
    async fn execute(&self, _ctx: &ExecutionContext, _resolved_config: &Value, input: &Value) -> Result<Value> {
        Ok(input.clone())
    }
}

/// A first-class conditional/router node: reads
/// `resolvedConfig.expression`, evaluates it against the node's input scope, and reports the
/// outcome on a `selected_route` port so the scheduler's `source_handle` routing can pick the
/// `true`/`false` branch — equivalent to putting the same expression directly on an edge's
/// `condition`, just with named ports.
pub struct ConditionalExecutor;

#[async_trait]
impl Executor for ConditionalExecutor {
    async fn execute(&self, _ctx: &ExecutionContext, resolved_config: &Value, input: &Value) -> Result<Value> {
        let expression = resolved_config
            .get_path("expression")
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::executor_permanent("conditional node requires a string 'expression' config field"))?;

        let selected = wave_template::evaluate_condition(expression, input, &Value::Null)
            .map_err(|e| EngineError::executor_permanent(format!("conditional expression failed: {}", e.message())))?;

        let mut out = BTreeMap::new();
        out.insert("selected_route".to_string(), Value::String(if selected { "true" } else { "false" }.to_string()));
        out.insert("result".to_string(), Value::Bool(selected));
        Ok(Value::Map(out))
    }

    fn ports(&self) -> Option<Ports> {
        Some(Ports {
            output_handles: vec!["true".to_string(), "false".to_string()],
        })
    }

    fn optional_config_keys(&self) -> std::collections::HashSet<String> {
        std::collections::HashSet::new()
    }
}

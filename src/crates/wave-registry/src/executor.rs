//! The [`Executor`] contract every node `type` implements.
//!
//! A trait object dispatched by a string key, never a generic parameter, since node types are
//! chosen at workflow-load time, not compile time.

use crate::context::ExecutionContext;
use async_trait::async_trait;
use std::collections::HashSet;
use wave_model::{Result, Value};

/// Output ports a node type declares, enabling `source_handle` validation.
#[derive(Debug, Clone, Default)]
pub struct Ports {
    pub output_handles: Vec<String>,
}

/// A registered node type. `execute` is the only operation the scheduler calls at runtime;
/// `validate` and `ports` are optional static hooks the validator consults when a registry is
/// supplied.
///
/// Implementations must not retain references to mutable engine state between calls (spec
/// §4.3) — every call receives everything it needs as arguments.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Runs the node. `resolved_config` has already had every `{{...}}` placeholder
    /// substituted; `input` is the node's input scope, already merged from the execution
    /// input and predecessor outputs.
    ///
    /// Implementations SHOULD observe `ctx`'s timeout and cancellation signal and MUST
    /// classify failures by returning `wave_model::EngineError::ExecutorPermanent` or
    /// `ExecutorTransient` as appropriate — the scheduler's retry policy reads the returned
    /// error's `is_transient()`.
    async fn execute(&self, ctx: &ExecutionContext, resolved_config: &Value, input: &Value) -> Result<Value>;

    /// Optional static check invoked by the validator when this type is registered. Default:
    /// no check.
    fn validate(&self, _config: &Value) -> Result<()> {
        Ok(())
    }

    /// Optional port metadata enabling `source_handle` validation. Default:
    /// `None`, meaning "accept any handle".
    fn ports(&self) -> Option<Ports> {
        None
    }

    /// Config keys this executor treats as optional: a missing field reached through one of
    /// these resolves to the empty string instead of failing the node.
    fn optional_config_keys(&self) -> HashSet<String> {
        HashSet::new()
    }

    /// Capability probe for sub-workflow re-entrancy. A plain
    /// executor returns `false`; a sub-workflow executor that drives a nested scheduler run
    /// returns `true`. The scheduler itself never inspects this — it is purely informative for
    /// callers building a registry that needs to tell the two roles apart (e.g. for
    /// `max_parallelism` bookkeeping across nested runs).
    fn is_subworkflow(&self) -> bool {
        false
    }
}

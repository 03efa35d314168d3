//! Per-invocation context handed to an [`crate::Executor`].
//!
//! Carries exactly what the contract promises the executor: a cancellation signal and a
//! wall-clock timeout. Nothing else — executors must not be able to reach back into
//! scheduler-owned state.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The node's timeout (from `resolvedConfig.timeout`) and the execution's shared cancellation
/// token, derived fresh for every node dispatch.
#[derive(Clone)]
pub struct ExecutionContext {
    cancellation: CancellationToken,
    timeout: Option<Duration>,
    node_id: String,
    execution_id: String,
}

impl ExecutionContext {
    pub fn new(execution_id: impl Into<String>, node_id: impl Into<String>, cancellation: CancellationToken, timeout: Option<Duration>) -> Self {
        ExecutionContext {
            cancellation,
            timeout,
            node_id: node_id.into(),
            execution_id: execution_id.into(),
        }
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves once the execution is cancelled. Long-running executors should `select!` on
    /// this alongside their own work.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }
}

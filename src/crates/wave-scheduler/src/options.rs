//! [`ExecutionOptions`]: per-execution overrides accepted alongside a run request.

use std::collections::BTreeMap;
use std::time::Duration;
use wave_model::Value;

#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Bounds concurrency within a wave. `None`/`Some(0)` means unbounded.
    pub max_parallelism: Option<usize>,

    /// When `true`, a condition that fails to evaluate escalates to a fatal `InternalError`
    /// for the whole execution instead of the edge simply being treated as unsatisfied.
    pub strict_mode: bool,

    /// Per-execution wall-clock deadline. Elapsing it sets `ExecutionStatus::Timeout`.
    pub deadline: Option<Duration>,

    /// Downstream nodes of a failed node are always skipped via the normal unsatisfied-edge
    /// mechanism; this flag controls whether *new* waves are still started once any node has
    /// failed. `false` (default) is fail-fast.
    pub continue_on_error: bool,

    /// Per-execution variable overrides, overlaid onto the workflow's own variables (spec
    /// §3, §4.2).
    pub variables: BTreeMap<String, Value>,

    /// Hard deadline for cooperative cancellation to finish draining in-flight executors
    /// before the scheduler gives up and reports them cancelled.
    pub cancellation_grace_period: Duration,
}

impl ExecutionOptions {
    pub fn effective_parallelism(&self, available_workers: usize) -> usize {
        match self.max_parallelism {
            None | Some(0) => available_workers.max(1),
            Some(n) => n,
        }
    }
}

impl ExecutionOptions {
    pub fn with_max_parallelism(mut self, n: usize) -> Self {
        self.max_parallelism = Some(n);
        self
    }

    pub fn with_deadline(mut self, d: Duration) -> Self {
        self.deadline = Some(d);
        self
    }

    pub fn with_continue_on_error(mut self, v: bool) -> Self {
        self.continue_on_error = v;
        self
    }

    pub fn with_strict_mode(mut self, v: bool) -> Self {
        self.strict_mode = v;
        self
    }
}

const DEFAULT_CANCELLATION_GRACE_PERIOD_SECS: u64 = 30;

impl ExecutionOptions {
    pub fn new() -> Self {
        ExecutionOptions {
            max_parallelism: None,
            strict_mode: false,
            deadline: None,
            continue_on_error: false,
            variables: BTreeMap::new(),
            cancellation_grace_period: Duration::from_secs(DEFAULT_CANCELLATION_GRACE_PERIOD_SECS),
        }
    }
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        ExecutionOptions::new()
    }
}

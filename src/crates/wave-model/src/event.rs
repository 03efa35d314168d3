//! The closed event-type set emitted onto the per-execution journal.

use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event payload kinds. `#[serde(tag = "type", content = "payload")]` keeps the wire shape a
/// single discriminated union.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum EventKind {
    ExecutionStarted,
    ExecutionCompleted,
    ExecutionFailed { error: String },
    ExecutionCancelled,

    WaveStarted { depth: u32, node_ids: Vec<String> },
    WaveCompleted { depth: u32 },

    NodeStarted { node_id: String, node_execution_id: String, iteration: u32 },
    NodeCompleted { node_id: String, node_execution_id: String, output: Value },
    NodeFailed { node_id: String, node_execution_id: String, error_kind: String, message: String },
    NodeSkipped { node_id: String, node_execution_id: String, reason: String },
    NodeRetrying { node_id: String, node_execution_id: String, attempt: u32, delay_ms: u64 },

    ConditionEvaluated { edge_id: String, expression: String, result: bool },
    VariableSet { name: String, value: Value },
    ErrorOccurred { message: String },
}

/// One entry in an execution's append-only journal. `sequence` is a strictly increasing,
/// per-execution total order starting at 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub execution_id: String,
    pub sequence: u64,
    #[serde(flatten)]
    pub kind: EventKind,
    pub created_at: DateTime<Utc>,
}

impl EventKind {
    /// The event name as it appears on the wire / in logs (`execution.started`, `node.failed`,
    /// ...), a dotted `category.verb` vocabulary.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::ExecutionStarted => "execution.started",
            EventKind::ExecutionCompleted => "execution.completed",
            EventKind::ExecutionFailed { .. } => "execution.failed",
            EventKind::ExecutionCancelled => "execution.cancelled",
            EventKind::WaveStarted { .. } => "wave.started",
            EventKind::WaveCompleted { .. } => "wave.completed",
            EventKind::NodeStarted { .. } => "node.started",
            EventKind::NodeCompleted { .. } => "node.completed",
            EventKind::NodeFailed { .. } => "node.failed",
            EventKind::NodeSkipped { .. } => "node.skipped",
            EventKind::NodeRetrying { .. } => "node.retrying",
            EventKind::ConditionEvaluated { .. } => "condition.evaluated",
            EventKind::VariableSet { .. } => "variable.set",
            EventKind::ErrorOccurred { .. } => "error.occurred",
        }
    }

    /// Whether this event kind is one of the three terminal execution events. The journal
    /// closes a subscription stream after exactly one of these.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventKind::ExecutionCompleted | EventKind::ExecutionFailed { .. } | EventKind::ExecutionCancelled
        )
    }
}

//! Execution-time records: [`Execution`] and [`NodeExecution`].
//!
//! Unlike [`crate::Workflow`], these are mutable and append-only for the lifetime of a single
//! run — the scheduler is the only writer.

use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    Timeout,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed
                | ExecutionStatus::Failed
                | ExecutionStatus::Cancelled
                | ExecutionStatus::Timeout
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
    Cancelled,
}

impl NodeExecutionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, NodeExecutionStatus::Pending | NodeExecutionStatus::Running)
    }

    /// Whether a successor edge whose only gate is "predecessor succeeded" is satisfied by a
    /// predecessor that reached this status.
    pub fn satisfies_unconditional_edge(self) -> bool {
        matches!(self, NodeExecutionStatus::Completed)
    }
}

/// One instantiation of a [`crate::Workflow`] against an input, producing a journal and a
/// terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    pub workflow_id: String,
    pub status: ExecutionStatus,
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default)]
    pub node_executions: Vec<NodeExecution>,
    /// Workflow variables overlaid with per-execution overrides.
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Execution {
    pub fn node_execution_mut(&mut self, id: &str) -> Option<&mut NodeExecution> {
        self.node_executions.iter_mut().find(|ne| ne.id == id)
    }

    /// All NodeExecutions for a given node id, in the order they were created. A node may have
    /// more than one if loop edges re-entered it.
    pub fn executions_for_node<'a>(&'a self, node_id: &str) -> Vec<&'a NodeExecution> {
        self.node_executions
            .iter()
            .filter(|ne| ne.node_id == node_id)
            .collect()
    }

    /// The most recent NodeExecution for a node, if any has been created.
    pub fn latest_for_node(&self, node_id: &str) -> Option<&NodeExecution> {
        self.node_executions
            .iter()
            .rev()
            .find(|ne| ne.node_id == node_id)
    }
}

/// A single attempt (or loop re-entry) at running one node within one execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExecution {
    pub id: String,
    pub execution_id: String,
    pub node_id: String,
    pub node_type: String,
    pub status: NodeExecutionStatus,
    /// The resolved input scope the node saw, post-template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    /// The node's config after template resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
    /// 0 on first attempt; incremented by loop-edge re-entry.
    #[serde(default)]
    pub iteration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

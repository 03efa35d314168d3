//! Workflow definition types: [`Workflow`], [`Node`], [`Edge`], [`Loop`].
//!
//! These are plain data — none of the graph invariants are enforced by the types themselves
//! (a `Workflow` can be constructed with duplicate node ids, for instance). The
//! static validator in `wave-validate` is the single place those invariants are checked; this
//! module only carries the shape.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type NodeId = String;
pub type EdgeId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Draft,
    Active,
    Inactive,
    Archived,
}

/// A reusable workflow definition: nodes, edges, variables, and a trigger.
///
/// Treated as immutable once it has passed validation — the scheduler never mutates a
/// `Workflow`, only the `Execution` it produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub version: u32,
    pub status: WorkflowStatus,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// The workflow's "environment": `{{env.NAME}}` resolves here, overlaid by per-execution
    /// variable overrides.
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Opaque trigger configuration. Trigger dispatch is out of scope; the engine
    /// only round-trips this field so an importer/exporter pair doesn't lose it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<Value>,
}

impl Workflow {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }
}

/// A typed unit of work. `node_type` is a key into the executor registry; the engine itself
/// never interprets it beyond that lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// A loop back-edge's iteration cap. Only edges with `loop` set are permitted to violate
/// acyclicity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Loop {
    pub max_iterations: u32,
}

/// A directed connection between two nodes, optionally gated by a source handle and/or a
/// condition expression, and optionally a loop back-edge.
///
/// Gates combine by AND: an edge with both a `source_handle` and a `condition` fires only when
/// the predecessor selected that handle *and* the condition evaluates true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "loop")]
    pub loop_spec: Option<Loop>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Edge {
    pub fn is_loop(&self) -> bool {
        self.loop_spec.is_some()
    }
}

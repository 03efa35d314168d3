//! Core data model for the waveforge workflow engine.
//!
//! This crate has no knowledge of scheduling, templating, or validation — it is the shared
//! vocabulary every other crate in the workspace builds on.

pub mod error;
pub mod event;
pub mod execution;
pub mod value;
pub mod workflow;

pub use error::{EngineError, Result};
pub use event::{Event, EventKind};
pub use execution::{Execution, ExecutionStatus, NodeExecution, NodeExecutionStatus};
pub use value::Value;
pub use workflow::{Edge, EdgeId, Loop, Node, NodeId, Workflow, WorkflowStatus};

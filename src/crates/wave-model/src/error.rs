//! The shared error taxonomy surfaced on [`crate::Execution`] and returned by every crate in
//! the workspace.
//!
//! One enum rather than one per crate: every failure in the engine is a single closed set
//! that is always observable through the execution's terminal status, regardless of which
//! component raised it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured detail attached to an [`EngineError`], kept as a `Value`-free JSON blob so this
/// crate doesn't need to depend on `wave-model`'s own `Value` type circularly.
pub type ErrorDetails = serde_json::Value;

#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum EngineError {
    /// The static validator rejected a workflow definition. The execution never starts.
    #[error("validation error: {message}")]
    Validation {
        message: String,
        details: ErrorDetails,
    },

    /// The template resolver could not resolve a required placeholder.
    #[error("template error: {message}")]
    Template {
        message: String,
        details: ErrorDetails,
    },

    /// An executor reported a non-transient failure. No retry is attempted.
    #[error("executor failed permanently: {message}")]
    ExecutorPermanent {
        message: String,
        details: ErrorDetails,
    },

    /// An executor reported a failure classified as retry-eligible (timeout, 429, network
    /// blip). The scheduler retries per policy before surfacing this as terminal.
    #[error("executor failed transiently: {message}")]
    ExecutorTransient {
        message: String,
        details: ErrorDetails,
    },

    /// A per-node or per-execution deadline elapsed.
    #[error("timed out: {message}")]
    Timeout {
        message: String,
        details: ErrorDetails,
    },

    /// External cancellation was observed.
    #[error("cancelled: {message}")]
    Cancelled {
        message: String,
        details: ErrorDetails,
    },

    /// A condition expression could not be evaluated. Not fatal — the scheduler treats the
    /// owning edge as unsatisfied unless the execution runs in strict mode.
    #[error("condition evaluation error: {message}")]
    ConditionEvaluation {
        message: String,
        details: ErrorDetails,
    },

    /// A scheduler-internal bug or invariant violation.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        details: ErrorDetails,
    },
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation {
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }

    pub fn template(message: impl Into<String>) -> Self {
        EngineError::Template {
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }

    pub fn executor_permanent(message: impl Into<String>) -> Self {
        EngineError::ExecutorPermanent {
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }

    pub fn executor_transient(message: impl Into<String>) -> Self {
        EngineError::ExecutorTransient {
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        EngineError::Timeout {
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        EngineError::Cancelled {
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }

    pub fn condition_evaluation(message: impl Into<String>) -> Self {
        EngineError::ConditionEvaluation {
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        EngineError::Internal {
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }

    /// Human-readable message, independent of which variant this is. Used to populate
    /// `NodeExecution.error` and `Execution.error`.
    pub fn message(&self) -> &str {
        match self {
            EngineError::Validation { message, .. }
            | EngineError::Template { message, .. }
            | EngineError::ExecutorPermanent { message, .. }
            | EngineError::ExecutorTransient { message, .. }
            | EngineError::Timeout { message, .. }
            | EngineError::Cancelled { message, .. }
            | EngineError::ConditionEvaluation { message, .. }
            | EngineError::Internal { message, .. } => message,
        }
    }

    /// Whether the scheduler should retry the node that produced this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::ExecutorTransient { .. } | EngineError::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

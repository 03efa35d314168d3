//! Executor contract and registry.
//!
//! Only `wave-scheduler` depends on this crate's async trait — everything below it
//! (`wave-model`, `wave-template`, `wave-validate`) stays synchronous and runtime-agnostic.

pub mod builtins;
pub mod context;
pub mod executor;
pub mod registry;

pub use builtins::{ConditionalExecutor, EchoExecutor};
pub use context::ExecutionContext;
pub use executor::{Executor, Ports};
pub use registry::ExecutorRegistry;

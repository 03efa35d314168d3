//! [`ExecutorRegistry`]: a constructor-injected map from node `type` string to a registered
//! [`Executor`], never process-wide global state.

use crate::executor::{Executor, Ports};
use std::collections::HashMap;
use std::sync::Arc;
use wave_validate::TypeCatalog;

#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn Executor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        ExecutorRegistry::default()
    }

    pub fn register(&mut self, node_type: impl Into<String>, executor: Arc<dyn Executor>) -> &mut Self {
        self.executors.insert(node_type.into(), executor);
        self
    }

    pub fn with(mut self, node_type: impl Into<String>, executor: Arc<dyn Executor>) -> Self {
        self.register(node_type, executor);
        self
    }

    pub fn get(&self, node_type: &str) -> Option<Arc<dyn Executor>> {
        self.executors.get(node_type).cloned()
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

/// `wave-validate`'s static checker only needs "is this registered" and "what ports does it
/// declare" — this impl is the bridge so `wave-registry`'s async trait never leaks into the
/// (sync) validator crate.
impl TypeCatalog for ExecutorRegistry {
    fn is_registered(&self, node_type: &str) -> bool {
        self.executors.contains_key(node_type)
    }

    fn ports(&self, node_type: &str) -> Option<Vec<String>> {
        let executor = self.executors.get(node_type)?;
        executor.ports().map(|Ports { output_handles }| output_handles)
    }
}

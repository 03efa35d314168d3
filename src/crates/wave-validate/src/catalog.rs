//! The thin interface the validator needs from an executor registry, kept decoupled from
//! `wave-registry`'s async `Executor` trait so this crate doesn't need an async runtime
//! dependency just to check a node's `type` is registered.

/// Anything that can answer "is this node type registered" and, optionally, "what output
/// ports does it declare" is a valid catalog for validation purposes. `wave-registry`'s
/// `ExecutorRegistry` implements this.
pub trait TypeCatalog {
    fn is_registered(&self, node_type: &str) -> bool;

    /// `Some(ports)` when the registry has port metadata for this type (enabling
    /// `source_handle` validation); `None` means "no metadata, accept any handle".
    fn ports(&self, node_type: &str) -> Option<Vec<String>>;
}

//! A node's input scope: the merged mapping its `{{input...}}` placeholders resolve against
//!.

use std::collections::BTreeMap;
use wave_model::Value;

/// Built fresh for every node about to run, from that node's set of predecessors which
/// satisfied their inbound edge this iteration.
#[derive(Debug, Clone)]
pub struct InputScope {
    initial_input: Value,
    /// Every predecessor's output, keyed by parent node id. Always populated regardless of
    /// predecessor count, so the explicit `{{input.PARENT_ID.KEY}}` form works even when there
    /// is exactly one predecessor.
    predecessor_outputs: BTreeMap<String, Value>,
    /// The count-dependent merge used for the *implicit* `{{input.KEY}}` form.
    effective_merged: Value,
}

impl InputScope {
    /// Zero predecessors: scope is just the execution's initial input.
    pub fn from_initial_input(initial_input: Value) -> Self {
        InputScope {
            effective_merged: initial_input.clone(),
            initial_input,
            predecessor_outputs: BTreeMap::new(),
        }
    }

    /// Exactly one predecessor: flat shallow-merge with the predecessor's output taking
    /// precedence at the top level.
    pub fn from_single_predecessor(initial_input: Value, parent_id: String, parent_output: Value) -> Self {
        let effective_merged = Value::shallow_merge_over(&initial_input, &parent_output);
        let mut predecessor_outputs = BTreeMap::new();
        predecessor_outputs.insert(parent_id, parent_output);
        InputScope {
            initial_input,
            predecessor_outputs,
            effective_merged,
        }
    }

    /// Two or more predecessors: scope is `{PARENT_ID: output, ...}` overlaid on the initial
    /// input (named parents shadow same-named top-level initial-input keys).
    pub fn from_multiple_predecessors(initial_input: Value, outputs: BTreeMap<String, Value>) -> Self {
        let named = Value::Map(outputs.clone().into_iter().collect());
        let effective_merged = Value::shallow_merge_over(&initial_input, &named);
        InputScope {
            initial_input,
            predecessor_outputs: outputs,
            effective_merged,
        }
    }

    pub fn initial_input(&self) -> &Value {
        &self.initial_input
    }

    pub fn predecessor_output(&self, parent_id: &str) -> Option<&Value> {
        self.predecessor_outputs.get(parent_id)
    }

    /// Resolves `key_path`: the explicit named-parent form always takes precedence;
    /// otherwise the path is resolved against the count-dependent merge.
    pub fn resolve(&self, key_path: &str) -> Option<Value> {
        let (first, rest) = match key_path.split_once('.') {
            Some((f, r)) => (f, Some(r)),
            None => (key_path, None),
        };
        if let Some(parent_output) = self.predecessor_outputs.get(first) {
            return match rest {
                Some(rest_path) => parent_output.get_path(rest_path).cloned(),
                None => Some(parent_output.clone()),
            };
        }
        self.effective_merged.get_path(key_path).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(pairs: &[(&str, Value)]) -> Value {
        Value::Map(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn single_predecessor_flat_merge_precedence() {
        let initial = m(&[("x", Value::Int(1)), ("y", Value::Int(2))]);
        let parent_out = m(&[("x", Value::Int(99))]);
        let scope = InputScope::from_single_predecessor(initial, "p1".into(), parent_out);
        assert_eq!(scope.resolve("x"), Some(Value::Int(99)));
        assert_eq!(scope.resolve("y"), Some(Value::Int(2)));
        // explicit form still reaches the parent directly
        assert_eq!(scope.resolve("p1.x"), Some(Value::Int(99)));
    }

    #[test]
    fn multiple_predecessors_named_then_fallback() {
        let initial = m(&[("shared", Value::Int(0))]);
        let mut outputs = BTreeMap::new();
        outputs.insert("p".to_string(), m(&[("r", Value::String("p".into()))]));
        outputs.insert("q".to_string(), m(&[("r", Value::String("q".into()))]));
        let scope = InputScope::from_multiple_predecessors(initial, outputs);
        assert_eq!(scope.resolve("p.r"), Some(Value::String("p".into())));
        assert_eq!(scope.resolve("q.r"), Some(Value::String("q".into())));
        assert_eq!(scope.resolve("shared"), Some(Value::Int(0)));
        assert_eq!(scope.resolve("missing"), None);
    }
}

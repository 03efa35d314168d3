//! The dynamic value type used everywhere a definition says "arbitrary JSON-like value".
//!
//! Node configs, node outputs, workflow variables, and the execution input all share this
//! single representation instead of passing `serde_json::Value` around directly, so that the
//! template resolver and condition evaluator can walk paths without caring whether a value
//! originated from JSON or YAML.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Recursively: scalars, ordered sequences, or mappings keyed by string.
///
/// A `Null | Bool | Int | Float | String | Seq(Value) | Map(String→Value)` tagged union:
/// dynamic, loosely-typed data passed between nodes in a statically typed language, anywhere a
/// dynamic language would reach for a bare map or list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Seq(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn map() -> Self {
        Value::Map(BTreeMap::new())
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Walks a dot-separated path (`a.b.c`) through nested maps and, for numeric segments,
    /// sequences. Returns `None` if any segment is missing or the wrong shape.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut current = self;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            current = match current {
                Value::Map(m) => m.get(segment)?,
                Value::Seq(items) => {
                    let idx: usize = segment.parse().ok()?;
                    items.get(idx)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// Shallow-merges `other` over `self`: top-level keys in `other` take precedence, but
    /// neither side's nested maps are merged recursively. Used to build a node's input scope
    /// from the execution input and a single predecessor's output.
    pub fn shallow_merge_over(base: &Value, overlay: &Value) -> Value {
        match (base, overlay) {
            (Value::Map(b), Value::Map(o)) => {
                let mut merged = b.clone();
                for (k, v) in o {
                    merged.insert(k.clone(), v.clone());
                }
                Value::Map(merged)
            }
            // If either side isn't a map, the overlay simply wins.
            _ => overlay.clone(),
        }
    }

    /// Renders a scalar for substitution into a larger string (`true`, `false`, an integer,
    /// a decimal, or the empty string for null). Non-scalars render as their JSON form, which
    /// should never be reached by the resolver (it preserves whole-field placeholders typed).
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    format!("{f:.0}")
                } else {
                    f.to_string()
                }
            }
            Value::String(s) => s.clone(),
            Value::Seq(_) | Value::Map(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_json(json: serde_json::Value) -> Self {
        serde_json::from_value(json).unwrap_or(Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(json)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, Value)]) -> Value {
        Value::Map(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn get_path_walks_nested_maps() {
        let v = map(&[("a", map(&[("b", map(&[("c", Value::Int(42))]))]))]);
        assert_eq!(v.get_path("a.b.c"), Some(&Value::Int(42)));
        assert_eq!(v.get_path("a.b.missing"), None);
    }

    #[test]
    fn get_path_walks_seq_indices() {
        let v = map(&[("items", Value::Seq(vec![Value::Int(1), Value::Int(2)]))]);
        assert_eq!(v.get_path("items.1"), Some(&Value::Int(2)));
    }

    #[test]
    fn shallow_merge_overlay_wins_top_level() {
        let base = map(&[("x", Value::Int(1)), ("y", Value::Int(2))]);
        let overlay = map(&[("x", Value::Int(99))]);
        let merged = Value::shallow_merge_over(&base, &overlay);
        assert_eq!(merged.get_path("x"), Some(&Value::Int(99)));
        assert_eq!(merged.get_path("y"), Some(&Value::Int(2)));
    }

    #[test]
    fn display_string_renders_scalars() {
        assert_eq!(Value::Bool(true).to_display_string(), "true");
        assert_eq!(Value::Int(7).to_display_string(), "7");
        assert_eq!(Value::Null.to_display_string(), "");
    }
}

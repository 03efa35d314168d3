//! `{{...}}` placeholder substitution.

use crate::scope::InputScope;
use std::collections::{BTreeMap, HashSet};
use wave_model::{EngineError, Result, Value};

/// Runtime context a resolution pass needs: the execution's variables (workflow variables
/// overlaid by per-execution overrides) and the node's input scope.
pub struct ResolveContext<'a> {
    pub variables: &'a BTreeMap<String, Value>,
    pub scope: &'a InputScope,
    /// Config keys the owning executor has declared optional. A missing field reached through
    /// one of these keys resolves to an empty string instead of failing the node.
    pub optional_keys: &'a HashSet<String>,
}

enum Placeholder<'a> {
    Env(&'a str),
    Input(&'a str),
}

fn parse_placeholder(inner: &str) -> Result<Placeholder<'_>> {
    let inner = inner.trim();
    if let Some(rest) = inner.strip_prefix("env.") {
        if rest.is_empty() {
            return Err(EngineError::template(format!("malformed placeholder '{{{{{inner}}}}}'")));
        }
        Ok(Placeholder::Env(rest))
    } else if let Some(rest) = inner.strip_prefix("input.") {
        if rest.is_empty() {
            return Err(EngineError::template(format!("malformed placeholder '{{{{{inner}}}}}'")));
        }
        Ok(Placeholder::Input(rest))
    } else {
        Err(EngineError::template(format!(
            "unrecognized placeholder '{{{{{inner}}}}}' (expected env.* or input.*)"
        )))
    }
}

/// Resolution outcome for one placeholder: either the path resolved to a value, or it reached
/// a missing field in an otherwise well-formed placeholder.
enum Lookup {
    Found(Value),
    Missing,
}

fn lookup(ctx: &ResolveContext<'_>, placeholder: &Placeholder<'_>) -> Lookup {
    match placeholder {
        Placeholder::Env(path) => {
            let (first, rest) = match path.split_once('.') {
                Some((f, r)) => (f, Some(r)),
                None => (*path, None),
            };
            match ctx.variables.get(first) {
                Some(v) => match rest {
                    Some(rest_path) => v.get_path(rest_path).cloned().map(Lookup::Found).unwrap_or(Lookup::Missing),
                    None => Lookup::Found(v.clone()),
                },
                None => Lookup::Missing,
            }
        }
        Placeholder::Input(path) => ctx.scope.resolve(path).map(Lookup::Found).unwrap_or(Lookup::Missing),
    }
}

fn placeholder_key(placeholder: &Placeholder<'_>) -> String {
    match placeholder {
        Placeholder::Env(p) => format!("env.{p}"),
        Placeholder::Input(p) => format!("input.{p}"),
    }
}

/// Finds the span of the first `{{ ... }}` occurrence in `s`, returning
/// `(start_of_braces, end_after_braces, inner_text)`.
fn find_placeholder(s: &str) -> Option<(usize, usize, &str)> {
    let start = s.find("{{")?;
    let end_rel = s[start + 2..].find("}}")?;
    let end = start + 2 + end_rel + 2;
    Some((start, end, &s[start + 2..start + 2 + end_rel]))
}

/// Resolves all placeholders in a single string, one pass (no re-expansion of substituted
/// text). If the whole field is exactly one placeholder, the original typed `Value` is
/// preserved; otherwise resolved fragments are stringified into the surrounding text.
pub fn resolve_string(raw: &str, ctx: &ResolveContext<'_>) -> Result<Value> {
    // Whole-field placeholder: preserve the typed value.
    if raw.starts_with("{{") && raw.ends_with("}}") && find_placeholder(raw).map(|(s, e, _)| s == 0 && e == raw.len()).unwrap_or(false) {
        let inner = &raw[2..raw.len() - 2];
        let placeholder = parse_placeholder(inner)?;
        return match lookup(ctx, &placeholder) {
            Lookup::Found(v) => Ok(v),
            Lookup::Missing => resolve_missing(&placeholder, ctx),
        };
    }

    let mut out = String::new();
    let mut remainder = raw;
    loop {
        match find_placeholder(remainder) {
            None => {
                out.push_str(remainder);
                break;
            }
            Some((start, end, inner)) => {
                out.push_str(&remainder[..start]);
                let placeholder = parse_placeholder(inner)?;
                let resolved = match lookup(ctx, &placeholder) {
                    Lookup::Found(v) => v,
                    Lookup::Missing => resolve_missing(&placeholder, ctx)?,
                };
                out.push_str(&resolved.to_display_string());
                remainder = &remainder[end..];
            }
        }
    }
    Ok(Value::String(out))
}

fn resolve_missing(placeholder: &Placeholder<'_>, ctx: &ResolveContext<'_>) -> Result<Value> {
    let key = placeholder_key(placeholder);
    if ctx.optional_keys.contains(&key) {
        Ok(Value::String(String::new()))
    } else {
        Err(EngineError::template(format!("placeholder '{{{{{key}}}}}' did not resolve")))
    }
}

/// Recursively resolves placeholders through an entire config tree: string leaves are
/// substituted, other scalars pass through unchanged, sequences and maps recurse.
pub fn resolve_value(value: &Value, ctx: &ResolveContext<'_>) -> Result<Value> {
    match value {
        Value::String(s) => resolve_string(s, ctx),
        Value::Seq(items) => {
            let resolved: Result<Vec<Value>> = items.iter().map(|v| resolve_value(v, ctx)).collect();
            Ok(Value::Seq(resolved?))
        }
        Value::Map(map) => {
            let mut resolved = BTreeMap::new();
            for (k, v) in map {
                resolved.insert(k.clone(), resolve_value(v, ctx)?);
            }
            Ok(Value::Map(resolved))
        }
        other => Ok(other.clone()),
    }
}

/// Resolves a workflow's variable map against itself (for `{{env.*}}` cross-references) and
/// the execution's initial input (no predecessor outputs exist yet at this point).
pub fn resolve_variables(variables: &BTreeMap<String, Value>, initial_input: &Value) -> Result<BTreeMap<String, Value>> {
    let scope = InputScope::from_initial_input(initial_input.clone());
    let empty = HashSet::new();
    let ctx = ResolveContext {
        variables,
        scope: &scope,
        optional_keys: &empty,
    };
    let mut resolved = BTreeMap::new();
    for (k, v) in variables {
        resolved.insert(k.clone(), resolve_value(v, &ctx)?);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::InputScope;

    fn scope_with(initial: Value) -> InputScope {
        InputScope::from_initial_input(initial)
    }

    #[test]
    fn whole_field_placeholder_preserves_type() {
        let initial = Value::Map(BTreeMap::from([("x".to_string(), Value::Int(42))]));
        let scope = scope_with(initial);
        let vars = BTreeMap::new();
        let optional = HashSet::new();
        let ctx = ResolveContext { variables: &vars, scope: &scope, optional_keys: &optional };
        let resolved = resolve_string("{{input.x}}", &ctx).unwrap();
        assert_eq!(resolved, Value::Int(42));
    }

    #[test]
    fn mixed_text_stringifies_fragments() {
        let initial = Value::Map(BTreeMap::from([("x".to_string(), Value::Int(42))]));
        let scope = scope_with(initial);
        let vars = BTreeMap::new();
        let optional = HashSet::new();
        let ctx = ResolveContext { variables: &vars, scope: &scope, optional_keys: &optional };
        let resolved = resolve_string("value={{input.x}}!", &ctx).unwrap();
        assert_eq!(resolved, Value::String("value=42!".to_string()));
    }

    #[test]
    fn missing_required_field_errors() {
        let initial = Value::Map(BTreeMap::new());
        let scope = scope_with(initial);
        let vars = BTreeMap::new();
        let optional = HashSet::new();
        let ctx = ResolveContext { variables: &vars, scope: &scope, optional_keys: &optional };
        assert!(resolve_string("{{input.missing}}", &ctx).is_err());
    }

    #[test]
    fn missing_optional_field_yields_empty_string() {
        let initial = Value::Map(BTreeMap::new());
        let scope = scope_with(initial);
        let vars = BTreeMap::new();
        let mut optional = HashSet::new();
        optional.insert("input.missing".to_string());
        let ctx = ResolveContext { variables: &vars, scope: &scope, optional_keys: &optional };
        let resolved = resolve_string("{{input.missing}}", &ctx).unwrap();
        assert_eq!(resolved, Value::String(String::new()));
    }
}
